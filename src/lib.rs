//! Interaction and exploration engine for typed biomedical knowledge graphs.
//!
//! The graph store, highlight and path derivation, the interaction mode
//! machine, the quantum overlay and the merge controller all run
//! synchronously on the caller's thread. Only calls into the reasoning
//! service are moved off it, through [`ai::Dispatcher`].

pub mod ai;
pub mod config;
pub mod error;
pub mod explorer;
pub mod graph;
pub mod highlight;
pub mod interaction;
pub mod merge;
pub mod overlay;
pub mod style;
pub mod util;

pub use config::ExplorerConfig;
pub use error::{ExplorerError, Result};
pub use explorer::{Explorer, FixtureSource};
pub use interaction::{ExplorerEvent, Mode, Session};
