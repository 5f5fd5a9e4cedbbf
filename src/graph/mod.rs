mod fixtures;
mod model;
mod search;
mod store;

pub use fixtures::{bundled_dataset, dataset_from_dir, parse_dataset};
pub use model::{GraphDataset, GraphDomain, Link, Node, NodeType};
pub use search::{search_entities, search_literature};
pub use store::{GraphStore, LinkPolicy};
