//! Interaction modes and the derived view state they imply.

use crate::ai::ProposalDraft;
use crate::graph::{GraphDomain, GraphStore, Node};
use crate::highlight::{Highlight, PathOutcome, find_path, highlight_for};

mod enrichment;
mod session;

pub use enrichment::{EnrichmentCache, EnrichmentStatus};
pub use session::Session;

pub const PROMPT_SELECT_START: &str = "Select START node";
pub const PROMPT_SELECT_TARGET: &str = "Select TARGET node";

/// What a node click means right now.
///
/// `Pathfinding` and `HypothesisAugmentation` exclude each other. Only
/// `Browse` and `HypothesisAugmentation` carry a node selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Browse {
        focal: Option<String>,
    },
    Pathfinding {
        start: Option<String>,
        end: Option<String>,
    },
    HypothesisAugmentation {
        focal: Option<String>,
    },
}

impl Default for Mode {
    fn default() -> Self {
        Self::Browse { focal: None }
    }
}

impl Mode {
    pub fn pathfinding() -> Self {
        Self::Pathfinding {
            start: None,
            end: None,
        }
    }

    pub fn focal(&self) -> Option<&str> {
        match self {
            Self::Browse { focal } | Self::HypothesisAugmentation { focal } => focal.as_deref(),
            Self::Pathfinding { .. } => None,
        }
    }

    pub fn is_pathfinding(&self) -> bool {
        matches!(self, Self::Pathfinding { .. })
    }

    pub fn is_hypothesis(&self) -> bool {
        matches!(self, Self::HypothesisAugmentation { .. })
    }

    /// Banner shown while a pathfinding target is still missing.
    pub fn path_prompt(&self) -> Option<&'static str> {
        match self {
            Self::Pathfinding { start: None, .. } => Some(PROMPT_SELECT_START),
            Self::Pathfinding { end: None, .. } => Some(PROMPT_SELECT_TARGET),
            _ => None,
        }
    }
}

/// Panel visibility. Independent of the mode and of graph state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Panels {
    pub hub_open: bool,
    pub legend_expanded: bool,
}

/// Nodes emphasized after a hypothesis turn merged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnFocus {
    pub turn: u64,
    pub node_ids: Vec<String>,
}

/// Requests for the reasoning service, emitted by the session and drained
/// by whoever owns the dispatcher.
#[derive(Clone, Debug, PartialEq)]
pub enum ExplorerEvent {
    EnrichmentRequested {
        node: Node,
        domain: GraphDomain,
    },
    /// Also emitted when a pathfinding search succeeds; the query describes
    /// the path and the seeds are its nodes.
    HypothesisRequested {
        turn: u64,
        query: String,
        seed_nodes: Vec<Node>,
        domain: GraphDomain,
    },
    ProposalSubmitted {
        proposal_id: String,
        draft: ProposalDraft,
        domain: GraphDomain,
    },
}

/// Everything the renderer needs that follows from mode and data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Derived {
    pub highlight: Highlight,
    pub path: Option<PathOutcome>,
}

/// Recomputes the view state from scratch.
pub fn derive(store: Option<&GraphStore>, mode: &Mode, turn: Option<&TurnFocus>) -> Derived {
    let Some(store) = store else {
        return Derived::default();
    };

    match mode {
        Mode::Browse { focal } => Derived {
            highlight: highlight_for(store, focal.as_deref()),
            path: None,
        },
        Mode::HypothesisAugmentation { focal: Some(focal) } => Derived {
            highlight: highlight_for(store, Some(focal)),
            path: None,
        },
        Mode::HypothesisAugmentation { focal: None } => Derived {
            highlight: turn
                .map(|turn| Highlight::from_nodes(turn.node_ids.iter().cloned()))
                .unwrap_or_default(),
            path: None,
        },
        Mode::Pathfinding { start: None, .. } => Derived::default(),
        Mode::Pathfinding {
            start: Some(start),
            end: None,
        } => Derived {
            highlight: Highlight::from_nodes([start.as_str()]),
            path: None,
        },
        Mode::Pathfinding {
            start: Some(start),
            end: Some(end),
        } => {
            // endpoints were validated when clicked
            let outcome = find_path(store, start, end).unwrap_or(PathOutcome::NotFound);
            let highlight = match &outcome {
                PathOutcome::Found(path) => Highlight {
                    nodes: path.nodes.iter().cloned().collect(),
                    link_pairs: path.link_keys.clone(),
                    focal: None,
                },
                PathOutcome::NotFound => Highlight::from_nodes([start.as_str(), end.as_str()]),
            };
            Derived {
                highlight,
                path: Some(outcome),
            }
        }
    }
}
