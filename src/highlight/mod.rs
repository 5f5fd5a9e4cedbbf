use std::collections::HashSet;

use crate::graph::{GraphStore, Link, Node, NodeType};

mod paths;

pub use paths::{GraphPath, PathOutcome, find_path};

pub fn link_key(from: &str, to: &str) -> String {
    format!("{from}-{to}")
}

/// Emphasis sets handed to the renderer. Always rebuilt from the current
/// mode and dataset, never patched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Highlight {
    pub nodes: HashSet<String>,
    /// Path link keys, stored in both orientations.
    pub link_pairs: HashSet<String>,
    pub focal: Option<String>,
}

impl Highlight {
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn from_nodes<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            nodes: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn is_active(&self) -> bool {
        !self.nodes.is_empty() || self.focal.is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    pub fn is_focal(&self, id: &str) -> bool {
        self.focal.as_deref() == Some(id)
    }

    pub fn touches_focal(&self, link: &Link) -> bool {
        self.focal.as_deref().is_some_and(|focal| link.touches(focal))
    }

    pub fn is_path_link(&self, link: &Link) -> bool {
        self.link_pairs.contains(&link_key(&link.source, &link.target))
            || self.link_pairs.contains(&link_key(&link.target, &link.source))
    }

    /// Both endpoints highlighted, or the link is a first hop from the focal
    /// node.
    pub fn emphasizes_link(&self, link: &Link) -> bool {
        self.touches_focal(link) || (self.contains(&link.source) && self.contains(&link.target))
    }
}

/// `{focal} ∪ neighbors(focal)`; `None` clears the highlight.
pub fn highlight_for(store: &GraphStore, focal: Option<&str>) -> Highlight {
    let Some(focal) = focal else {
        return Highlight::inactive();
    };

    let mut nodes = store
        .neighbors_of(focal)
        .into_iter()
        .map(str::to_owned)
        .collect::<HashSet<_>>();
    nodes.insert(focal.to_owned());

    Highlight {
        nodes,
        link_pairs: HashSet::new(),
        focal: Some(focal.to_owned()),
    }
}

/// Literature nodes adjacent to `focal`, in dataset order.
pub fn related_literature<'a>(store: &'a GraphStore, focal: &str) -> Vec<&'a Node> {
    let neighbors = store.neighbors_of(focal);
    store
        .nodes()
        .iter()
        .filter(|node| node.node_type == NodeType::Literature && neighbors.contains(node.id.as_str()))
        .collect()
}
