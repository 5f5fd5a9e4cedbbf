use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{ExplorerError, Result};
use crate::graph::GraphStore;

use super::link_key;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphPath {
    pub nodes: Vec<String>,
    /// `"a-b"` and `"b-a"` for every consecutive pair.
    pub link_keys: HashSet<String>,
}

impl GraphPath {
    fn from_nodes(nodes: Vec<String>) -> Self {
        let mut link_keys = HashSet::with_capacity(nodes.len().saturating_sub(1) * 2);
        for pair in nodes.windows(2) {
            if let [from, to] = pair {
                link_keys.insert(link_key(from, to));
                link_keys.insert(link_key(to, from));
            }
        }
        Self { nodes, link_keys }
    }

    pub fn hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathOutcome {
    Found(GraphPath),
    NotFound,
}

impl PathOutcome {
    pub fn path(&self) -> Option<&GraphPath> {
        match self {
            Self::Found(path) => Some(path),
            Self::NotFound => None,
        }
    }
}

/// Breadth-first shortest path over the undirected adjacency.
///
/// Nodes are marked visited when enqueued and the path is rebuilt from
/// parent pointers. The discovering parent of each node is the same one a
/// queue of whole paths would settle on, so ties resolve by adjacency order
/// either way.
///
/// Synthetic query and hypothesis nodes, and ids that name no node, are
/// never stepped through. They can still be an endpoint.
pub fn find_path(store: &GraphStore, start: &str, end: &str) -> Result<PathOutcome> {
    if start == end {
        return Err(ExplorerError::invalid(format!(
            "path start and end are both `{start}`"
        )));
    }
    for id in [start, end] {
        if !store.contains(id) {
            return Err(ExplorerError::invalid(format!("unknown node `{id}`")));
        }
    }

    let passable = |id: &str| {
        id == end
            || store
                .node(id)
                .is_some_and(|node| !node.node_type.is_synthetic())
    };

    let adjacency = store.adjacency();
    let mut queue = VecDeque::from([start]);
    let mut visited = HashSet::from([start]);
    let mut parent: HashMap<&str, &str> = HashMap::new();

    while let Some(current) = queue.pop_front() {
        if current == end {
            break;
        }

        let Some(neighbors) = adjacency.get(current) else {
            continue;
        };

        for next in neighbors {
            let next = next.as_str();
            if passable(next) && visited.insert(next) {
                parent.insert(next, current);
                queue.push_back(next);
            }
        }
    }

    if !visited.contains(end) {
        return Ok(PathOutcome::NotFound);
    }

    let mut nodes = vec![end.to_owned()];
    let mut cursor = end;
    while cursor != start {
        let Some(&prev) = parent.get(cursor) else {
            return Ok(PathOutcome::NotFound);
        };
        nodes.push(prev.to_owned());
        cursor = prev;
    }
    nodes.reverse();

    Ok(PathOutcome::Found(GraphPath::from_nodes(nodes)))
}
