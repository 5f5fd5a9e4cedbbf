use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{ExplorerError, Result};

use super::model::{GraphDataset, GraphDomain, Link, Node};

/// How a merge treats link endpoints that name no known node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkPolicy {
    /// Both endpoints must resolve.
    Strict,
    /// The source must resolve; the target may not. Only hypothesis merges
    /// use this, for AI-reported ids that are taken as given.
    AllowUnresolvedTargets,
}

/// Canonical node/link collections for the active domain.
///
/// Links are stored by id only. The undirected adjacency list is maintained
/// alongside them and extended on every merge, so it never lags the link set.
#[derive(Clone, Debug)]
pub struct GraphStore {
    domain: GraphDomain,
    nodes: Vec<Node>,
    links: Vec<Link>,
    index_by_id: HashMap<String, usize>,
    adjacency: HashMap<String, Vec<String>>,
    revision: u64,
}

impl GraphStore {
    pub fn load(domain: GraphDomain, dataset: GraphDataset) -> Result<Self> {
        let GraphDataset { nodes, links } = dataset;

        let mut index_by_id = HashMap::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            if index_by_id.insert(node.id.clone(), index).is_some() {
                return Err(ExplorerError::DuplicateId(node.id.clone()));
            }
        }

        for link in &links {
            check_endpoint(link, &link.source, |id| index_by_id.contains_key(id))?;
            check_endpoint(link, &link.target, |id| index_by_id.contains_key(id))?;
        }

        let adjacency = build_adjacency(&links);
        debug!(
            domain = %domain,
            nodes = nodes.len(),
            links = links.len(),
            "loaded graph dataset"
        );

        Ok(Self {
            domain,
            nodes,
            links,
            index_by_id,
            adjacency,
            revision: 0,
        })
    }

    /// Appends nodes and links, rejecting duplicate ids and dangling links.
    pub fn merge(&mut self, nodes: Vec<Node>, links: Vec<Link>) -> Result<()> {
        self.merge_with(nodes, links, LinkPolicy::Strict)
    }

    /// Appends nodes and links. Nothing is written unless the whole batch
    /// validates.
    pub fn merge_with(&mut self, nodes: Vec<Node>, links: Vec<Link>, policy: LinkPolicy) -> Result<()> {
        let mut incoming = HashSet::with_capacity(nodes.len());
        for node in &nodes {
            if self.index_by_id.contains_key(&node.id) || !incoming.insert(node.id.as_str()) {
                return Err(ExplorerError::DuplicateId(node.id.clone()));
            }
        }

        let known = |id: &str| self.index_by_id.contains_key(id) || incoming.contains(id);
        for link in &links {
            check_endpoint(link, &link.source, known)?;
            if policy == LinkPolicy::Strict {
                check_endpoint(link, &link.target, known)?;
            }
        }

        for node in nodes {
            self.index_by_id.insert(node.id.clone(), self.nodes.len());
            self.nodes.push(node);
        }
        for link in &links {
            register_link(&mut self.adjacency, link);
        }
        self.links.extend(links);
        self.revision = self.revision.wrapping_add(1);

        Ok(())
    }

    pub fn domain(&self) -> GraphDomain {
        self.domain
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_by_id.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_by_id.get(id).map(|&index| &self.nodes[index])
    }

    /// Undirected adjacency, one entry per link direction, in link order.
    pub fn adjacency(&self) -> &HashMap<String, Vec<String>> {
        &self.adjacency
    }

    pub fn neighbors_of(&self, id: &str) -> HashSet<&str> {
        self.adjacency
            .get(id)
            .map(|neighbors| neighbors.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

fn check_endpoint(link: &Link, endpoint: &str, known: impl Fn(&str) -> bool) -> Result<()> {
    if known(endpoint) {
        Ok(())
    } else {
        Err(ExplorerError::DanglingLink {
            from: link.source.clone(),
            to: link.target.clone(),
            label: link.label.clone(),
            missing: endpoint.to_owned(),
        })
    }
}

fn register_link(adjacency: &mut HashMap<String, Vec<String>>, link: &Link) {
    adjacency
        .entry(link.source.clone())
        .or_default()
        .push(link.target.clone());
    adjacency
        .entry(link.target.clone())
        .or_default()
        .push(link.source.clone());
}

fn build_adjacency(links: &[Link]) -> HashMap<String, Vec<String>> {
    let mut adjacency = HashMap::new();
    for link in links {
        register_link(&mut adjacency, link);
    }
    adjacency
}
