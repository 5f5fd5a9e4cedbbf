//! Folds AI output and approved proposals into the graph store.

use tracing::{debug, warn};

use crate::ai::{HubProposal, HypothesisResult};
use crate::error::Result;
use crate::graph::{GraphStore, Link, LinkPolicy, Node, NodeType};

const QUERY_LABEL: &str = "Evidence";
const HYPOTHESIS_LABEL: &str = "Hypothesis";
const QUERY_WEIGHT: f32 = 20.0;
const HYPOTHESIS_WEIGHT: f32 = 30.0;
const PROPOSAL_WEIGHT: f32 = 20.0;

pub const GENERATES: &str = "GENERATES";
pub const RELATES_TO: &str = "RELATES_TO";
/// Placeholder relation that only makes a proposed node reachable. It is not
/// a validated claim about the anchor.
pub const PROPOSED_CONNECTION: &str = "PROPOSED_CONNECTION";

/// What one hypothesis turn added to the store.
#[derive(Clone, Debug, PartialEq)]
pub struct HypothesisMerge {
    pub query_id: String,
    pub hypothesis_id: String,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl HypothesisMerge {
    /// Query, hypothesis and every reported relevant id.
    pub fn highlight_ids(&self) -> Vec<String> {
        let mut ids = vec![self.query_id.clone(), self.hypothesis_id.clone()];
        ids.extend(
            self.links
                .iter()
                .filter(|link| link.source == self.hypothesis_id)
                .map(|link| link.target.clone()),
        );
        ids
    }
}

/// Generates collision-free ids for synthesized nodes.
///
/// Counters are per prefix and never reset, and a candidate that is already
/// taken in the store is skipped, so ids stay unique across any number of
/// turns in one dataset.
#[derive(Clone, Debug, Default)]
pub struct MergeController {
    queries: u64,
    hypotheses: u64,
    proposals: u64,
}

fn next_free(store: &GraphStore, prefix: &str, counter: &mut u64) -> String {
    loop {
        *counter += 1;
        let candidate = format!("{prefix}-{counter}");
        if !store.contains(&candidate) {
            return candidate;
        }
    }
}

impl MergeController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id for a hub proposal. Reserved at review time so the merged node
    /// keeps the id the user saw.
    pub fn next_proposal_id(&mut self, store: &GraphStore) -> String {
        next_free(store, "Proposal", &mut self.proposals)
    }

    /// Adds one `Query` node, one `Hypothesis` node, a `GENERATES` link
    /// between them and a `RELATES_TO` link per relevant id.
    ///
    /// Relevant ids are linked as reported, including ids that name no node.
    pub fn merge_hypothesis(
        &mut self,
        store: &mut GraphStore,
        query: &str,
        result: &HypothesisResult,
    ) -> Result<HypothesisMerge> {
        let query_id = next_free(store, "Query", &mut self.queries);
        let hypothesis_id = next_free(store, "Hypothesis", &mut self.hypotheses);

        let nodes = vec![
            Node::new(&query_id, QUERY_LABEL, NodeType::Query, query, QUERY_WEIGHT),
            Node::new(
                &hypothesis_id,
                HYPOTHESIS_LABEL,
                NodeType::Hypothesis,
                &result.hypothesis,
                HYPOTHESIS_WEIGHT,
            ),
        ];

        let mut links = Vec::with_capacity(result.relevant_node_ids.len() + 1);
        links.push(Link::new(&query_id, &hypothesis_id, GENERATES));
        for target in &result.relevant_node_ids {
            if !store.contains(target) {
                warn!(%target, hypothesis = %hypothesis_id, "relevant node id does not resolve");
            }
            links.push(Link::new(&hypothesis_id, target, RELATES_TO));
        }

        store.merge_with(nodes.clone(), links.clone(), LinkPolicy::AllowUnresolvedTargets)?;
        debug!(
            query = %query_id,
            hypothesis = %hypothesis_id,
            relevant = result.relevant_node_ids.len(),
            "merged hypothesis turn"
        );

        Ok(HypothesisMerge {
            query_id,
            hypothesis_id,
            nodes,
            links,
        })
    }

    /// Adds the proposed node plus a placeholder link to the first node of
    /// the dataset. An empty dataset gets the node alone.
    pub fn merge_proposal(&self, store: &mut GraphStore, proposal: &HubProposal) -> Result<(Node, Option<Link>)> {
        let node = Node::new(
            &proposal.id,
            &proposal.node_label,
            proposal.node_type,
            &proposal.description,
            PROPOSAL_WEIGHT,
        );
        let link = store
            .nodes()
            .first()
            .map(|anchor| Link::new(&proposal.id, &anchor.id, PROPOSED_CONNECTION));

        store.merge(vec![node.clone()], link.iter().cloned().collect())?;
        debug!(id = %node.id, anchored = link.is_some(), "merged hub proposal");

        Ok((node, link))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::ai::{ProposalStatus, Source};
    use crate::error::ExplorerError;
    use crate::graph::testing::store;
    use crate::graph::{GraphDataset, GraphDomain};

    fn result(ids: &[&str]) -> HypothesisResult {
        HypothesisResult::new("ORF8 drives escape", ids.iter().map(|id| (*id).to_owned()).collect())
    }

    fn proposal(id: &str) -> HubProposal {
        HubProposal {
            id: id.to_owned(),
            node_label: "JN.1".to_owned(),
            node_type: NodeType::Variant,
            description: "BA.2.86 descendant".to_owned(),
            status: ProposalStatus::Approved,
            ai_critique: String::new(),
            sources: vec![Source::default()],
            provenance_score: None,
        }
    }

    #[test]
    fn unresolved_relevant_id_is_still_linked() {
        let mut store = store(&[("A", "B")], &[]);
        let mut controller = MergeController::new();
        let merge = controller
            .merge_hypothesis(&mut store, "why?", &result(&["A", "Z"]))
            .unwrap();

        assert_eq!(store.node_count(), 4);
        assert_eq!(merge.nodes.len(), 2);
        assert!(
            store
                .links()
                .iter()
                .any(|link| link.source == merge.hypothesis_id && link.target == "Z")
        );
        assert!(!store.contains("Z"));
        assert!(store.neighbors_of("A").contains(merge.hypothesis_id.as_str()));
    }

    #[test]
    fn hypothesis_nodes_carry_query_and_conclusion() {
        let mut store = store(&[("A", "B")], &[]);
        let merge = MergeController::new()
            .merge_hypothesis(&mut store, "does A cause B?", &result(&["B"]))
            .unwrap();

        let query = store.node(&merge.query_id).unwrap();
        assert_eq!(query.node_type, NodeType::Query);
        assert_eq!(query.description, "does A cause B?");
        let hypothesis = store.node(&merge.hypothesis_id).unwrap();
        assert_eq!(hypothesis.node_type, NodeType::Hypothesis);
        assert_eq!(hypothesis.description, "ORF8 drives escape");

        assert_eq!(merge.links[0].label, GENERATES);
        assert_eq!(merge.links[1].label, RELATES_TO);
        assert_eq!(merge.highlight_ids(), vec![merge.query_id.clone(), merge.hypothesis_id.clone(), "B".to_owned()]);
    }

    #[test]
    fn sequential_turns_never_collide() {
        let mut store = store(&[("A", "B")], &[]);
        let mut controller = MergeController::new();
        let mut seen = HashSet::new();
        for turn in 0..5 {
            let merge = controller
                .merge_hypothesis(&mut store, &format!("turn {turn}"), &result(&["A"]))
                .unwrap();
            assert!(seen.insert(merge.query_id));
            assert!(seen.insert(merge.hypothesis_id));
        }
        assert_eq!(store.node_count(), 12);
    }

    #[test]
    fn fresh_controller_skips_ids_already_in_the_store() {
        let mut store = store(&[("A", "B")], &[]);
        MergeController::new()
            .merge_hypothesis(&mut store, "first", &result(&[]))
            .unwrap();
        let second = MergeController::new()
            .merge_hypothesis(&mut store, "second", &result(&[]))
            .unwrap();
        assert_eq!(second.query_id, "Query-2");
        assert_eq!(second.hypothesis_id, "Hypothesis-2");
    }

    #[test]
    fn proposal_links_to_first_node() {
        let mut store = store(&[("A", "B")], &[]);
        let mut controller = MergeController::new();
        let id = controller.next_proposal_id(&store);
        let (node, link) = controller.merge_proposal(&mut store, &proposal(&id)).unwrap();

        assert_eq!(node.id, "Proposal-1");
        assert_eq!(node.weight, 20.0);
        let link = link.unwrap();
        assert_eq!((link.source.as_str(), link.target.as_str()), ("Proposal-1", "A"));
        assert_eq!(link.label, PROPOSED_CONNECTION);
        assert!(store.neighbors_of("A").contains("Proposal-1"));
    }

    #[test]
    fn proposal_into_empty_dataset_has_no_link() {
        let mut store = GraphStore::load(GraphDomain::Policy, GraphDataset::default()).unwrap();
        let (_, link) = MergeController::new()
            .merge_proposal(&mut store, &proposal("Proposal-1"))
            .unwrap();
        assert!(link.is_none());
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.link_count(), 0);
    }

    #[test]
    fn duplicate_proposal_id_is_rejected() {
        let mut store = store(&[("A", "B")], &[]);
        let error = MergeController::new()
            .merge_proposal(&mut store, &proposal("A"))
            .unwrap_err();
        assert!(matches!(error, ExplorerError::DuplicateId(id) if id == "A"));
        assert_eq!(store.node_count(), 2);
    }
}
