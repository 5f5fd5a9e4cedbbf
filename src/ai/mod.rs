//! Boundary to the external reasoning service.
//!
//! The engine only depends on the handful of fields it acts on; everything
//! else in a response is carried through for display.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::graph::{GraphDomain, Node, NodeType};

mod dispatch;
mod prompt;

pub use dispatch::{Completion, Dispatcher, RequestKey};
pub use prompt::{PromptedReasoner, TextCompletion, strip_code_fences};

#[derive(Debug, Error)]
pub enum AiError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("worker panicked while handling {0}")]
    WorkerPanicked(String),
}

pub type AiResult<T> = Result<T, AiError>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentData {
    pub summary: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub related_topics: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReasoningTrace {
    pub intents_detected: Vec<String>,
    pub steps: Vec<String>,
    pub bias_check: String,
    pub confidence_score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HypothesisResult {
    pub hypothesis: String,
    #[serde(default)]
    pub synthesis: String,
    #[serde(default)]
    pub relevant_node_ids: Vec<String>,
    #[serde(default)]
    pub reasoning: Option<ReasoningTrace>,
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Remaining fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HypothesisResult {
    pub fn new(hypothesis: impl Into<String>, relevant_node_ids: Vec<String>) -> Self {
        Self {
            hypothesis: hypothesis.into(),
            synthesis: String::new(),
            relevant_node_ids,
            reasoning: None,
            sources: Vec::new(),
            extra: Map::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposalDraft {
    pub label: String,
    pub node_type: NodeType,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinedNode {
    pub label: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalReview {
    pub approved: bool,
    #[serde(default)]
    pub critique: String,
    #[serde(default)]
    pub provenance_score: Option<f64>,
    #[serde(default)]
    pub refined_node: Option<RefinedNode>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Approved,
    Rejected,
}

/// A reviewed contribution, ready to merge when approved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HubProposal {
    pub id: String,
    pub node_label: String,
    pub node_type: NodeType,
    pub description: String,
    pub status: ProposalStatus,
    pub ai_critique: String,
    pub sources: Vec<Source>,
    pub provenance_score: Option<f64>,
}

impl HubProposal {
    /// Applies the review's refinements over the draft.
    pub fn from_review(id: impl Into<String>, draft: &ProposalDraft, review: ProposalReview) -> Self {
        let (node_label, description) = match review.refined_node {
            Some(refined) => (refined.label, refined.description),
            None => (draft.label.clone(), draft.description.clone()),
        };

        Self {
            id: id.into(),
            node_label,
            node_type: draft.node_type,
            description,
            status: if review.approved {
                ProposalStatus::Approved
            } else {
                ProposalStatus::Rejected
            },
            ai_critique: review.critique,
            sources: review.sources,
            provenance_score: review.provenance_score,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == ProposalStatus::Approved
    }
}

/// Blocking calls into the reasoning service. The dispatcher runs them on
/// worker threads, so implementations may take as long as they need.
pub trait ReasoningService: Send + Sync {
    fn name(&self) -> &str;

    fn enrich(&self, node: &Node, domain: GraphDomain) -> AiResult<EnrichmentData>;

    fn analyze(&self, query: &str, seed_nodes: &[Node], domain: GraphDomain) -> AiResult<HypothesisResult>;

    fn validate_proposal(&self, draft: &ProposalDraft, domain: GraphDomain) -> AiResult<ProposalReview>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// In-process service with scripted answers.
    #[derive(Default)]
    pub(crate) struct ScriptedService {
        pub(crate) relevant_ids: Vec<String>,
        pub(crate) fail_enrichment: bool,
        pub(crate) approve: bool,
        pub(crate) calls: AtomicUsize,
        pub(crate) queries: Mutex<Vec<String>>,
    }

    impl ReasoningService for ScriptedService {
        fn name(&self) -> &str {
            "scripted"
        }

        fn enrich(&self, node: &Node, _domain: GraphDomain) -> AiResult<EnrichmentData> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_enrichment {
                return Err(AiError::Unavailable("offline".to_owned()));
            }
            if node.id == "Boom" {
                panic!("scripted panic");
            }
            Ok(EnrichmentData {
                summary: format!("about {}", node.label),
                ..EnrichmentData::default()
            })
        }

        fn analyze(&self, query: &str, _seed_nodes: &[Node], _domain: GraphDomain) -> AiResult<HypothesisResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.to_owned());
            Ok(HypothesisResult::new(
                format!("hypothesis for {query}"),
                self.relevant_ids.clone(),
            ))
        }

        fn validate_proposal(&self, draft: &ProposalDraft, _domain: GraphDomain) -> AiResult<ProposalReview> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ProposalReview {
                approved: self.approve,
                critique: format!("reviewed {}", draft.label),
                provenance_score: Some(0.5),
                refined_node: None,
                sources: Vec::new(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hypothesis_keeps_unknown_fields() {
        let raw = r#"{
            "hypothesis": "ORF8 drives escape",
            "synthesis": "**ORF8** ...",
            "relevantNodeIds": ["ORF8", "ImmuneEscape"],
            "reasoning": {"intentsDetected": ["mechanism"], "confidenceScore": 0.7},
            "lore": {"complexity": {"graphDepth": 3}}
        }"#;
        let result: HypothesisResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.relevant_node_ids, vec!["ORF8", "ImmuneEscape"]);
        let reasoning = result.reasoning.unwrap();
        assert_eq!(reasoning.intents_detected, vec!["mechanism"]);
        assert!(reasoning.steps.is_empty());
        assert!(result.extra.contains_key("lore"));
    }

    #[test]
    fn review_refinement_overrides_draft() {
        let draft = ProposalDraft {
            label: "xbb".to_owned(),
            node_type: NodeType::Variant,
            description: "new variant".to_owned(),
        };
        let review = ProposalReview {
            approved: true,
            critique: "plausible".to_owned(),
            provenance_score: Some(0.8),
            refined_node: Some(RefinedNode {
                label: "XBB.1.5".to_owned(),
                description: "Recombinant Omicron sublineage.".to_owned(),
            }),
            sources: Vec::new(),
        };
        let proposal = HubProposal::from_review("Proposal-1", &draft, review);
        assert!(proposal.is_approved());
        assert_eq!(proposal.node_label, "XBB.1.5");
        assert_eq!(proposal.node_type, NodeType::Variant);
    }

    #[test]
    fn rejected_review_keeps_draft_text() {
        let draft = ProposalDraft {
            label: "Thing".to_owned(),
            node_type: NodeType::Gene,
            description: "desc".to_owned(),
        };
        let review: ProposalReview =
            serde_json::from_str(r#"{"approved": false, "critique": "no evidence"}"#).unwrap();
        let proposal = HubProposal::from_review("Proposal-2", &draft, review);
        assert_eq!(proposal.status, ProposalStatus::Rejected);
        assert_eq!(proposal.node_label, "Thing");
        assert_eq!(proposal.ai_critique, "no evidence");
    }
}
