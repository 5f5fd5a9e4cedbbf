use serde::de::DeserializeOwned;
use tracing::debug;

use crate::graph::{GraphDomain, Node};

use super::{
    AiError, AiResult, EnrichmentData, HypothesisResult, ProposalDraft, ProposalReview,
    ReasoningService,
};

/// A plain text-in, text-out model endpoint.
pub trait TextCompletion: Send + Sync {
    fn name(&self) -> &str;

    fn complete(&self, prompt: &str) -> AiResult<String>;
}

/// Removes a surrounding Markdown code block, with or without a `json` tag.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    let text = text.trim();

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

fn parse_json<T: DeserializeOwned>(raw: &str) -> AiResult<T> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(AiError::InvalidResponse("empty reply".to_owned()));
    }
    Ok(serde_json::from_str(body)?)
}

pub(crate) fn enrichment_prompt(node: &Node, domain: GraphDomain) -> String {
    format!(
        "Provide a comprehensive scientific enrichment for the entity \"{}\" within the context of {domain}. \
         Use the latest available data.",
        node.label
    )
}

pub(crate) fn hypothesis_prompt(query: &str, seed_nodes: &[Node], domain: GraphDomain) -> String {
    let node_context = seed_nodes
        .iter()
        .map(|node| format!("{} ({}, {})", node.id, node.label, node.node_type))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a scientific reasoning engine.

User Query: "{query}"
Active Primary Domain: {domain}

Available Knowledge Graph Context:
{node_context}

Identify first principles, cross-domain influences and the abstract logic of the
system, then synthesize a hypothesis. Only cite node ids from the context above in
relevantNodeIds.

RETURN RAW JSON ONLY:
{{
  "reasoning": {{
    "intentsDetected": ["string"],
    "steps": ["string"],
    "biasCheck": "string",
    "confidenceScore": number
  }},
  "hypothesis": "string",
  "synthesis": "Markdown formatted summary with bold key terms.",
  "relevantNodeIds": ["string"]
}}"#
    )
}

pub(crate) fn proposal_prompt(draft: &ProposalDraft, domain: GraphDomain) -> String {
    format!(
        r#"Validate the following proposal for the {domain} graph: "{} - {}" (type: {}).
Check scientific validity and provenance.
Return JSON ONLY:
{{
  "approved": boolean,
  "critique": "string",
  "provenanceScore": number,
  "refinedNode": {{ "label": "string", "description": "string" }}
}}"#,
        draft.label, draft.description, draft.node_type
    )
}

/// Serves the reasoning boundary from any text completion backend by
/// building prompts and decoding JSON replies.
pub struct PromptedReasoner<C> {
    backend: C,
}

impl<C: TextCompletion> PromptedReasoner<C> {
    pub fn new(backend: C) -> Self {
        Self { backend }
    }
}

impl<C: TextCompletion> ReasoningService for PromptedReasoner<C> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    fn enrich(&self, node: &Node, domain: GraphDomain) -> AiResult<EnrichmentData> {
        let summary = self.backend.complete(&enrichment_prompt(node, domain))?;
        if summary.trim().is_empty() {
            return Err(AiError::InvalidResponse(format!("empty enrichment for {}", node.id)));
        }

        Ok(EnrichmentData {
            summary,
            sources: Vec::new(),
            related_topics: Vec::new(),
        })
    }

    fn analyze(&self, query: &str, seed_nodes: &[Node], domain: GraphDomain) -> AiResult<HypothesisResult> {
        let raw = self
            .backend
            .complete(&hypothesis_prompt(query, seed_nodes, domain))?;
        debug!(backend = self.backend.name(), bytes = raw.len(), "hypothesis reply received");
        parse_json(&raw)
    }

    fn validate_proposal(&self, draft: &ProposalDraft, domain: GraphDomain) -> AiResult<ProposalReview> {
        let raw = self.backend.complete(&proposal_prompt(draft, domain))?;
        parse_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::graph::NodeType;

    struct Canned {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_owned(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextCompletion for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn complete(&self, prompt: &str) -> AiResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_owned());
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn strips_fenced_json() {
        let raw = "```json\n{\"approved\": true}\n```";
        assert_eq!(strip_code_fences(raw), "{\"approved\": true}");
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn analyze_decodes_fenced_reply_and_lists_seed_nodes() {
        let reasoner = PromptedReasoner::new(Canned::new(
            "```json\n{\"hypothesis\": \"H\", \"relevantNodeIds\": [\"Tau\"]}\n```",
        ));
        let seeds = vec![Node::new("Tau", "Tau", NodeType::HumanProtein, "", 25.0)];
        let result = reasoner
            .analyze("why tangles?", &seeds, GraphDomain::Neuro)
            .unwrap();
        assert_eq!(result.hypothesis, "H");
        assert_eq!(result.relevant_node_ids, vec!["Tau"]);

        let prompts = reasoner.backend.prompts.lock().unwrap();
        assert!(prompts[0].contains("Tau (Tau, Human Protein)"));
        assert!(prompts[0].contains("Neurodegenerative Disease"));
    }

    #[test]
    fn garbage_reply_is_malformed() {
        let reasoner = PromptedReasoner::new(Canned::new("I cannot answer that"));
        let error = reasoner
            .analyze("q", &[], GraphDomain::Neuro)
            .unwrap_err();
        assert!(matches!(error, AiError::Malformed(_)));
    }

    #[test]
    fn empty_enrichment_is_invalid() {
        let reasoner = PromptedReasoner::new(Canned::new("   "));
        let node = Node::new("Tau", "Tau", NodeType::HumanProtein, "", 25.0);
        let error = reasoner.enrich(&node, GraphDomain::Neuro).unwrap_err();
        assert!(matches!(error, AiError::InvalidResponse(_)));
    }

    #[test]
    fn proposal_review_round_trip() {
        let reasoner = PromptedReasoner::new(Canned::new(
            r#"{"approved": true, "critique": "ok", "provenanceScore": 0.9}"#,
        ));
        let draft = ProposalDraft {
            label: "JN.1".to_owned(),
            node_type: NodeType::Variant,
            description: "BA.2.86 descendant".to_owned(),
        };
        let review = reasoner
            .validate_proposal(&draft, GraphDomain::SarsCov2)
            .unwrap();
        assert!(review.approved);
        assert_eq!(review.provenance_score, Some(0.9));
        assert!(reasoner.backend.prompts.lock().unwrap()[0].contains("JN.1 - BA.2.86 descendant"));
    }
}
