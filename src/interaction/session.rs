use std::collections::HashSet;
use std::mem;

use egui::Color32;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::ai::{AiResult, EnrichmentData, HubProposal, HypothesisResult, ProposalDraft, ProposalReview};
use crate::config::ExplorerConfig;
use crate::error::{ExplorerError, Result};
use crate::graph::{GraphDataset, GraphDomain, GraphStore, Node, NodeType};
use crate::highlight::{GraphPath, Highlight, PathOutcome, related_literature};
use crate::merge::MergeController;
use crate::overlay::{Overlay, OverlaySimulator};
use crate::style::{RenderStyle, present_types};

use super::{
    Derived, EnrichmentCache, EnrichmentStatus, ExplorerEvent, Mode, Panels, TurnFocus, derive,
};

fn no_dataset() -> ExplorerError {
    ExplorerError::invalid("no dataset loaded")
}

#[derive(Debug, Default)]
struct HypothesisState {
    result: Option<HypothesisResult>,
    turn: Option<TurnFocus>,
    /// The only turn whose response will still be applied.
    pending: Option<u64>,
    error: Option<String>,
}

/// Single-threaded owner of the active dataset and all view state.
///
/// Every handler runs to completion synchronously. Work for the reasoning
/// service leaves as [`ExplorerEvent`]s and comes back through the `apply_*`
/// methods, which check that the response is still wanted before touching
/// anything.
pub struct Session {
    store: Option<GraphStore>,
    mode: Mode,
    panels: Panels,
    derived: Derived,
    merges: MergeController,
    hypothesis: HypothesisState,
    next_turn: u64,
    enrichment: EnrichmentCache,
    pending_proposals: HashSet<String>,
    proposals: Vec<HubProposal>,
    hub_error: Option<String>,
    overlay: OverlaySimulator,
    events: Vec<ExplorerEvent>,
}

impl Session {
    pub fn new(config: &ExplorerConfig) -> Self {
        Self {
            store: None,
            mode: Mode::default(),
            panels: Panels::default(),
            derived: Derived::default(),
            merges: MergeController::new(),
            hypothesis: HypothesisState::default(),
            next_turn: 0,
            enrichment: EnrichmentCache::default(),
            pending_proposals: HashSet::new(),
            proposals: Vec::new(),
            hub_error: None,
            overlay: OverlaySimulator::new(config.overlay, config.default_density),
            events: Vec::new(),
        }
    }

    /// Replaces the active dataset and resets every piece of derived state.
    /// The enrichment cache is kept. On error nothing changes.
    pub fn load_domain(&mut self, domain: GraphDomain, dataset: GraphDataset) -> Result<()> {
        let store = GraphStore::load(domain, dataset)?;
        info!(
            domain = %domain,
            nodes = store.node_count(),
            links = store.link_count(),
            "switched domain"
        );

        self.store = Some(store);
        self.mode = Mode::default();
        self.merges = MergeController::new();
        self.hypothesis = HypothesisState::default();
        self.pending_proposals.clear();
        self.proposals.clear();
        self.hub_error = None;
        self.overlay.reset();
        self.refresh();
        Ok(())
    }

    fn refresh(&mut self) {
        self.derived = derive(self.store.as_ref(), &self.mode, self.hypothesis.turn.as_ref());
    }

    pub fn store(&self) -> Option<&GraphStore> {
        self.store.as_ref()
    }

    pub fn domain(&self) -> Option<GraphDomain> {
        self.store.as_ref().map(GraphStore::domain)
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn panels(&self) -> Panels {
        self.panels
    }

    pub fn highlight(&self) -> &Highlight {
        &self.derived.highlight
    }

    pub fn path(&self) -> Option<&PathOutcome> {
        self.derived.path.as_ref()
    }

    pub fn path_prompt(&self) -> Option<&'static str> {
        self.mode.path_prompt()
    }

    pub fn focal_node(&self) -> Option<&Node> {
        let focal = self.mode.focal()?;
        self.store.as_ref()?.node(focal)
    }

    pub fn related_literature(&self) -> Vec<&Node> {
        match (self.store.as_ref(), self.mode.focal()) {
            (Some(store), Some(focal)) => related_literature(store, focal),
            _ => Vec::new(),
        }
    }

    /// Handles a node click according to the current mode.
    pub fn click_node(&mut self, id: &str) -> Result<()> {
        let store = self.store.as_ref().ok_or_else(no_dataset)?;
        let node = store
            .node(id)
            .cloned()
            .ok_or_else(|| ExplorerError::invalid(format!("unknown node `{id}`")))?;

        match &mut self.mode {
            Mode::Pathfinding { start: None, .. } => {
                self.mode = Mode::Pathfinding {
                    start: Some(node.id),
                    end: None,
                };
                self.refresh();
            }
            Mode::Pathfinding {
                start: Some(start),
                end: end @ None,
            } if *start != node.id => {
                *end = Some(node.id);
                self.refresh();
                if let Some(PathOutcome::Found(path)) = self.derived.path.clone() {
                    self.request_path_hypothesis(&path);
                }
            }
            Mode::Pathfinding { .. } => {
                debug!(start = %node.id, "restarting pathfinding");
                self.hypothesis.pending = None;
                self.mode = Mode::Pathfinding {
                    start: Some(node.id),
                    end: None,
                };
                self.refresh();
            }
            Mode::Browse { focal } | Mode::HypothesisAugmentation { focal } => {
                *focal = Some(node.id.clone());
                self.refresh();
                self.request_enrichment(&node);
            }
        }

        Ok(())
    }

    pub fn clear_selection(&mut self) {
        if let Mode::Browse { focal } | Mode::HypothesisAugmentation { focal } = &mut self.mode {
            *focal = None;
        }
        self.refresh();
    }

    pub fn enter_pathfinding(&mut self) {
        debug!("entering pathfinding");
        self.hypothesis.pending = None;
        self.mode = Mode::pathfinding();
        self.refresh();
    }

    pub fn exit_pathfinding(&mut self) {
        if self.mode.is_pathfinding() {
            self.enter_browse(None);
        }
    }

    pub fn toggle_pathfinding(&mut self) {
        if self.mode.is_pathfinding() {
            self.exit_pathfinding();
        } else {
            self.enter_pathfinding();
        }
    }

    /// Opens the hypothesis panel, keeping any browse selection. A response
    /// still pending for a discovered path stays wanted.
    pub fn enter_hypothesis(&mut self) {
        if self.mode.is_hypothesis() {
            return;
        }
        let focal = self.mode.focal().map(str::to_owned);
        self.mode = Mode::HypothesisAugmentation { focal };
        self.panels.hub_open = false;
        self.refresh();
    }

    pub fn exit_hypothesis(&mut self) {
        if self.mode.is_hypothesis() {
            let focal = self.mode.focal().map(str::to_owned);
            self.enter_browse(focal);
        }
    }

    pub fn toggle_hypothesis(&mut self) {
        if self.mode.is_hypothesis() {
            self.exit_hypothesis();
        } else {
            self.enter_hypothesis();
        }
    }

    fn enter_browse(&mut self, focal: Option<String>) {
        debug!("back to browse");
        self.hypothesis.pending = None;
        self.mode = Mode::Browse { focal };
        self.refresh();
    }

    pub fn toggle_hub(&mut self) {
        self.panels.hub_open = !self.panels.hub_open;
        if self.panels.hub_open {
            self.exit_hypothesis();
        }
    }

    pub fn set_legend_expanded(&mut self, expanded: bool) {
        self.panels.legend_expanded = expanded;
    }

    pub fn legend(&self) -> Vec<(NodeType, Color32)> {
        self.store
            .as_ref()
            .map(|store| present_types(store.nodes()))
            .unwrap_or_default()
    }

    // enrichment

    fn request_enrichment(&mut self, node: &Node) -> bool {
        if node.node_type.is_synthetic() {
            return false;
        }
        let Some(domain) = self.domain() else {
            return false;
        };
        if !self.enrichment.begin(&node.id) {
            return false;
        }

        debug!(node = %node.id, "requesting enrichment");
        self.events.push(ExplorerEvent::EnrichmentRequested {
            node: node.clone(),
            domain,
        });
        true
    }

    /// Re-issues a failed or missing enrichment. False when nothing was sent.
    pub fn retry_enrichment(&mut self, id: &str) -> Result<bool> {
        let store = self.store.as_ref().ok_or_else(no_dataset)?;
        let node = store
            .node(id)
            .cloned()
            .ok_or_else(|| ExplorerError::invalid(format!("unknown node `{id}`")))?;
        Ok(self.request_enrichment(&node))
    }

    /// Caches by node id whatever is focused now.
    pub fn apply_enrichment(&mut self, node_id: &str, result: AiResult<EnrichmentData>) {
        match result {
            Ok(data) => {
                debug!(node = %node_id, "enrichment cached");
                self.enrichment.complete(node_id, data);
            }
            Err(error) => {
                warn!(node = %node_id, %error, "enrichment failed");
                self.enrichment.fail(node_id);
            }
        }
    }

    pub fn enrichment(&self, id: &str) -> Option<&EnrichmentData> {
        self.enrichment.get(id)
    }

    pub fn enrichment_status(&self, id: &str) -> EnrichmentStatus {
        self.enrichment.status(id)
    }

    // hypotheses

    fn issue_turn(&mut self) -> u64 {
        self.next_turn += 1;
        self.hypothesis.pending = Some(self.next_turn);
        self.hypothesis.error = None;
        self.next_turn
    }

    fn request_path_hypothesis(&mut self, path: &GraphPath) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let domain = store.domain();
        let labels = path
            .nodes
            .iter()
            .map(|id| store.node(id).map_or(id.as_str(), |node| node.label.as_str()))
            .collect::<Vec<_>>();
        let query = format!(
            "Explain the mechanistic connection between {} and {} along the path {}.",
            labels.first().copied().unwrap_or_default(),
            labels.last().copied().unwrap_or_default(),
            labels.join(" -> ")
        );
        let seed_nodes = path
            .nodes
            .iter()
            .filter_map(|id| store.node(id).cloned())
            .collect();

        let turn = self.issue_turn();
        info!(turn, hops = path.hops(), "path found, requesting hypothesis");
        self.events.push(ExplorerEvent::HypothesisRequested {
            turn,
            query,
            seed_nodes,
            domain,
        });
    }

    /// Starts a hypothesis turn over the whole dataset. An empty query
    /// clears the current result instead and returns `None`.
    pub fn submit_hypothesis(&mut self, query: &str) -> Result<Option<u64>> {
        let query = query.trim();
        if query.is_empty() {
            debug!("clearing hypothesis");
            self.hypothesis = HypothesisState::default();
            self.refresh();
            return Ok(None);
        }

        let store = self.store.as_ref().ok_or_else(no_dataset)?;
        let domain = store.domain();
        let seed_nodes = store.nodes().to_vec();

        self.enter_hypothesis();
        let turn = self.issue_turn();
        info!(turn, "requesting hypothesis");
        self.events.push(ExplorerEvent::HypothesisRequested {
            turn,
            query: query.to_owned(),
            seed_nodes,
            domain,
        });
        Ok(Some(turn))
    }

    /// Merges a hypothesis response if its turn is still the one awaited.
    /// Returns whether anything was merged.
    pub fn apply_hypothesis(&mut self, turn: u64, query: &str, result: AiResult<HypothesisResult>) -> Result<bool> {
        if self.hypothesis.pending != Some(turn) {
            debug!(turn, "dropping stale hypothesis response");
            return Ok(false);
        }
        self.hypothesis.pending = None;

        let result = match result {
            Ok(result) => result,
            Err(error) => {
                warn!(turn, %error, "hypothesis request failed");
                self.hypothesis.error = Some(error.to_string());
                return Ok(false);
            }
        };

        let store = self.store.as_mut().ok_or_else(no_dataset)?;
        let merge = self.merges.merge_hypothesis(store, query, &result)?;
        info!(
            turn,
            hypothesis = %merge.hypothesis_id,
            relevant = result.relevant_node_ids.len(),
            "hypothesis merged"
        );

        self.hypothesis.turn = Some(TurnFocus {
            turn,
            node_ids: merge.highlight_ids(),
        });
        self.hypothesis.result = Some(result);
        self.hypothesis.error = None;
        if let Mode::HypothesisAugmentation { focal } = &mut self.mode {
            *focal = None;
        }
        self.refresh();
        Ok(true)
    }

    pub fn hypothesis(&self) -> Option<&HypothesisResult> {
        self.hypothesis.result.as_ref()
    }

    pub fn hypothesis_error(&self) -> Option<&str> {
        self.hypothesis.error.as_deref()
    }

    pub fn is_analyzing(&self) -> bool {
        self.hypothesis.pending.is_some()
    }

    // hub proposals

    /// Queues a draft for review and returns the id the node will get if
    /// approved.
    pub fn submit_proposal(&mut self, draft: ProposalDraft) -> Result<String> {
        if draft.label.trim().is_empty() || draft.description.trim().is_empty() {
            return Err(ExplorerError::invalid("a proposal needs a label and a description"));
        }
        let store = self.store.as_ref().ok_or_else(no_dataset)?;
        let domain = store.domain();
        let proposal_id = self.merges.next_proposal_id(store);

        debug!(id = %proposal_id, label = %draft.label, "submitting proposal");
        self.pending_proposals.insert(proposal_id.clone());
        self.hub_error = None;
        self.events.push(ExplorerEvent::ProposalSubmitted {
            proposal_id: proposal_id.clone(),
            draft,
            domain,
        });
        Ok(proposal_id)
    }

    /// Records a review. Approved proposals are merged and focused as if
    /// clicked. Reviews for proposals this dataset no longer awaits give
    /// `None`.
    pub fn apply_review(
        &mut self,
        proposal_id: &str,
        draft: &ProposalDraft,
        result: AiResult<ProposalReview>,
    ) -> Result<Option<HubProposal>> {
        if !self.pending_proposals.remove(proposal_id) {
            debug!(id = %proposal_id, "dropping stale proposal review");
            return Ok(None);
        }

        let review = match result {
            Ok(review) => review,
            Err(error) => {
                warn!(id = %proposal_id, %error, "proposal validation failed");
                self.hub_error = Some(error.to_string());
                return Ok(None);
            }
        };

        let proposal = HubProposal::from_review(proposal_id, draft, review);
        if proposal.is_approved() {
            let store = self.store.as_mut().ok_or_else(no_dataset)?;
            self.merges.merge_proposal(store, &proposal)?;
            info!(id = %proposal.id, label = %proposal.node_label, "proposal approved and merged");
            self.click_node(&proposal.id)?;
        } else {
            info!(id = %proposal.id, "proposal rejected");
        }

        self.proposals.push(proposal.clone());
        Ok(Some(proposal))
    }

    pub fn proposals(&self) -> &[HubProposal] {
        &self.proposals
    }

    pub fn hub_error(&self) -> Option<&str> {
        self.hub_error.as_deref()
    }

    pub fn is_reviewing(&self) -> bool {
        !self.pending_proposals.is_empty()
    }

    // quantum overlay

    pub fn set_quantum(&mut self, enabled: bool) {
        self.overlay.set_enabled(enabled);
    }

    pub fn quantum_enabled(&self) -> bool {
        self.overlay.is_enabled()
    }

    pub fn set_density(&mut self, density: f32) {
        self.overlay.set_density(density);
    }

    pub fn density(&self) -> f32 {
        self.overlay.density()
    }

    pub fn overlay(&self) -> &Overlay {
        self.overlay.overlay()
    }

    /// One animation frame of the overlay.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &Overlay {
        let nodes = self.store.as_ref().map_or(&[][..], GraphStore::nodes);
        self.overlay.tick(nodes, rng)
    }

    pub fn render_style(&self) -> RenderStyle<'_> {
        let phase = self
            .overlay
            .is_enabled()
            .then(|| self.overlay.overlay().phase);
        RenderStyle::new(&self.derived.highlight, phase)
    }

    /// Takes every request emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<ExplorerEvent> {
        mem::take(&mut self.events)
    }
}
