//! Couples a [`Session`] to the background [`Dispatcher`].
//!
//! The host calls [`Explorer::pump`] once per frame: queued requests go out,
//! finished ones are applied on the calling thread.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::ai::{Completion, Dispatcher, ReasoningService};
use crate::config::ExplorerConfig;
use crate::error::Result;
use crate::graph::{GraphDataset, GraphDomain, bundled_dataset, dataset_from_dir};
use crate::interaction::{ExplorerEvent, Session};
use crate::overlay::Overlay;

/// Where domain datasets come from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FixtureSource {
    #[default]
    Bundled,
    /// `<dir>/<slug>.json` per domain.
    Directory(PathBuf),
}

impl FixtureSource {
    pub fn load(&self, domain: GraphDomain) -> Result<GraphDataset> {
        match self {
            Self::Bundled => bundled_dataset(domain),
            Self::Directory(dir) => dataset_from_dir(dir, domain),
        }
    }
}

pub struct Explorer {
    session: Session,
    dispatcher: Dispatcher,
    fixtures: FixtureSource,
    rng: StdRng,
}

impl Explorer {
    pub fn new(config: &ExplorerConfig, service: Arc<dyn ReasoningService>, fixtures: FixtureSource) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        Self {
            session: Session::new(config),
            dispatcher: Dispatcher::new(service),
            fixtures,
            rng,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Direct access for UI handlers. Requests they queue go out on the next
    /// [`pump`](Self::pump).
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn switch_domain(&mut self, domain: GraphDomain) -> Result<()> {
        let dataset = self.fixtures.load(domain)?;
        self.session.load_domain(domain, dataset)
    }

    pub fn is_busy(&self) -> bool {
        self.dispatcher.in_flight() > 0
    }

    /// Sends every queued request. Returns how many were dispatched.
    pub fn flush(&mut self) -> usize {
        let mut sent = 0;
        for event in self.session.drain_events() {
            let accepted = match event {
                ExplorerEvent::EnrichmentRequested { node, domain } => self.dispatcher.enrich(node, domain),
                ExplorerEvent::HypothesisRequested {
                    turn,
                    query,
                    seed_nodes,
                    domain,
                } => self.dispatcher.analyze(turn, query, seed_nodes, domain),
                ExplorerEvent::ProposalSubmitted {
                    proposal_id,
                    draft,
                    domain,
                } => self.dispatcher.validate(proposal_id, draft, domain),
            };
            if accepted {
                sent += 1;
            }
        }
        sent
    }

    fn apply(&mut self, completion: Completion) -> Result<()> {
        match completion {
            Completion::Enrichment { node_id, result } => {
                self.session.apply_enrichment(&node_id, result);
            }
            Completion::Hypothesis { turn, query, result } => {
                self.session.apply_hypothesis(turn, &query, result)?;
            }
            Completion::ProposalReview {
                proposal_id,
                draft,
                result,
            } => {
                self.session.apply_review(&proposal_id, &draft, result)?;
            }
        }
        Ok(())
    }

    /// Dispatches queued requests and applies every completion that is
    /// already available, without blocking. Returns how many were applied.
    pub fn pump(&mut self) -> Result<usize> {
        self.flush();
        let mut applied = 0;
        while let Some(completion) = self.dispatcher.try_next() {
            self.apply(completion)?;
            applied += 1;
        }
        if applied > 0 {
            // applying can queue follow-ups, e.g. enrichment of a merged proposal
            self.flush();
        }
        Ok(applied)
    }

    /// Pumps until nothing is in flight or `timeout` passes. Returns whether
    /// the explorer went idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        self.pump()?;

        while self.is_busy() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(in_flight = self.dispatcher.in_flight(), "timed out waiting for reasoning service");
                return Ok(false);
            }
            if let Some(completion) = self.dispatcher.wait_next(remaining) {
                self.apply(completion)?;
            }
            self.flush();
        }

        debug!(service = self.dispatcher.service_name(), "explorer idle");
        Ok(true)
    }

    /// Advances the quantum overlay by one frame.
    pub fn tick(&mut self) -> &Overlay {
        self.session.tick(&mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::ai::ProposalDraft;
    use crate::ai::testing::ScriptedService;
    use crate::graph::NodeType;
    use crate::interaction::EnrichmentStatus;

    const WAIT: Duration = Duration::from_secs(5);

    fn explorer(service: ScriptedService) -> (Explorer, Arc<ScriptedService>) {
        let service = Arc::new(service);
        let config = ExplorerConfig {
            seed: Some(1),
            ..ExplorerConfig::default()
        };
        let mut explorer = Explorer::new(&config, service.clone(), FixtureSource::Bundled);
        explorer.switch_domain(GraphDomain::Neuro).unwrap();
        (explorer, service)
    }

    #[test]
    fn click_enriches_in_background() {
        let (mut explorer, service) = explorer(ScriptedService::default());
        explorer.session_mut().click_node("Tau").unwrap();
        assert_eq!(explorer.flush(), 1);
        assert!(explorer.wait_idle(WAIT).unwrap());

        let session = explorer.session();
        assert_eq!(session.enrichment_status("Tau"), EnrichmentStatus::Ready);
        assert_eq!(session.enrichment("Tau").unwrap().summary, "about Tau");
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_enrichment_is_recoverable() {
        let (mut explorer, _) = explorer(ScriptedService {
            fail_enrichment: true,
            ..ScriptedService::default()
        });
        explorer.session_mut().click_node("Tau").unwrap();
        assert!(explorer.wait_idle(WAIT).unwrap());
        assert_eq!(explorer.session().enrichment_status("Tau"), EnrichmentStatus::Failed);
        assert!(explorer.session().highlight().contains("Alzheimers"));
    }

    #[test]
    fn discovered_path_feeds_a_hypothesis_turn() {
        let (mut explorer, service) = explorer(ScriptedService {
            relevant_ids: vec!["Tau".to_owned(), "NotInGraph".to_owned()],
            ..ScriptedService::default()
        });
        let session = explorer.session_mut();
        session.enter_pathfinding();
        session.click_node("Lecanemab").unwrap();
        session.click_node("Tau").unwrap();
        assert!(explorer.wait_idle(WAIT).unwrap());

        let queries = service.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].contains("Lecanemab -> Amyloid"));

        let session = explorer.session();
        let store = session.store().unwrap();
        assert_eq!(store.node_count(), 7);
        assert!(store.contains("Hypothesis-1"));
        assert!(session.mode().is_pathfinding());
        assert!(session.hypothesis().is_some());
    }

    #[test]
    fn approved_proposal_lands_in_the_graph() {
        let (mut explorer, _) = explorer(ScriptedService {
            approve: true,
            ..ScriptedService::default()
        });
        let id = explorer
            .session_mut()
            .submit_proposal(ProposalDraft {
                label: "Donanemab".to_owned(),
                node_type: NodeType::Drug,
                description: "Anti-amyloid antibody".to_owned(),
            })
            .unwrap();
        assert!(explorer.wait_idle(WAIT).unwrap());

        let session = explorer.session();
        assert!(session.store().unwrap().neighbors_of("Alzheimers").contains(id.as_str()));
        assert_eq!(session.mode().focal(), Some(id.as_str()));
        // focusing the merged node enriches it too
        assert_eq!(session.enrichment_status(&id), EnrichmentStatus::Ready);
    }

    #[test]
    fn stale_hypothesis_is_dropped_after_domain_switch() {
        let (mut explorer, _) = explorer(ScriptedService {
            relevant_ids: vec!["Tau".to_owned()],
            ..ScriptedService::default()
        });
        explorer.session_mut().submit_hypothesis("why tangles?").unwrap();
        explorer.flush();
        explorer.switch_domain(GraphDomain::Amr).unwrap();
        let before = explorer.session().store().unwrap().node_count();

        assert!(explorer.wait_idle(WAIT).unwrap());
        let session = explorer.session();
        assert_eq!(session.store().unwrap().node_count(), before);
        assert!(session.hypothesis().is_none());
    }

    #[test]
    fn seeded_ticks_are_reproducible() {
        let (mut first, _) = explorer(ScriptedService::default());
        let (mut second, _) = explorer(ScriptedService::default());
        for explorer in [&mut first, &mut second] {
            explorer.session_mut().set_quantum(true);
            explorer.session_mut().set_density(100.0);
        }
        // neuro has exactly five nodes, below the sampling threshold
        for _ in 0..200 {
            assert!(first.tick().is_empty());
            second.tick();
        }
        assert_eq!(first.session().overlay(), second.session().overlay());
    }
}
