use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::graph::{GraphDomain, Node};

use super::{
    AiError, AiResult, EnrichmentData, HypothesisResult, ProposalDraft, ProposalReview,
    ReasoningService,
};

/// Identity of an outstanding request. At most one request per key is in
/// flight.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RequestKey {
    Enrichment(String),
    Hypothesis(u64),
    Proposal(String),
}

#[derive(Debug)]
pub enum Completion {
    Enrichment {
        node_id: String,
        result: AiResult<EnrichmentData>,
    },
    Hypothesis {
        turn: u64,
        query: String,
        result: AiResult<HypothesisResult>,
    },
    ProposalReview {
        proposal_id: String,
        draft: ProposalDraft,
        result: AiResult<ProposalReview>,
    },
}

impl Completion {
    pub fn key(&self) -> RequestKey {
        match self {
            Self::Enrichment { node_id, .. } => RequestKey::Enrichment(node_id.clone()),
            Self::Hypothesis { turn, .. } => RequestKey::Hypothesis(*turn),
            Self::ProposalReview { proposal_id, .. } => RequestKey::Proposal(proposal_id.clone()),
        }
    }
}

/// Runs reasoning calls on worker threads and hands results back over a
/// channel. The owner drains completions on its own thread, so nothing a
/// worker does touches graph state directly.
pub struct Dispatcher {
    service: Arc<dyn ReasoningService>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    in_flight: HashSet<RequestKey>,
}

fn guarded<T>(what: &str, call: impl FnOnce() -> AiResult<T>) -> AiResult<T> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|_| Err(AiError::WorkerPanicked(what.to_owned())))
}

impl Dispatcher {
    pub fn new(service: Arc<dyn ReasoningService>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            service,
            tx,
            rx,
            in_flight: HashSet::new(),
        }
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    pub fn is_pending(&self, key: &RequestKey) -> bool {
        self.in_flight.contains(key)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn claim(&mut self, key: RequestKey) -> bool {
        if self.in_flight.insert(key.clone()) {
            true
        } else {
            debug!(?key, "request already in flight");
            false
        }
    }

    fn spawn(&self, work: impl FnOnce(&dyn ReasoningService) -> Completion + Send + 'static) {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let completion = work(service.as_ref());
            // receiver only goes away with the dispatcher
            let _ = tx.send(completion);
        });
    }

    pub fn enrich(&mut self, node: Node, domain: GraphDomain) -> bool {
        if !self.claim(RequestKey::Enrichment(node.id.clone())) {
            return false;
        }

        self.spawn(move |service| {
            let result = guarded(&node.id, || service.enrich(&node, domain));
            Completion::Enrichment {
                node_id: node.id,
                result,
            }
        });
        true
    }

    pub fn analyze(&mut self, turn: u64, query: String, seed_nodes: Vec<Node>, domain: GraphDomain) -> bool {
        if !self.claim(RequestKey::Hypothesis(turn)) {
            return false;
        }

        self.spawn(move |service| {
            let result = guarded(&format!("hypothesis turn {turn}"), || {
                service.analyze(&query, &seed_nodes, domain)
            });
            Completion::Hypothesis {
                turn,
                query,
                result,
            }
        });
        true
    }

    pub fn validate(&mut self, proposal_id: String, draft: ProposalDraft, domain: GraphDomain) -> bool {
        if !self.claim(RequestKey::Proposal(proposal_id.clone())) {
            return false;
        }

        self.spawn(move |service| {
            let result = guarded(&proposal_id, || service.validate_proposal(&draft, domain));
            Completion::ProposalReview {
                proposal_id,
                draft,
                result,
            }
        });
        true
    }

    fn settle(&mut self, completion: Completion) -> Completion {
        self.in_flight.remove(&completion.key());
        completion
    }

    /// Next finished request, without blocking.
    pub fn try_next(&mut self) -> Option<Completion> {
        match self.rx.try_recv() {
            Ok(completion) => Some(self.settle(completion)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("dispatcher channel disconnected");
                None
            }
        }
    }

    /// Blocks up to `timeout` for the next finished request.
    pub fn wait_next(&mut self, timeout: Duration) -> Option<Completion> {
        if self.in_flight.is_empty() {
            return self.try_next();
        }

        match self.rx.recv_timeout(timeout) {
            Ok(completion) => Some(self.settle(completion)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("dispatcher channel disconnected");
                None
            }
        }
    }
}
