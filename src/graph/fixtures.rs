use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ExplorerError, Result};

use super::model::{GraphDataset, GraphDomain};

fn bundled_source(domain: GraphDomain) -> &'static str {
    match domain {
        GraphDomain::SarsCov2 => include_str!("../../fixtures/sars-cov-2.json"),
        GraphDomain::Amr => include_str!("../../fixtures/amr.json"),
        GraphDomain::Oncology => include_str!("../../fixtures/oncology.json"),
        GraphDomain::Neuro => include_str!("../../fixtures/neuro.json"),
        GraphDomain::Climate => include_str!("../../fixtures/climate.json"),
        GraphDomain::SynBio => include_str!("../../fixtures/synbio.json"),
        GraphDomain::Policy => include_str!("../../fixtures/policy.json"),
        GraphDomain::QuantumHealth => include_str!("../../fixtures/quantum-health.json"),
    }
}

pub fn parse_dataset(raw: &str) -> Result<GraphDataset> {
    serde_json::from_str(raw).map_err(|error| ExplorerError::Fixture(error.to_string()))
}

/// Seed dataset shipped with the crate for `domain`.
pub fn bundled_dataset(domain: GraphDomain) -> Result<GraphDataset> {
    serde_json::from_str(bundled_source(domain))
        .map_err(|error| ExplorerError::Fixture(format!("{}: {error}", domain.slug())))
}

/// Reads `<dir>/<slug>.json`.
pub fn dataset_from_dir(dir: &Path, domain: GraphDomain) -> Result<GraphDataset> {
    let path = dir.join(format!("{}.json", domain.slug()));
    debug!(path = %path.display(), "reading domain fixture");
    let raw = fs::read_to_string(&path)
        .map_err(|error| ExplorerError::Fixture(format!("{}: {error}", path.display())))?;
    parse_dataset(&raw)
}
