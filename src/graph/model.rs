use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExplorerError;

macro_rules! node_types {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Entity category of a node. Serialized as its display name.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum NodeType {
            $(#[serde(rename = $name)] $variant,)+
        }

        impl NodeType {
            /// Every type in legend order.
            pub const ALL: &'static [NodeType] = &[$(NodeType::$variant,)+];

            pub fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

node_types! {
    ViralProtein => "Viral Protein",
    ViralCapsid => "Capsid Protein",
    ViralEnvelope => "Envelope Protein",
    ViralMatrix => "Matrix Protein",
    ViralNsp => "Non-Structural Protein",
    ViralSecreted => "Secreted/Accessory",
    FuncEntry => "Entry Mechanism",
    FuncReplication => "Replication Machinery",
    FuncProtease => "Protease Activity",
    FuncImmuneMod => "Immune Modulation",
    HumanProtein => "Human Protein",
    Drug => "Drug/Compound",
    Phenotype => "Phenotype/Symptom",
    Pathway => "Biological Pathway",
    Variant => "Variant",
    Vaccine => "Vaccine/Therapeutic",
    Surveillance => "Surveillance",
    Dataset => "Dataset",
    Literature => "Literature",
    GoTerm => "Process",
    ClinicalTrial => "Clinical Trial",
    PatientCohort => "Patient Cohort",
    TumorMarker => "Tumor Marker",
    Gene => "Gene/Genetic Part",
    Bacteria => "Microbe/Strain",
    Tool => "Tool/Method",
    Pollutant => "Pollutant/Factor",
    Location => "Location/Region",
    Event => "Climate Event",
    SocioEconomic => "Socioeconomic Factor",
    Comorbidity => "Comorbidity",
    Coinfection => "Coinfection",
    Environmental => "Environmental Factor",
    Policy => "Policy/Framework",
    Ethics => "Ethical Concern",
    Actor => "Actor/Agency",
    Query => "User Evidence",
    Hypothesis => "AI Hypothesis",
}

impl NodeType {
    /// Types produced by hypothesis turns rather than domain authoring.
    /// They are never sent for enrichment.
    pub fn is_synthetic(self) -> bool {
        matches!(self, Self::Query | Self::Hypothesis)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NodeType {
    type Err = ExplorerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .iter()
            .copied()
            .find(|kind| kind.label().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ExplorerError::invalid(format!("unknown node type `{value}`")))
    }
}

fn default_weight() -> f32 {
    5.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub description: String,
    /// Visual size hint.
    #[serde(default = "default_weight", rename = "val")]
    pub weight: f32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl Node {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        node_type: NodeType,
        description: impl Into<String>,
        weight: f32,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            node_type,
            description: description.into(),
            weight,
            metadata: BTreeMap::new(),
        }
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// Directed in storage, traversed as undirected. Endpoints are node ids only.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub label: String,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: label.into(),
        }
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }

    pub fn other_end(&self, id: &str) -> Option<&str> {
        if self.source == id {
            Some(&self.target)
        } else if self.target == id {
            Some(&self.source)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDataset {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphDomain {
    #[default]
    #[serde(rename = "SARS-CoV-2")]
    SarsCov2,
    #[serde(rename = "Antimicrobial Resistance")]
    Amr,
    #[serde(rename = "Oncology (Precision Med)")]
    Oncology,
    #[serde(rename = "Neurodegenerative Disease")]
    Neuro,
    #[serde(rename = "Climate-Health")]
    Climate,
    #[serde(rename = "Synthetic Biology")]
    SynBio,
    #[serde(rename = "Global Policy & Ethics")]
    Policy,
    #[serde(rename = "Quantum AI in Health")]
    QuantumHealth,
}

impl GraphDomain {
    pub const ALL: [GraphDomain; 8] = [
        Self::SarsCov2,
        Self::Amr,
        Self::Oncology,
        Self::Neuro,
        Self::Climate,
        Self::SynBio,
        Self::Policy,
        Self::QuantumHealth,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::SarsCov2 => "SARS-CoV-2",
            Self::Amr => "Antimicrobial Resistance",
            Self::Oncology => "Oncology (Precision Med)",
            Self::Neuro => "Neurodegenerative Disease",
            Self::Climate => "Climate-Health",
            Self::SynBio => "Synthetic Biology",
            Self::Policy => "Global Policy & Ethics",
            Self::QuantumHealth => "Quantum AI in Health",
        }
    }

    /// Short identifier used for fixture file names and the CLI.
    pub fn slug(self) -> &'static str {
        match self {
            Self::SarsCov2 => "sars-cov-2",
            Self::Amr => "amr",
            Self::Oncology => "oncology",
            Self::Neuro => "neuro",
            Self::Climate => "climate",
            Self::SynBio => "synbio",
            Self::Policy => "policy",
            Self::QuantumHealth => "quantum-health",
        }
    }
}

impl fmt::Display for GraphDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GraphDomain {
    type Err = ExplorerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|domain| {
                domain.slug().eq_ignore_ascii_case(value) || domain.label().eq_ignore_ascii_case(value)
            })
            .ok_or_else(|| ExplorerError::invalid(format!("unknown domain `{value}`")))
    }
}
