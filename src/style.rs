//! Per-node and per-link styling handed to the renderer.

use egui::Color32;

use crate::graph::{Link, Node, NodeType};
use crate::highlight::Highlight;
use crate::overlay::OverlayLink;
use crate::util::stable_phase;

const fn hex(rgb: u32) -> Color32 {
    Color32::from_rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

const PATH_COLOR: Color32 = hex(0xf97316);
const QUANTUM_CYAN: Color32 = hex(0x06b6d4);
const QUANTUM_MAGENTA: Color32 = hex(0xd946ef);
const EMPHASIZED_LINK: Color32 = Color32::WHITE;
// translucent whites, premultiplied
const FADED_LINK: Color32 = Color32::from_rgba_premultiplied(5, 5, 5, 5);
const DEFAULT_LINK: Color32 = Color32::from_rgba_premultiplied(51, 51, 51, 51);

pub fn type_color(node_type: NodeType) -> Color32 {
    match node_type {
        NodeType::ViralProtein => hex(0xef4444),
        NodeType::ViralCapsid => hex(0xf472b6),
        NodeType::ViralEnvelope => hex(0xdb2777),
        NodeType::ViralMatrix => hex(0x9d174d),
        NodeType::ViralNsp => hex(0xa855f7),
        NodeType::ViralSecreted => hex(0xc084fc),
        NodeType::FuncEntry => hex(0xfca5a5),
        NodeType::FuncReplication => hex(0xfbbf24),
        NodeType::FuncProtease => hex(0xef4444),
        NodeType::FuncImmuneMod => hex(0xf97316),
        NodeType::HumanProtein => hex(0x3b82f6),
        NodeType::Drug => hex(0x10b981),
        NodeType::Phenotype => hex(0xf59e0b),
        NodeType::Pathway => hex(0x8b5cf6),
        NodeType::Variant => hex(0xec4899),
        NodeType::Vaccine => hex(0x06b6d4),
        NodeType::Surveillance => hex(0xf97316),
        NodeType::Dataset => hex(0x64748b),
        NodeType::Literature => hex(0xe2e8f0),
        NodeType::GoTerm => hex(0x84cc16),
        NodeType::ClinicalTrial => hex(0x0ea5e9),
        NodeType::PatientCohort => hex(0x6366f1),
        NodeType::TumorMarker => hex(0xf43f5e),
        NodeType::Gene => hex(0xd946ef),
        NodeType::Bacteria => hex(0xa3e635),
        NodeType::Tool => hex(0x22d3ee),
        NodeType::Pollutant => hex(0x71717a),
        NodeType::Location => hex(0xfacc15),
        NodeType::Event => hex(0xf43f5e),
        NodeType::SocioEconomic => hex(0x8b5cf6),
        NodeType::Comorbidity => hex(0xbe123c),
        NodeType::Coinfection => hex(0xb91c1c),
        NodeType::Environmental => hex(0x15803d),
        NodeType::Policy => hex(0x6366f1),
        NodeType::Ethics => hex(0xfbbf24),
        NodeType::Actor => hex(0x14b8a6),
        NodeType::Query => hex(0xffffff),
        NodeType::Hypothesis => hex(0xd946ef),
    }
}

pub fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * factor) as u8,
    )
}

/// Styling callbacks for one frame, derived from the current highlight and
/// overlay phase. `quantum_phase` is `None` while quantum mode is off.
#[derive(Clone, Copy, Debug)]
pub struct RenderStyle<'a> {
    pub highlight: &'a Highlight,
    pub quantum_phase: Option<f32>,
}

impl<'a> RenderStyle<'a> {
    pub fn new(highlight: &'a Highlight, quantum_phase: Option<f32>) -> Self {
        Self {
            highlight,
            quantum_phase,
        }
    }

    pub fn node_color(&self, node: &Node) -> Color32 {
        let base = type_color(node.node_type);
        if self.quantum_phase.is_some() || !self.highlight.is_active() {
            return base;
        }

        if self.highlight.is_focal(&node.id) || self.highlight.contains(&node.id) {
            base
        } else {
            dim_color(base, 0.1)
        }
    }

    pub fn node_size(&self, node: &Node) -> f32 {
        let mut size = node.weight * 1.5;
        if let Some(phase) = self.quantum_phase {
            let pulse = (phase * 2.0 + stable_phase(&node.id)).sin() * 3.0;
            size = (size + pulse).max(1.0);
        }

        if self.highlight.is_focal(&node.id) {
            size * 1.5
        } else {
            size
        }
    }

    pub fn link_color(&self, link: &Link) -> Color32 {
        if let Some(phase) = self.quantum_phase {
            let wave = (phase + stable_phase(&link.source)).sin();
            return blend_color(QUANTUM_CYAN, QUANTUM_MAGENTA, (1.0 - wave) / 2.0).gamma_multiply(0.4);
        }

        if !self.highlight.is_active() {
            return DEFAULT_LINK;
        }
        if self.highlight.is_path_link(link) {
            PATH_COLOR
        } else if self.highlight.emphasizes_link(link) {
            EMPHASIZED_LINK
        } else {
            FADED_LINK
        }
    }

    pub fn link_width(&self, link: &Link) -> f32 {
        if let Some(phase) = self.quantum_phase {
            return (phase + stable_phase(&link.target)).sin().abs() * 2.0 + 0.5;
        }

        if !self.highlight.is_active() {
            return 1.0;
        }
        if self.highlight.is_path_link(link) {
            3.0
        } else if self.highlight.touches_focal(link) {
            2.5
        } else if self.highlight.emphasizes_link(link) {
            1.5
        } else {
            0.0
        }
    }

    pub fn link_particles(&self, link: &Link) -> u32 {
        if self.quantum_phase.is_some() {
            return 2;
        }

        if self.highlight.is_path_link(link) {
            6
        } else if self.highlight.touches_focal(link) {
            4
        } else {
            0
        }
    }

    pub fn link_particle_width(&self) -> f32 {
        if self.quantum_phase.is_some() { 2.0 } else { 4.0 }
    }

    pub fn overlay_color(&self, link: &OverlayLink) -> Color32 {
        let alpha = (link.opacity.clamp(0.0, 1.0) * 0.8 * 255.0) as u8;
        Color32::from_rgba_unmultiplied(6, 182, 212, alpha)
    }

    /// Overlay links draw no line, only a stream of particles.
    pub fn overlay_width(&self, _link: &OverlayLink) -> f32 {
        0.0
    }

    pub fn overlay_particles(&self, _link: &OverlayLink) -> u32 {
        6
    }

    pub fn overlay_particle_width(&self, link: &OverlayLink) -> f32 {
        let pulse = self
            .quantum_phase
            .map(|phase| (phase * 8.0).sin() * 1.5)
            .unwrap_or(0.0);
        (link.opacity * 3.0 + pulse).max(0.0)
    }
}

/// Legend entries for the types present in `nodes`, in catalogue order.
pub fn present_types(nodes: &[Node]) -> Vec<(NodeType, Color32)> {
    NodeType::ALL
        .iter()
        .copied()
        .filter(|kind| nodes.iter().any(|node| node.node_type == *kind))
        .map(|kind| (kind, type_color(kind)))
        .collect()
}
