//! Transient "quantum" links shown for visual effect.
//!
//! Nothing here touches the graph store. [`step`] is a pure reducer over the
//! previous overlay; [`OverlaySimulator`] adds the on/off switch and density
//! the host drives it with.

use std::f32::consts::TAU;

use rand::Rng;
use rand::seq::index;
use tracing::debug;

use crate::config::OverlayParams;
use crate::graph::Node;
use crate::util::clamp_density;

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayLink {
    pub source: String,
    pub target: String,
    /// `(0, 1]`; the link is dropped once this reaches zero.
    pub opacity: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overlay {
    pub links: Vec<OverlayLink>,
    /// Animation clock, advanced once per tick while enabled.
    pub phase: f32,
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }
}

/// Per-tick chance of spawning a link. Zero at density 0, rising linearly.
pub fn spawn_probability(density: f32, params: &OverlayParams) -> f64 {
    let probability = f64::from(clamp_density(density)) / f64::from(params.density_divisor);
    if probability.is_finite() {
        probability.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Decays every link, then maybe samples one new link between two distinct
/// nodes.
pub fn step<R: Rng + ?Sized>(
    prev: &Overlay,
    nodes: &[Node],
    density: f32,
    params: &OverlayParams,
    rng: &mut R,
) -> Overlay {
    let mut links = prev
        .links
        .iter()
        .filter_map(|link| {
            let opacity = link.opacity - params.decay_step;
            (opacity > 0.0).then(|| OverlayLink {
                opacity,
                ..link.clone()
            })
        })
        .collect::<Vec<_>>();

    let probability = spawn_probability(density, params);
    let eligible = nodes.len() >= 2 && nodes.len() > params.min_nodes;
    if eligible && probability > 0.0 && rng.gen_bool(probability) {
        let picked = index::sample(rng, nodes.len(), 2);
        let (source, target) = (&nodes[picked.index(0)], &nodes[picked.index(1)]);
        links.push(OverlayLink {
            source: source.id.clone(),
            target: target.id.clone(),
            opacity: 1.0,
        });
    }

    Overlay {
        links,
        phase: (prev.phase + params.phase_step).rem_euclid(TAU),
    }
}

#[derive(Clone, Debug)]
pub struct OverlaySimulator {
    params: OverlayParams,
    enabled: bool,
    density: f32,
    overlay: Overlay,
}

impl OverlaySimulator {
    pub fn new(params: OverlayParams, density: f32) -> Self {
        Self {
            params,
            enabled: false,
            density: clamp_density(density),
            overlay: Overlay::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turning the overlay off discards every transient link and resets the
    /// animation clock immediately.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            debug!(enabled, "quantum overlay toggled");
        }
        self.enabled = enabled;
        if !enabled {
            self.reset();
        }
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn set_density(&mut self, density: f32) {
        self.density = clamp_density(density);
    }

    pub fn params(&self) -> &OverlayParams {
        &self.params
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn reset(&mut self) {
        self.overlay = Overlay::default();
    }

    /// Advances one frame. While disabled this only guarantees the overlay is
    /// empty.
    pub fn tick<R: Rng + ?Sized>(&mut self, nodes: &[Node], rng: &mut R) -> &Overlay {
        if self.enabled {
            self.overlay = step(&self.overlay, nodes, self.density, &self.params, rng);
        } else if !self.overlay.is_empty() {
            self.reset();
        }
        &self.overlay
    }
}
