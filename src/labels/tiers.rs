use std::collections::HashSet;

use anyhow::anyhow;
use serde::Deserialize;

use super::vertex::VertexEntry;

/// Zoom level up to which the closest tier stays visible.
pub const MAX_ZOOM: f64 = 24.0;

/// Sampling configuration for one zoom bracket of coordinate labels.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LabelTier {
    /// The tier is shown from this zoom level up to the next tier's minimum zoom.
    pub min_zoom: f64,
    /// Edge length in degrees of the grid used to thin out labels. One label per cell is kept.
    pub cell_size: f64,
    /// Text size at the bottom and the top of the tier's zoom bracket.
    pub text_size: (f64, f64),
}

/// Validated tiers, ordered from the farthest zoom to the closest.
#[derive(Debug, Clone, PartialEq)]
pub struct TierSet {
    tiers: Vec<LabelTier>,
}

/// The vertices retained by one tier, along with the zoom bracket they are shown in.
#[derive(Debug, Clone, PartialEq)]
pub struct TierSample {
    pub tier: LabelTier,
    pub max_zoom: f64,
    pub allow_overlap: bool,
    pub vertices: Vec<VertexEntry>,
}

impl TierSet {
    pub fn new(tiers: Vec<LabelTier>) -> anyhow::Result<Self> {
        if tiers.is_empty() {
            return Err(anyhow!("At least one label tier is required"));
        }
        for tier in tiers.iter() {
            if !tier.cell_size.is_finite() || tier.cell_size <= 0.0 {
                return Err(anyhow!(
                    "Tier at zoom {} has invalid cell size {}",
                    tier.min_zoom,
                    tier.cell_size
                ));
            }
            let (min_size, max_size) = tier.text_size;
            if !(min_size > 0.0 && max_size > 0.0) {
                return Err(anyhow!(
                    "Tier at zoom {} has invalid text size range {:?}",
                    tier.min_zoom,
                    tier.text_size
                ));
            }
            if !tier.min_zoom.is_finite() || tier.min_zoom < 0.0 || tier.min_zoom >= MAX_ZOOM {
                return Err(anyhow!("Tier has invalid minimum zoom {}", tier.min_zoom));
            }
        }
        for pair in tiers.windows(2) {
            if pair[1].min_zoom <= pair[0].min_zoom {
                return Err(anyhow!(
                    "Tier minimum zooms must increase, found {} after {}",
                    pair[1].min_zoom,
                    pair[0].min_zoom
                ));
            }
            if pair[1].cell_size > pair[0].cell_size {
                return Err(anyhow!(
                    "Tier at zoom {} has a larger cell size than the tier at zoom {}",
                    pair[1].min_zoom,
                    pair[0].min_zoom
                ));
            }
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[LabelTier] {
        &self.tiers
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Upper zoom of the tier at `index`: the next tier's minimum zoom, or `MAX_ZOOM` for the closest tier.
    pub fn max_zoom(&self, index: usize) -> f64 {
        self.tiers
            .get(index + 1)
            .map_or(MAX_ZOOM, |next| next.min_zoom)
    }

    /// Thin out `vertices` for every tier.
    ///
    /// Tiers are sampled from the closest zoom to the farthest, each one from the survivors of the previous, so a
    /// farther tier never shows more labels than a closer one. Only the closest tier allows labels to overlap.
    pub fn sample(&self, vertices: &[VertexEntry]) -> Vec<TierSample> {
        let mut samples = Vec::with_capacity(self.tiers.len());
        let mut survivors = vertices.to_vec();
        for (index, tier) in self.tiers.iter().enumerate().rev() {
            survivors = sample_grid(&survivors, tier.cell_size);
            samples.push(TierSample {
                tier: tier.clone(),
                max_zoom: self.max_zoom(index),
                allow_overlap: index + 1 == self.tiers.len(),
                vertices: survivors.clone(),
            });
        }
        samples.reverse();
        samples
    }
}

impl Default for TierSet {
    fn default() -> Self {
        // Cell sizes divide each other so every coarse cell is a union of finer cells.
        Self {
            tiers: vec![
                LabelTier {
                    min_zoom: 10.0,
                    cell_size: 0.02,
                    text_size: (8.0, 9.0),
                },
                LabelTier {
                    min_zoom: 13.0,
                    cell_size: 0.005,
                    text_size: (9.0, 10.0),
                },
                LabelTier {
                    min_zoom: 15.0,
                    cell_size: 0.001,
                    text_size: (10.0, 11.0),
                },
                LabelTier {
                    min_zoom: 17.0,
                    cell_size: 0.0001,
                    text_size: (11.0, 14.0),
                },
            ],
        }
    }
}

/// Keep the first vertex of every `cell_size` grid cell, preserving input order.
pub fn sample_grid(vertices: &[VertexEntry], cell_size: f64) -> Vec<VertexEntry> {
    let mut occupied = HashSet::new();
    vertices
        .iter()
        .filter(|entry| {
            let cell = (
                (entry.coordinate.x / cell_size).floor() as i64,
                (entry.coordinate.y / cell_size).floor() as i64,
            );
            occupied.insert(cell)
        })
        .copied()
        .collect()
}
