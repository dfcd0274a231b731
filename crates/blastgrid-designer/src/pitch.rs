//! Grid pitch estimation
//!
//! Recovers spacing and burden from surveyed drill point positions. Each axis
//! is handled independently: successive gaps between sorted coordinates are
//! collected, sub-jitter gaps are dropped, and the most frequent gap (at 0.1
//! resolution) wins if enough gaps agree on it. Otherwise the median gap is
//! used.

use blastgrid_core::DrillPoint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pitch returned when an axis has no usable gaps.
pub const FALLBACK_PITCH: f64 = 1.0;

/// Estimated lattice pitch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPitch {
    pub spacing: f64,
    pub burden: f64,
}

/// Tuning for [`GridPitchEstimator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimatorConfig {
    /// Gaps below this are measurement jitter
    pub jitter_threshold: f64,
    /// Histogram bucket width
    pub bucket_size: f64,
    /// Minimum share of gaps in the modal bucket
    pub min_support: f64,
}

impl Default for PitchEstimatorConfig {
    fn default() -> Self {
        Self {
            jitter_threshold: 0.5,
            bucket_size: 0.1,
            min_support: 0.10,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GridPitchEstimator {
    config: PitchEstimatorConfig,
}

impl GridPitchEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PitchEstimatorConfig) -> Self {
        Self { config }
    }

    /// Estimate spacing (x axis) and burden (y axis).
    pub fn estimate(&self, points: &[DrillPoint]) -> GridPitch {
        let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
        let pitch = GridPitch {
            spacing: self.estimate_axis(&xs),
            burden: self.estimate_axis(&ys),
        };
        tracing::debug!(
            "Estimated pitch {:.1} x {:.1} from {} points",
            pitch.spacing,
            pitch.burden,
            points.len()
        );
        pitch
    }

    /// Estimate the pitch of a single axis.
    pub fn estimate_axis(&self, coords: &[f64]) -> f64 {
        let mut sorted: Vec<f64> = coords.iter().copied().filter(|c| c.is_finite()).collect();
        if sorted.len() < 2 {
            return FALLBACK_PITCH;
        }
        sorted.sort_by(f64::total_cmp);

        let gaps: Vec<f64> = sorted
            .windows(2)
            .map(|w| ((w[1] - w[0]) * 1000.0).round() / 1000.0)
            .filter(|gap| *gap >= self.config.jitter_threshold)
            .collect();
        if gaps.is_empty() {
            return FALLBACK_PITCH;
        }

        let (bucket, count) = self.modal_bucket(&gaps);
        let support = count as f64 / gaps.len() as f64;
        if support >= self.config.min_support {
            return tidy(bucket as f64 * self.config.bucket_size);
        }

        let mut cleaned = gaps;
        cleaned.sort_by(f64::total_cmp);
        let median = cleaned[cleaned.len() / 2];
        self.round_to_bucket(median)
    }

    /// Most populated bucket; ties go to the bucket seen first.
    fn modal_bucket(&self, gaps: &[f64]) -> (i64, usize) {
        let mut counts: HashMap<i64, usize> = HashMap::new();
        let mut order: Vec<i64> = Vec::new();
        for gap in gaps {
            let bucket = (gap / self.config.bucket_size).round() as i64;
            let count = counts.entry(bucket).or_insert(0);
            if *count == 0 {
                order.push(bucket);
            }
            *count += 1;
        }

        let mut best = (order[0], counts[&order[0]]);
        for bucket in order.iter().skip(1) {
            let count = counts[bucket];
            if count > best.1 {
                best = (*bucket, count);
            }
        }
        best
    }

    fn round_to_bucket(&self, value: f64) -> f64 {
        tidy((value / self.config.bucket_size).round() * self.config.bucket_size)
    }
}

/// Strip float noise left by bucket multiplication (3.0000000000000004 -> 3.0).
fn tidy(value: f64) -> f64 {
    (value * 1e9).round() / 1e9
}
