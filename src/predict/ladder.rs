//! The fusion decision table.
//!
//! Given which model outputs are available, pick exactly one way of producing the final
//! magnitude. Rows are checked in priority order:
//!
//! | point | sequence | fusion head | result                         | confidence |
//! |-------|----------|-------------|--------------------------------|------------|
//! | yes   | yes      | yes         | head(`[point, sequence]`)      | 0.8        |
//! | yes   | any      | any         | point                          | 0.7        |
//! | no    | yes      | any         | sequence                       | 0.65       |
//! | no    | no       | any         | 0.0                            | 0.0        |
//!
//! Note the second row: with both predictions but no head, the point prediction wins.

use crate::models::FusionHead;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionBranch {
    Fused,
    PointOnly,
    SequenceOnly,
    Degraded,
}

impl FusionBranch {
    /// Fixed confidence label for the branch.
    pub fn confidence(self) -> f64 {
        match self {
            FusionBranch::Fused => 0.8,
            FusionBranch::PointOnly => 0.7,
            FusionBranch::SequenceOnly => 0.65,
            FusionBranch::Degraded => 0.0,
        }
    }

    /// Inverse of [`FusionBranch::confidence`]; unknown labels map to `Degraded`.
    pub fn from_confidence(confidence: f64) -> Self {
        [FusionBranch::Fused, FusionBranch::PointOnly, FusionBranch::SequenceOnly]
            .into_iter()
            .find(|b| b.confidence() == confidence)
            .unwrap_or(FusionBranch::Degraded)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FusionBranch::Fused => "fused",
            FusionBranch::PointOnly => "point-only",
            FusionBranch::SequenceOnly => "sequence-only",
            FusionBranch::Degraded => "degraded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionOutcome {
    pub branch: FusionBranch,
    pub magnitude: f64,
}

impl FusionOutcome {
    pub fn confidence(&self) -> f64 {
        self.branch.confidence()
    }
}

/// Apply the decision table. Pure: no I/O and no model loading.
pub fn fuse(point: Option<f64>, sequence: Option<f64>, head: Option<&FusionHead>) -> FusionOutcome {
    let (branch, magnitude) = match (point, sequence, head) {
        (Some(p), Some(s), Some(head)) => (FusionBranch::Fused, head.predict(p, s)),
        (Some(p), _, _) => (FusionBranch::PointOnly, p),
        (None, Some(s), _) => (FusionBranch::SequenceOnly, s),
        (None, None, _) => (FusionBranch::Degraded, 0.0),
    };
    FusionOutcome { branch, magnitude }
}
