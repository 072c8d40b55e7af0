//! Per-user normalization.
//!
//! A `UserVectorNormalizer` looks at one user's ratings and returns a
//! `VectorTransformation` bound to them. The scorer applies the transformation
//! to a working copy of the ratings before aggregating neighbors, and undoes it
//! on the predicted scores afterwards, so `apply` and `unapply` must be exact
//! inverses of each other.
//!
//! Shipped normalizers:
//! - `IdentityVectorNormalizer`: leaves ratings as they are
//! - `MeanCenteringVectorNormalizer`: subtracts the user's mean rating
//! - `MeanVarianceNormalizer`: z-scores the user's ratings

use std::fmt;
use std::str::FromStr;

use itemknn_core::{MutableSparseVector, SparseVector};
use log::trace;
use serde::{Deserialize, Serialize};

/// Reversible transform bound to one user.
pub trait VectorTransformation: Send + Sync + fmt::Debug {
    /// Transform the values of `vector` in place.
    fn apply(&self, vector: &mut MutableSparseVector);

    /// Reverse a single transformed value for `item`.
    fn unapply_score(&self, item: i64, score: f64) -> f64;

    /// Reverse `apply` on `vector`, in place.
    fn unapply(&self, vector: &mut MutableSparseVector) {
        vector.map_values(|item, v| self.unapply_score(item, v));
    }
}

/// Produces the transformation for a user from their rating summary.
pub trait UserVectorNormalizer: Send + Sync + fmt::Debug {
    fn make_transformation(&self, user: i64, summary: &SparseVector)
        -> Box<dyn VectorTransformation>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdentityVectorNormalizer;

#[derive(Clone, Copy, Debug)]
pub struct IdentityTransformation;

impl VectorTransformation for IdentityTransformation {
    fn apply(&self, _vector: &mut MutableSparseVector) {}

    fn unapply_score(&self, _item: i64, score: f64) -> f64 {
        score
    }

    fn unapply(&self, _vector: &mut MutableSparseVector) {}
}

impl UserVectorNormalizer for IdentityVectorNormalizer {
    fn make_transformation(
        &self,
        _user: i64,
        _summary: &SparseVector,
    ) -> Box<dyn VectorTransformation> {
        Box::new(IdentityTransformation)
    }
}

/// Subtracts the user's mean rating. A user without ratings gets offset 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeanCenteringVectorNormalizer;

/// Shift-and-scale transformation: `apply` maps `x` to `(x - offset) / scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineTransformation {
    pub offset: f64,
    pub scale: f64,
}

impl VectorTransformation for AffineTransformation {
    fn apply(&self, vector: &mut MutableSparseVector) {
        let (offset, scale) = (self.offset, self.scale);
        vector.map_values(|_, v| (v - offset) / scale);
    }

    fn unapply_score(&self, _item: i64, score: f64) -> f64 {
        score * self.scale + self.offset
    }
}

impl UserVectorNormalizer for MeanCenteringVectorNormalizer {
    fn make_transformation(
        &self,
        user: i64,
        summary: &SparseVector,
    ) -> Box<dyn VectorTransformation> {
        let offset = summary.mean().unwrap_or(0.0);
        trace!("user {} mean rating {:.4}", user, offset);
        Box::new(AffineTransformation { offset, scale: 1.0 })
    }
}

/// Centers on the user's mean and divides by their rating standard deviation.
///
/// `damping` adds that many pseudo-observations of unit variance, pulling
/// users with few ratings towards a scale of 1. When the resulting deviation
/// is zero or below `min_std_dev` the ratings are only centered.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeanVarianceNormalizer {
    pub damping: f64,
    pub min_std_dev: f64,
}

impl Default for MeanVarianceNormalizer {
    fn default() -> Self {
        Self {
            damping: 0.0,
            min_std_dev: 1e-6,
        }
    }
}

impl MeanVarianceNormalizer {
    pub fn new(damping: f64) -> Self {
        Self {
            damping,
            ..Default::default()
        }
    }
}

impl UserVectorNormalizer for MeanVarianceNormalizer {
    fn make_transformation(
        &self,
        user: i64,
        summary: &SparseVector,
    ) -> Box<dyn VectorTransformation> {
        let Some(mean) = summary.mean() else {
            return Box::new(AffineTransformation {
                offset: 0.0,
                scale: 1.0,
            });
        };

        let sq_dev: f64 = summary.values().iter().map(|v| (v - mean).powi(2)).sum();
        let n = summary.len() as f64;
        let std_dev = ((sq_dev + self.damping) / (n + self.damping)).sqrt();
        let scale = if std_dev.is_finite() && std_dev > 0.0 && std_dev >= self.min_std_dev {
            std_dev
        } else {
            1.0
        };
        trace!("user {} mean {:.4} scale {:.4}", user, mean, scale);

        Box::new(AffineTransformation {
            offset: mean,
            scale,
        })
    }
}

/// Normalizer selection for configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizerKind {
    #[default]
    Identity,
    MeanCentering,
    MeanVariance { damping: f64 },
}

// damping compared with relative tolerance
impl PartialEq for NormalizerKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NormalizerKind::Identity, NormalizerKind::Identity) => true,
            (NormalizerKind::MeanCentering, NormalizerKind::MeanCentering) => true,
            (
                NormalizerKind::MeanVariance { damping: a },
                NormalizerKind::MeanVariance { damping: b },
            ) => approx::relative_eq!(*a, *b),
            _ => false,
        }
    }
}

impl NormalizerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizerKind::Identity => "identity",
            NormalizerKind::MeanCentering => "mean_centering",
            NormalizerKind::MeanVariance { .. } => "mean_variance",
        }
    }

    pub fn build(&self) -> Box<dyn UserVectorNormalizer> {
        match *self {
            NormalizerKind::Identity => Box::new(IdentityVectorNormalizer),
            NormalizerKind::MeanCentering => Box::new(MeanCenteringVectorNormalizer),
            NormalizerKind::MeanVariance { damping } => {
                Box::new(MeanVarianceNormalizer::new(damping))
            }
        }
    }
}

impl FromStr for NormalizerKind {
    type Err = ();

    /// Parses the name only; `mean_variance` gets no damping.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" => Ok(NormalizerKind::Identity),
            "mean_centering" => Ok(NormalizerKind::MeanCentering),
            "mean_variance" => Ok(NormalizerKind::MeanVariance { damping: 0.0 }),
            _ => Err(()),
        }
    }
}
