//! Scorer configuration and builder.
//!
//! `ItemItemConfig` holds the knobs that are fixed for the lifetime of a
//! scorer. It can be exchanged as a typed key/value map (`ConfigValue`) or
//! persisted as JSON. `ItemItemScorerBuilder` turns a config plus the two data
//! collaborators (rating source, model) into an `ItemItemScorer`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{ScoringError, ScoringResult};
use crate::model::ItemItemModel;
use crate::neighborhood::{NeighborhoodScorer, ScorerKind};
use crate::normalize::{NormalizerKind, UserVectorNormalizer};
use crate::scorer::ItemItemScorer;
use crate::source::RatingVectorSource;

pub const DEFAULT_NEIGHBORHOOD_SIZE: i32 = 20;
pub const DEFAULT_MIN_NEIGHBORS: usize = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemItemConfig {
    /// Maximum neighbors per scored item, `<= 0` for no limit.
    pub neighborhood_size: i32,
    /// Items with fewer usable neighbors are not scored.
    pub min_neighbors: usize,
    pub scorer: ScorerKind,
    pub normalizer: NormalizerKind,
}

impl Default for ItemItemConfig {
    fn default() -> Self {
        Self {
            neighborhood_size: DEFAULT_NEIGHBORHOOD_SIZE,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            scorer: ScorerKind::default(),
            normalizer: NormalizerKind::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConfigValue {
    Usize(usize),
    I32(i32),
    F64(f64),
    String(String),
}

impl ConfigValue {
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ConfigValue::Usize(v) => Some(*v),
            ConfigValue::I32(v) => usize::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            ConfigValue::I32(v) => Some(*v),
            ConfigValue::Usize(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

fn invalid(key: &str, value: &ConfigValue) -> ScoringError {
    ScoringError::Config(format!("invalid value for '{}': {:?}", key, value))
}

impl ItemItemConfig {
    pub fn config_typed(&self) -> HashMap<String, ConfigValue> {
        let mut config = HashMap::new();

        config.insert(
            "neighborhood_size".to_string(),
            ConfigValue::I32(self.neighborhood_size),
        );
        config.insert(
            "min_neighbors".to_string(),
            ConfigValue::Usize(self.min_neighbors),
        );
        config.insert(
            "scorer".to_string(),
            ConfigValue::String(self.scorer.as_str().to_string()),
        );
        config.insert(
            "normalizer".to_string(),
            ConfigValue::String(self.normalizer.as_str().to_string()),
        );
        if let NormalizerKind::MeanVariance { damping } = self.normalizer {
            config.insert("damping".to_string(), ConfigValue::F64(damping));
        }

        config
    }

    /// Rebuild from a typed map. Missing keys take their defaults.
    pub fn from_config(config: &HashMap<String, ConfigValue>) -> ScoringResult<Self> {
        let mut out = Self::default();

        if let Some(v) = config.get("neighborhood_size") {
            out.neighborhood_size = v
                .as_i32()
                .ok_or_else(|| invalid("neighborhood_size", v))?;
        }
        if let Some(v) = config.get("min_neighbors") {
            out.min_neighbors = v
                .as_usize()
                .ok_or_else(|| invalid("min_neighbors", v))?;
        }
        if let Some(v) = config.get("scorer") {
            out.scorer = v
                .as_str()
                .and_then(|s| ScorerKind::from_str(s).ok())
                .ok_or_else(|| invalid("scorer", v))?;
        }
        if let Some(v) = config.get("normalizer") {
            out.normalizer = v
                .as_str()
                .and_then(|s| NormalizerKind::from_str(s).ok())
                .ok_or_else(|| invalid("normalizer", v))?;
        }
        if let NormalizerKind::MeanVariance { ref mut damping } = out.normalizer {
            if let Some(v) = config.get("damping") {
                *damping = v.as_f64().ok_or_else(|| invalid("damping", v))?;
            }
        }

        debug!("config from typed map: {:?}", out);
        Ok(out)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> ScoringResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        info!("Saved scorer config to {:?}", path.as_ref());
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> ScoringResult<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        let config: ItemItemConfig = serde_json::from_str(&json)?;
        info!("Loaded scorer config from {:?}", path.as_ref());
        Ok(config)
    }
}

/// Builder for [`ItemItemScorer`].
///
/// ```
/// use std::sync::Arc;
/// use itemknn::builder::ItemItemScorerBuilder;
/// use itemknn::model::SimilarityMatrixModel;
/// use itemknn::neighborhood::ScorerKind;
/// use itemknn::normalize::NormalizerKind;
/// use itemknn::source::InMemoryRatingSource;
///
/// let scorer = ItemItemScorerBuilder::new()
///     .with_neighborhood_size(30)
///     .with_min_neighbors(2)
///     .with_scorer(ScorerKind::WeightedAverage)
///     .with_normalizer(NormalizerKind::MeanCentering)
///     .build(
///         Arc::new(InMemoryRatingSource::new()),
///         Arc::new(SimilarityMatrixModel::from_triplets(Vec::new())),
///     );
/// assert_eq!(scorer.neighborhood_size(), 30);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ItemItemScorerBuilder {
    config: ItemItemConfig,
    custom_scorer: Option<Arc<dyn NeighborhoodScorer>>,
    custom_normalizer: Option<Arc<dyn UserVectorNormalizer>>,
}

impl ItemItemScorerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: ItemItemConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &ItemItemConfig {
        &self.config
    }

    /// `<= 0` disables the limit.
    pub fn with_neighborhood_size(mut self, size: i32) -> Self {
        self.config.neighborhood_size = size;
        self
    }

    pub fn with_min_neighbors(mut self, min: usize) -> Self {
        self.config.min_neighbors = min;
        self
    }

    pub fn with_scorer(mut self, kind: ScorerKind) -> Self {
        self.config.scorer = kind;
        self
    }

    pub fn with_normalizer(mut self, kind: NormalizerKind) -> Self {
        self.config.normalizer = kind;
        self
    }

    /// Use a scorer not covered by [`ScorerKind`]; overrides `with_scorer`.
    pub fn with_custom_scorer(mut self, scorer: Arc<dyn NeighborhoodScorer>) -> Self {
        self.custom_scorer = Some(scorer);
        self
    }

    /// Use a normalizer not covered by [`NormalizerKind`]; overrides
    /// `with_normalizer`.
    pub fn with_custom_normalizer(mut self, normalizer: Arc<dyn UserVectorNormalizer>) -> Self {
        self.custom_normalizer = Some(normalizer);
        self
    }

    pub fn build(
        self,
        source: Arc<dyn RatingVectorSource>,
        model: Arc<dyn ItemItemModel>,
    ) -> ItemItemScorer {
        let scorer = self
            .custom_scorer
            .unwrap_or_else(|| Arc::from(self.config.scorer.build()));
        let normalizer = self
            .custom_normalizer
            .unwrap_or_else(|| Arc::from(self.config.normalizer.build()));

        ItemItemScorer::new(
            source,
            model,
            scorer,
            normalizer,
            self.config.neighborhood_size,
            self.config.min_neighbors,
        )
    }
}
