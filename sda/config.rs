use crate::shrink::Intensity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// The three shrinkage intensities. Each is estimated from the data unless
/// fixed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShrinkageConfig {
    pub lambda_cor: Intensity,
    pub lambda_var: Intensity,
    pub lambda_freqs: Intensity,
}

/// How per-class CAT scores are combined into one importance score per feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingScore {
    /// Squared CAT scores weighted by `1 - freq`.
    #[default]
    Entropy,
    /// Mean of the squared CAT scores.
    Avg,
    /// Largest squared CAT score.
    Max,
}

impl FromStr for RankingScore {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "entropy" => Ok(RankingScore::Entropy),
            "avg" => Ok(RankingScore::Avg),
            "max" => Ok(RankingScore::Max),
            other => Err(ConfigError::UnknownRankingScore(other.to_string())),
        }
    }
}

impl fmt::Display for RankingScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RankingScore::Entropy => "entropy",
            RankingScore::Avg => "avg",
            RankingScore::Max => "max",
        };
        f.write_str(name)
    }
}

/// Options shared by training, CAT scores and ranking.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// diagonal = false
/// ranking_score = "max"
///
/// [shrinkage]
/// lambda_cor = { fixed = 0.2 }
/// lambda_var = "auto"
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdaConfig {
    pub shrinkage: ShrinkageConfig,
    /// Skip the correlation adjustment and treat features as uncorrelated.
    pub diagonal: bool,
    pub ranking_score: RankingScore,
    /// Raises progress messages from `Debug` to `Info`.
    pub verbose: bool,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Unknown ranking score '{0}'; expected one of 'entropy', 'avg' or 'max'.")]
    UnknownRankingScore(String),
}

impl SdaConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Log level for progress messages.
    pub fn progress_level(&self) -> log::Level {
        progress_level(self.verbose)
    }
}

/// `Info` when verbose, `Debug` otherwise.
pub(crate) fn progress_level(verbose: bool) -> log::Level {
    if verbose {
        log::Level::Info
    } else {
        log::Level::Debug
    }
}
