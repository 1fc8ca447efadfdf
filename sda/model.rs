use crate::shrink::ShrinkageIntensity;
use ndarray::{Array1, Array2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// The shrinkage intensities actually applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Regularization {
    pub lambda_cor: ShrinkageIntensity,
    pub lambda_var: ShrinkageIntensity,
    pub lambda_freqs: ShrinkageIntensity,
}

/// A trained shrinkage discriminant analysis model.
///
/// Class `k` scores a sample `x` as `intercept[k] + coefficients.row(k) . x`;
/// the posterior is the softmax of the scores. This is the artifact that gets
/// saved to and loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdaModel<L> {
    /// Class labels in the order of `intercept` and of the rows of
    /// `coefficients`.
    pub labels: Vec<L>,
    /// The correlation adjustment was skipped, by request or because the
    /// decomposition failed.
    pub was_diagonal: bool,
    /// Shrunk class frequencies used as priors.
    pub freqs: Array1<f64>,
    /// Length `K`.
    pub intercept: Array1<f64>,
    /// `K x p`.
    pub coefficients: Array2<f64>,
    pub regularization: Regularization,
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read or write model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML model file: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize model to TOML format: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Inconsistent model: {what} has length {found}, but the model has {expected} classes.")]
    Inconsistent {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}

impl<L> SdaModel<L> {
    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn num_features(&self) -> usize {
        self.coefficients.ncols()
    }

    /// Checks that the per-class tables all have one entry per label.
    pub fn check_consistency(&self) -> Result<(), ModelError> {
        let expected = self.num_classes();
        for (what, found) in [
            ("intercept", self.intercept.len()),
            ("coefficients (rows)", self.coefficients.nrows()),
            ("freqs", self.freqs.len()),
        ] {
            if found != expected {
                return Err(ModelError::Inconsistent {
                    what,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

impl<L: Serialize + DeserializeOwned> SdaModel<L> {
    /// Saves the model to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Loads a model written by [`SdaModel::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let toml_string = fs::read_to_string(path)?;
        let model: Self = toml::from_str(&toml_string)?;
        model.check_consistency()?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn model() -> SdaModel<String> {
        SdaModel {
            labels: vec!["control".to_string(), "case".to_string()],
            freqs: array![0.6, 0.4],
            intercept: array![-0.25, 0.125],
            coefficients: array![[0.5, -1.5, 2.0], [-0.5, 1.5, -2.0]],
            regularization: Regularization {
                lambda_cor: ShrinkageIntensity::estimated(0.3125),
                lambda_var: ShrinkageIntensity::specified(0.0),
                lambda_freqs: ShrinkageIntensity::estimated(1.0),
            },
            was_diagonal: false,
        }
    }

    #[test]
    fn model_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.toml");
        let original = model();
        original.save(&path).unwrap();
        let loaded = SdaModel::<String>::load(&path).unwrap();
        assert_eq!(loaded, original);
        assert_eq!(loaded.num_classes(), 2);
        assert_eq!(loaded.num_features(), 3);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "labels = [\"a\", \"b\"]\nintercept = 3\n").unwrap();
        assert!(matches!(
            SdaModel::<String>::load(&path),
            Err(ModelError::TomlParse(_))
        ));
    }

    #[test]
    fn tampered_model_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tampered.toml");
        let mut tampered = model();
        tampered.intercept = array![0.0, 0.0, 0.0];
        tampered.save(&path).unwrap();

        match SdaModel::<String>::load(&path) {
            Err(ModelError::Inconsistent {
                what,
                expected,
                found,
            }) => {
                assert_eq!(what, "intercept");
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("Expected Inconsistent, got {other:?}"),
        }
    }

    #[test]
    fn missing_label_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one_label.toml");
        let mut tampered = model();
        tampered.labels.pop();
        tampered.save(&path).unwrap();
        assert!(matches!(
            SdaModel::<String>::load(&path),
            Err(ModelError::Inconsistent { expected: 1, found: 2, .. })
        ));
    }
}
