//! Fixed feature schema for symptom/environment vectors.
//!
//! Field count and order are frozen across train and predict; every model
//! artifact in a bundle was fitted against this exact layout.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TabularError};

/// Canonical feature order. Index-significant.
pub const FEATURE_NAMES: [&str; 8] = [
    "age",
    "temperature",
    "cough_severity",
    "fatigue",
    "body_ache",
    "aqi",
    "humidity",
    "ambient_temperature",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Canonical disease label list. Position in this list is the class index
/// and the deterministic tie-break order for ranked candidates.
pub const DISEASES: [&str; 8] = [
    "Common Cold",
    "Flu",
    "COVID-19",
    "Pneumonia",
    "Bronchitis",
    "Asthma",
    "Allergies",
    "Migraine",
];

pub const CLASS_COUNT: usize = DISEASES.len();

/// A validated, fixed-order feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Validate a raw slice into a feature vector.
    /// Rejects wrong field counts and non-finite values.
    pub fn new(raw: &[f64]) -> Result<Self> {
        if raw.len() != FEATURE_COUNT {
            return Err(TabularError::Validation(format!(
                "expected {} feature fields, got {}",
                FEATURE_COUNT,
                raw.len()
            )));
        }
        for (i, &v) in raw.iter().enumerate() {
            if !v.is_finite() {
                return Err(TabularError::Validation(format!(
                    "feature '{}' is not finite: {}",
                    FEATURE_NAMES[i], v
                )));
            }
        }
        let mut values = [0.0; FEATURE_COUNT];
        values.copy_from_slice(raw);
        Ok(Self { values })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Value of a named field, if the name is part of the schema.
    pub fn value(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|i| self.values[i])
    }
}
