//! Confidence → ordinal severity bucketing.
//!
//! Shared by the tabular and imaging pipelines. Both use the same threshold
//! ladder; the imaging pipeline collapses the two lowest buckets into "Low".
//! Every boundary is a strict `>`: a confidence of exactly 0.8 is High, not
//! Critical, and exactly 0.2 is Minimal, not Low.

use serde::{Deserialize, Serialize};

/// Ordinal severity bucket for a diagnostic candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Minimal,
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    /// Map a confidence/probability scalar to a bucket.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.8 {
            Severity::Critical
        } else if confidence > 0.6 {
            Severity::High
        } else if confidence > 0.4 {
            Severity::Moderate
        } else if confidence > 0.2 {
            Severity::Low
        } else {
            Severity::Minimal
        }
    }

    /// Numeric level, 1 (Minimal) through 5 (Critical).
    pub fn level(&self) -> u8 {
        match self {
            Severity::Minimal => 1,
            Severity::Low => 2,
            Severity::Moderate => 3,
            Severity::High => 4,
            Severity::Critical => 5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Minimal => "Minimal",
            Severity::Low => "Low",
            Severity::Moderate => "Moderate",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

/// Imaging severity label. Four levels, same boundaries as [`Severity`];
/// everything at or below 0.4 is "Low".
pub fn imaging_severity_label(probability: f64) -> &'static str {
    if probability > 0.8 {
        "Critical"
    } else if probability > 0.6 {
        "High"
    } else if probability > 0.4 {
        "Moderate"
    } else {
        "Low"
    }
}
