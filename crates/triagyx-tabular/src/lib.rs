//! triagyx-tabular — Symptom/environment disease prediction.
//!
//! A four-member ensemble (logistic regression, bagged trees, boosted trees,
//! shallow feed-forward network) over one standardized 8-field feature
//! space, blended by unweighted mean, with perturbation-based feature
//! attribution and atomic model-bundle persistence.

pub mod attribution;
pub mod boost;
pub mod classifier;
pub mod ensemble;
pub mod error;
pub mod forest;
pub mod linear;
pub mod mlp;
pub mod persist;
pub mod scaler;
pub mod schema;
pub mod synthetic;
pub mod tree;

pub use attribution::{AttributionExplainer, PredictiveModel};
pub use classifier::Classifier;
pub use ensemble::{rank_candidates, SymptomEnsemble, TOP_K};
pub use error::{Result, TabularError};
pub use scaler::StandardScaler;
pub use schema::{FeatureVector, CLASS_COUNT, DISEASES, FEATURE_COUNT, FEATURE_NAMES};
pub use synthetic::{generate, SyntheticDataset};
