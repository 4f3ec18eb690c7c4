//! Medical image analysis: preprocessing, abnormality detection with region
//! extraction, class activation saliency and embedding extraction, all on a
//! small convolutional backbone run through candle.

pub mod backbone;
pub mod detector;
pub mod device;
pub mod error;
pub mod features;
pub mod preprocess;
pub mod saliency;

pub use backbone::{BackboneConfig, ImageBackbone, CONV_STAGES};
pub use detector::AbnormalityDetector;
pub use device::select_device;
pub use error::{Result, VisionError};
pub use features::FeatureExtractor;
pub use preprocess::{enhance_contrast, normalize_intensity, ImagePreprocessor};
pub use saliency::SaliencyExplainer;
