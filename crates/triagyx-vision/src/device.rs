//! Device selection for the vision backbone.
//!
//! Resolved once at model-load time. Device choice affects latency only;
//! analysis results are numerically equivalent on any device.

use candle_core::Device;
#[cfg(any(feature = "cuda", feature = "metal"))]
use tracing::{debug, info};

/// Select the best available device, falling back to CPU.
pub fn select_device(use_gpu: bool) -> Device {
    if !use_gpu {
        return Device::Cpu;
    }

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("CUDA device available");
                return device;
            }
            Err(e) => {
                debug!("CUDA not available: {}, falling back to CPU", e);
            }
        }
    }

    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Metal device available");
                return device;
            }
            Err(e) => {
                debug!("Metal not available: {}, falling back to CPU", e);
            }
        }
    }

    Device::Cpu
}
