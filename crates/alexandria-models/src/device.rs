//! Compute device selection for model inference.

use alexandria_config::DevicePreference;
use std::fmt;
use tracing::{info, warn};

/// Where model inference runs for the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    Accelerator,
    Cpu,
}

impl ComputeDevice {
    /// Resolve a preference once, at process start.
    pub fn resolve(preference: DevicePreference) -> Self {
        let detected = accelerator_present();
        let device = Self::choose(preference, detected);

        if preference == DevicePreference::Gpu && !detected {
            warn!("GPU requested but no accelerator detected; Ollama will fall back as it sees fit");
        }
        info!("Using compute device: {}", device);
        device
    }

    fn choose(preference: DevicePreference, accelerator_present: bool) -> Self {
        match preference {
            DevicePreference::Cpu => ComputeDevice::Cpu,
            DevicePreference::Gpu => ComputeDevice::Accelerator,
            DevicePreference::Auto if accelerator_present => ComputeDevice::Accelerator,
            DevicePreference::Auto => ComputeDevice::Cpu,
        }
    }

    /// The `num_gpu` option to send with every request, if any.
    pub fn num_gpu(&self) -> Option<i32> {
        match self {
            ComputeDevice::Accelerator => None,
            ComputeDevice::Cpu => Some(0),
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeDevice::Accelerator => write!(f, "accelerator"),
            ComputeDevice::Cpu => write!(f, "cpu"),
        }
    }
}

fn accelerator_present() -> bool {
    cfg!(all(target_os = "macos", target_arch = "aarch64")) || which::which("nvidia-smi").is_ok()
}
