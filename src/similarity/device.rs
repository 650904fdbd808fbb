use std::fmt;
use std::str::FromStr;

use candle_core::Device;
use tracing::{debug, info, warn};

/// Where CLIP inference should run.
///
/// `Auto` tries each compiled GPU backend in order and settles on the CPU.
/// `Cpu` skips the probe entirely, which keeps scores reproducible across
/// hosts with and without accelerators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DevicePreference {
    #[default]
    Auto,
    Cpu,
}

impl DevicePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            DevicePreference::Auto => "auto",
            DevicePreference::Cpu => "cpu",
        }
    }
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "gpu" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            other => Err(format!("expected 'auto' or 'cpu', got '{other}'")),
        }
    }
}

type DeviceCtor = fn(usize) -> candle_core::Result<Device>;

/// GPU backends in probe order, with whether each was compiled in.
const GPU_BACKENDS: [(&str, bool, DeviceCtor); 2] = [
    ("metal", cfg!(feature = "metal"), Device::new_metal),
    ("cuda", cfg!(feature = "cuda"), Device::new_cuda),
];

/// Picks the device for the CLIP model. Never fails; the CPU is always available.
pub fn select_device(preference: DevicePreference) -> Device {
    if preference == DevicePreference::Cpu {
        debug!("Similarity model pinned to CPU");
        return Device::Cpu;
    }

    let mut failures = Vec::new();
    for (name, _, ctor) in GPU_BACKENDS.iter().filter(|(_, compiled, _)| *compiled) {
        match ctor(0) {
            Ok(device) => {
                info!(backend = name, "Running similarity model on GPU");
                return device;
            }
            Err(e) => {
                warn!(backend = name, error = %e, "GPU backend unavailable");
                failures.push(format!("{name}: {e}"));
            }
        }
    }

    if failures.is_empty() {
        debug!("No GPU backend compiled, using CPU for similarity model");
    } else {
        warn!(reason = %failures.join("; "), "Falling back to CPU for similarity model");
    }
    Device::Cpu
}
