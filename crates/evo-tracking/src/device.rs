//! Compute devices handed to the evaluator (`--device`).

use evo_types::{ConfigError, EvoResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A compute device the evaluator may run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    Cuda(u32),
    Cpu,
    Mps,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda(i) => write!(f, "{i}"),
            Device::Cpu => f.write_str("cpu"),
            Device::Mps => f.write_str("mps"),
        }
    }
}

/// Parse a device list such as `""`, `"cpu"`, `"0"` or `"0,1,2,3"`.
///
/// An empty string means "let the evaluator choose" and yields an empty list.
pub fn parse_devices(spec: &str) -> EvoResult<Vec<Device>> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Ok(Vec::new());
    }

    let invalid = || ConfigError::InvalidDevice {
        spec: spec.to_string(),
    };
    let mut devices = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        let device = match part.to_ascii_lowercase().as_str() {
            "cpu" => Device::Cpu,
            "mps" => Device::Mps,
            other => Device::Cuda(other.parse().map_err(|_| invalid())?),
        };
        if devices.contains(&device) {
            return Err(invalid().into());
        }
        devices.push(device);
    }
    Ok(devices)
}

/// Render a device list back into the `0,1,2` form.
pub fn format_devices(devices: &[Device]) -> String {
    devices
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gpu_lists() {
        assert_eq!(
            parse_devices("0,1, 2,3").unwrap(),
            vec![Device::Cuda(0), Device::Cuda(1), Device::Cuda(2), Device::Cuda(3)]
        );
        assert_eq!(parse_devices("CPU").unwrap(), vec![Device::Cpu]);
        assert!(parse_devices("").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_lists() {
        for spec in ["0,,1", "gpu0", "-1", "0,0"] {
            assert!(parse_devices(spec).is_err(), "{spec} should be rejected");
        }
    }

    #[test]
    fn formats_back() {
        let devices = parse_devices("0,1").unwrap();
        assert_eq!(format_devices(&devices), "0,1");
    }
}
