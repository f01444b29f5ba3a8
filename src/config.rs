use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ClassNames, StabilizerConfig, Y2mError};

/// Fixed model input size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSize {
    /// Input height in pixels.
    pub height: usize,
    /// Input width in pixels.
    pub width: usize,
}

impl Default for InputSize {
    fn default() -> Self {
        Self {
            height: 640,
            width: 640,
        }
    }
}

impl std::fmt::Display for InputSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.height, self.width)
    }
}

/// Detector configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Detections scoring at or below this value are dropped.
    pub confidence_threshold: f32,
    /// Model input size.
    pub input_size: InputSize,
    /// Class names in model order.
    pub class_names: ClassNames,
}

/// Default configuration for the detector.
impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            input_size: InputSize::default(),
            class_names: ClassNames::default(),
        }
    }
}

/// Top-level configuration, as read from a JSON file.
///
/// ```json
/// {
///   "stabilizer": { "window_capacity": 5, "evaluation_interval": 5, "heartbeat_interval": 30 },
///   "detector": { "confidence_threshold": 0.25, "class_names": ["drowsy", "notdrowsy"] }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Stabilizer settings.
    pub stabilizer: StabilizerConfig,
    /// Detector settings.
    pub detector: DetectorConfig,
}

impl AppConfig {
    /// Read a configuration file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Y2mError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Y2mError::FileNotFound(path.to_path_buf()));
        }
        let config = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        tracing::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }
}
