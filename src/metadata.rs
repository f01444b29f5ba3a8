use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::{ClassNames, InputSize, Y2mError};

/// Version written into `metadata.json`.
pub const Y2M_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Contents of the `metadata.json` shipped next to the converted models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// File name of the source checkpoint.
    pub model_name: String,
    /// UTC time of the conversion, ISO-8601.
    pub conversion_date: String,
    /// `[height, width]`.
    pub input_size: [usize; 2],
    /// Tensor layout of the exported models.
    pub input_format: String,
    /// Whether an int8 model was produced.
    pub quantized: bool,
    /// File name per precision (`float32`, `int8`).
    pub output_files: BTreeMap<String, String>,
    /// Converter version.
    pub y2m_version: String,
    /// Class names in model order, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_names: Option<ClassNames>,
    /// Number of classes, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_classes: Option<usize>,
}

impl ModelMetadata {
    /// Describe a conversion of `model_name` made now.
    pub fn new(
        model_name: &str,
        input_size: InputSize,
        quantized: bool,
        class_names: Option<&ClassNames>,
    ) -> Self {
        let stem = Path::new(model_name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| model_name.to_string());

        let mut output_files = BTreeMap::new();
        output_files.insert("float32".to_string(), format!("{stem}_float32.tflite"));
        if quantized {
            output_files.insert("int8".to_string(), format!("{stem}_int8.tflite"));
        }

        let class_names = class_names.filter(|names| !names.is_empty()).cloned();

        Self {
            model_name: model_name.to_string(),
            conversion_date: iso8601_utc(OffsetDateTime::now_utc()),
            input_size: [input_size.height, input_size.width],
            input_format: "NHWC".to_string(),
            quantized,
            output_files,
            y2m_version: Y2M_VERSION.to_string(),
            num_classes: class_names.as_ref().map(ClassNames::len),
            class_names,
        }
    }

    /// Write `metadata.json` into `output_dir`.
    pub fn write(&self, output_dir: impl AsRef<Path>) -> Result<PathBuf, Y2mError> {
        let path = output_dir.as_ref().join("metadata.json");
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        tracing::info!("[OK] Metadata saved: {}", path.display());
        Ok(path)
    }
}

/// ISO-8601 (RFC 3339) form of a UTC time.
fn iso8601_utc(time: OffsetDateTime) -> String {
    match time.format(&Rfc3339) {
        Ok(ts) => ts,
        Err(e) => {
            tracing::debug!("Timestamp format failed: {e}");
            String::from("1970-01-01T00:00:00Z")
        }
    }
}
