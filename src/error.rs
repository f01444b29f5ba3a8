use std::path::PathBuf;

/// Y2M error enum.
#[derive(thiserror::Error, Debug)]
pub enum Y2mError {
    /// The model file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The model file does not carry the `.pt` extension.
    #[error("Invalid file extension: {extension:?}. Expected .pt")]
    InvalidExtension {
        /// Offending path.
        path: PathBuf,
        /// Extension found on the path, empty when there is none.
        extension: String,
    },

    /// The model file is empty.
    #[error("File is empty: {0}")]
    EmptyFile(PathBuf),

    /// The model file cannot be opened for reading.
    #[error("Cannot read file (permission denied): {0}")]
    PermissionDenied(PathBuf),

    /// An external program or service the pipeline delegates to is missing.
    #[error("Missing dependency: {0}")]
    DependencyMissing(String),

    /// The float32 export failed.
    #[error("TFLite export failed: {0}")]
    ExportFailed(String),

    /// The int8 export failed.
    #[error("Int8 quantization failed: {0}")]
    QuantizationFailed(String),

    /// The external predictor failed on an image.
    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    /// The detector produced a tensor layout that cannot be decoded.
    #[error("Unsupported output shape: {0:?}")]
    UnsupportedOutputShape(Vec<usize>),

    /// Command line arguments that cannot be used together.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A replayed detection stream contains a malformed record.
    #[error("Malformed record at {location}: {reason}")]
    MalformedRecord {
        /// File and line (or file name) of the record.
        location: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Internal candle error.
    #[error(transparent)]
    CandleError(#[from] candle_core::Error),

    /// Kornia image error.
    #[error(transparent)]
    KorniaImageError(#[from] kornia_image::ImageError),

    /// Kornia io error.
    #[error(transparent)]
    KorniaIoError(#[from] kornia_io::error::IoError),

    /// Hugging Face API error.
    #[error(transparent)]
    ApiError(#[from] hf_hub::api::sync::ApiError),

    /// Filesystem or process error.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

impl Y2mError {
    /// Stable error code, as printed by the command line tool.
    pub fn code(&self) -> &'static str {
        match self {
            Y2mError::FileNotFound(_) => "ERR_FILE_NOT_FOUND",
            Y2mError::InvalidExtension { .. } => "ERR_INVALID_EXTENSION",
            Y2mError::EmptyFile(_) => "ERR_FILE_EMPTY",
            Y2mError::PermissionDenied(_) => "ERR_READ_PERMISSION",
            Y2mError::DependencyMissing(_) => "ERR_DEPENDENCY_MISSING",
            Y2mError::ExportFailed(_) => "ERR_EXPORT_FAILED",
            Y2mError::QuantizationFailed(_) => "ERR_QUANTIZATION_FAILED",
            Y2mError::PredictionFailed(_) => "ERR_PREDICTION_FAILED",
            Y2mError::UnsupportedOutputShape(_) => "ERR_OUTPUT_SHAPE",
            Y2mError::InvalidArguments(_) => "ERR_USAGE",
            Y2mError::MalformedRecord { .. } => "ERR_MALFORMED_RECORD",
            Y2mError::CandleError(_) => "ERR_TENSOR",
            Y2mError::KorniaImageError(_) | Y2mError::KorniaIoError(_) => "ERR_IMAGE",
            Y2mError::ApiError(_) => "ERR_HUB",
            Y2mError::IoError(_) => "ERR_IO",
            Y2mError::JsonError(_) => "ERR_JSON",
        }
    }

    /// Process exit code: 1 for validation and input errors, 2 for conversion
    /// errors, 3 for quantization errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            Y2mError::DependencyMissing(_) | Y2mError::ExportFailed(_) => 2,
            Y2mError::QuantizationFailed(_) => 3,
            _ => 1,
        }
    }

    /// Whether the error was raised while validating the input model path.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Y2mError::FileNotFound(_)
                | Y2mError::InvalidExtension { .. }
                | Y2mError::EmptyFile(_)
                | Y2mError::PermissionDenied(_)
        )
    }
}
