#![deny(missing_docs)]

//! YOLO to mobile conversion and drowsiness state stabilization
//!
//! This crate converts YOLO checkpoints to TFLite through the Ultralytics
//! exporters and turns a stream of per-frame detections into a stable
//! drowsy / alert state.
//!
//! # Examples
//!
//! ```
//! use y2m::{Detection, Label, Stabilizer, StabilizerConfig, StabilizedState};
//!
//! let mut stabilizer = Stabilizer::new(StabilizerConfig::default());
//!
//! let mut reports = Vec::new();
//! for _ in 0..5 {
//!     let frame = vec![
//!         Detection::new(Label::Drowsy, 0.9),
//!         Detection::new(Label::NotDrowsy, 0.4),
//!     ];
//!     if let Some(report) = stabilizer.ingest(frame) {
//!         reports.push(report);
//!     }
//! }
//!
//! assert_eq!(reports.len(), 1);
//! assert_eq!(reports[0].state(), StabilizedState::Drowsy);
//! println!("{}", reports[0]);
//! ```

/// Bounding box of a detection
mod bounding_box;

/// Majority vote over the detection window
mod classifier;

/// Configuration structs
mod config;

/// Checkpoint conversion pipeline
mod convert;

/// Raw detector output decoding
mod decoder;

/// Detections and the best-detection reducer
mod detection;

/// Frame level detectors
mod detector;

/// Error type
mod error;

/// Class labels
mod label;

/// `metadata.json` generation
mod metadata;

/// Report sinks
mod sink;

/// Replayable detection streams
mod source;

/// Detection stream stabilizer
mod stabilizer;

/// Ultralytics command line backend
mod ultralytics;

/// Input file checks and housekeeping
mod validate;

/// Checkpoint resolution
mod weights;

/// Bounded detection history
mod window;

pub use bounding_box::BoundingBox;
pub use classifier::{StabilizedState, WindowSummary, classify};
pub use config::{AppConfig, DetectorConfig, InputSize};
pub use convert::{
    ConvertOptions, ConvertSummary, ExportedModel, ModelExporter, QuantizationParams, Quantizer,
    convert,
};
pub use decoder::{decode_output, preprocess_image};
pub use detection::{Detection, best_detection};
pub use detector::{RawDetector, TensorDetector};
pub use error::Y2mError;
pub use label::{ClassNames, Label};
pub use metadata::{ModelMetadata, Y2M_VERSION};
pub use sink::{JsonSink, LogSink, ReportSink};
pub use source::{
    DetectionSource, JsonLinesSource, LabelDirSource, parse_label_file, parse_label_line,
};
pub use stabilizer::{Report, Stabilizer, StabilizerConfig, Transition, stabilize, transition};
pub use ultralytics::{
    UltralyticsCli, UltralyticsPredictor, parse_metadata_names, saved_model_dir,
};
pub use validate::{cleanup_intermediate_files, create_output_directory, validate_model_path};
pub use weights::{HUB_SCHEME, resolve_weights};
pub use window::{DEFAULT_WINDOW_CAPACITY, HistoryWindow};
