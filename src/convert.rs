use std::path::{Path, PathBuf};

use crate::{
    ClassNames, InputSize, ModelMetadata, Y2mError,
    validate::{cleanup_intermediate_files, create_output_directory, size_mb, validate_model_path},
};

/// Model exported by a [`ModelExporter`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedModel {
    /// Where the exporter wrote the float32 model.
    pub path: PathBuf,
    /// Class names embedded in the model, when the exporter exposes them.
    pub class_names: Option<ClassNames>,
}

/// Exports a checkpoint to a float32 mobile model.
pub trait ModelExporter {
    /// Export `weights` with a fixed input size.
    fn export(&self, weights: &Path, input_size: InputSize) -> Result<ExportedModel, Y2mError>;
}

/// Calibration parameters for int8 quantization.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizationParams {
    /// Fixed input size of the quantized model.
    pub input_size: InputSize,
    /// Dataset description used for calibration, the framework default when `None`.
    pub calibration_data: Option<PathBuf>,
    /// Fraction of the calibration dataset to use, in `(0, 1]`.
    pub calibration_fraction: f32,
}

/// Produces a reduced precision model from a checkpoint.
pub trait Quantizer {
    /// Quantize `weights` to int8.
    fn quantize(&self, weights: &Path, params: &QuantizationParams) -> Result<PathBuf, Y2mError>;
}

/// Options of a conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Source `.pt` checkpoint.
    pub weights: PathBuf,
    /// Directory receiving the converted models.
    pub output_dir: PathBuf,
    /// Fixed model input size.
    pub input_size: InputSize,
    /// Also produce an int8 model.
    pub quantize: bool,
    /// Calibration dataset for int8.
    pub calibration_data: Option<PathBuf>,
    /// Fraction of the calibration dataset to use.
    pub calibration_fraction: f32,
    /// Remove intermediate `.onnx` files afterwards.
    pub cleanup: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            weights: PathBuf::from("best.pt"),
            output_dir: PathBuf::from("./converted_models"),
            input_size: InputSize::default(),
            quantize: false,
            calibration_data: None,
            calibration_fraction: 1.0,
            cleanup: false,
        }
    }
}

/// Files produced by a conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertSummary {
    /// Output directory.
    pub output_dir: PathBuf,
    /// Float32 model.
    pub float32: PathBuf,
    /// Int8 model, when quantization was requested and succeeded.
    pub int8: Option<PathBuf>,
    /// `metadata.json`.
    pub metadata: PathBuf,
    /// Number of intermediate files removed.
    pub cleaned: usize,
}

fn checkpoint_stem(weights: &Path) -> String {
    weights
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}

fn copy_artifact(source: &Path, dest: &Path) -> Result<(), Y2mError> {
    if source != dest {
        std::fs::copy(source, dest)?;
    }
    Ok(())
}

/// Convert a checkpoint to mobile models.
///
/// Validation and export errors abort the run. A failed quantization is
/// logged and the run continues with the float32 model only.
pub fn convert(
    options: &ConvertOptions,
    exporter: &dyn ModelExporter,
    quantizer: &dyn Quantizer,
) -> Result<ConvertSummary, Y2mError> {
    let weights = options.weights.as_path();
    let stem = checkpoint_stem(weights);

    tracing::info!("Step 1/4: Validating input...");
    validate_model_path(weights)?;

    tracing::info!("Step 2/4: Setting up output directory...");
    let output_dir = create_output_directory(&options.output_dir)?;

    tracing::info!("Step 3/4: Converting model...");
    tracing::info!("Converting to TFLite (size={})...", options.input_size);
    let exported = exporter.export(weights, options.input_size)?;
    let float32 = output_dir.join(format!("{stem}_float32.tflite"));
    copy_artifact(&exported.path, &float32)?;
    tracing::info!(
        "[OK] TFLite export complete: {} ({:.2} MB)",
        float32.display(),
        size_mb(&float32)?
    );

    let int8 = if options.quantize {
        tracing::info!("Step 4/4: Applying Int8 quantization...");
        let params = QuantizationParams {
            input_size: options.input_size,
            calibration_data: options.calibration_data.clone(),
            calibration_fraction: options.calibration_fraction,
        };
        match quantize_into(quantizer, weights, &params, &output_dir, &stem) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Int8 quantization failed, continuing with float32 only: {e}");
                None
            }
        }
    } else {
        tracing::info!("Step 4/4: Skipping quantization (use --quantize to enable)");
        None
    };

    let model_name = weights
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{stem}.pt"));
    let metadata = ModelMetadata::new(
        &model_name,
        options.input_size,
        int8.is_some(),
        exported.class_names.as_ref(),
    )
    .write(&output_dir)?;

    let cleaned = if options.cleanup {
        tracing::info!("Cleaning up intermediate files...");
        let source_dir = weights.parent().unwrap_or(Path::new("."));
        cleanup_intermediate_files(source_dir, &["onnx"])
            + cleanup_intermediate_files(&output_dir, &["onnx"])
    } else {
        0
    };

    Ok(ConvertSummary {
        output_dir,
        float32,
        int8,
        metadata,
        cleaned,
    })
}

fn quantize_into(
    quantizer: &dyn Quantizer,
    weights: &Path,
    params: &QuantizationParams,
    output_dir: &Path,
    stem: &str,
) -> Result<PathBuf, Y2mError> {
    let quantized = quantizer.quantize(weights, params)?;
    let dest = output_dir.join(format!("{stem}_int8.tflite"));
    copy_artifact(&quantized, &dest)?;

    let original = size_mb(weights)?;
    let reduced = size_mb(&dest)?;
    if original > 0.0 {
        tracing::info!(
            "[OK] Int8 quantization complete: {} (size reduction: {:.1}%)",
            dest.display(),
            (1.0 - reduced / original) * 100.0
        );
    }
    Ok(dest)
}
