//! Delegation to the Ultralytics `yolo` command line tool.
//!
//! Export, int8 calibration and checkpoint inference all run inside the
//! external framework; this module only builds the command lines, runs them
//! and picks up the files they leave behind.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::{
    ClassNames, Detection, ExportedModel, InputSize, ModelExporter, QuantizationParams,
    Quantizer, Y2mError, source::parse_label_file,
};

/// Directory Ultralytics writes TFLite exports into, next to the checkpoint.
pub fn saved_model_dir(weights: &Path) -> PathBuf {
    let stem = weights
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    weights.with_file_name(format!("{stem}_saved_model"))
}

/// Read the class names from an exported `metadata.yaml`.
///
/// Only the block mapping written by the exporter is understood:
///
/// ```text
/// names:
///   0: drowsy
///   1: notdrowsy
/// ```
pub fn parse_metadata_names(yaml: &str) -> Option<ClassNames> {
    let mut lines = yaml.lines().skip_while(|line| line.trim_end() != "names:");
    lines.next()?;

    let mut names: Vec<(usize, String)> = lines
        .take_while(|line| line.starts_with(' ') || line.starts_with('\t'))
        .filter_map(|line| {
            let (index, name) = line.trim().split_once(':')?;
            let name = name.trim().trim_matches(|c| c == '\'' || c == '"');
            Some((index.trim().parse().ok()?, name.to_string()))
        })
        .collect();
    if names.is_empty() {
        return None;
    }
    names.sort_by_key(|(index, _)| *index);
    Some(ClassNames::new(names.into_iter().map(|(_, name)| name).collect()))
}

/// Last non-empty line of the process output, for error messages.
fn failure_reason(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    stderr
        .lines()
        .chain(stdout.lines())
        .filter(|line| !line.trim().is_empty())
        .last()
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| format!("exited with {}", output.status))
}

/// Exporter and quantizer backed by the `yolo` executable.
#[derive(Debug, Clone)]
pub struct UltralyticsCli {
    program: PathBuf,
}

impl UltralyticsCli {
    /// Use `program` as the `yolo` executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn export_args(
        weights: &Path,
        input_size: InputSize,
        quantization: Option<&QuantizationParams>,
    ) -> Vec<String> {
        let mut args = vec![
            "export".to_string(),
            format!("model={}", weights.display()),
            "format=tflite".to_string(),
            format!("imgsz={},{}", input_size.height, input_size.width),
            "dynamic=False".to_string(),
        ];
        if let Some(params) = quantization {
            args.push("int8=True".to_string());
            if let Some(data) = &params.calibration_data {
                args.push(format!("data={}", data.display()));
            }
            args.push(format!("fraction={}", params.calibration_fraction));
        }
        args
    }

    fn run(&self, args: &[String]) -> Result<Output, Y2mError> {
        tracing::debug!("running {} {}", self.program.display(), args.join(" "));
        Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Y2mError::DependencyMissing(format!(
                    "{} not found. Install with: pip install ultralytics",
                    self.program.display()
                )),
                _ => e.into(),
            })
    }

    fn artifact(weights: &Path, suffix: &str) -> PathBuf {
        let stem = weights
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        saved_model_dir(weights).join(format!("{stem}_{suffix}.tflite"))
    }
}

impl Default for UltralyticsCli {
    fn default() -> Self {
        Self::new("yolo")
    }
}

impl ModelExporter for UltralyticsCli {
    fn export(&self, weights: &Path, input_size: InputSize) -> Result<ExportedModel, Y2mError> {
        tracing::info!("This may take a few minutes...");
        let output = self.run(&Self::export_args(weights, input_size, None))?;
        if !output.status.success() {
            return Err(Y2mError::ExportFailed(failure_reason(&output)));
        }

        let path = Self::artifact(weights, "float32");
        if !path.exists() {
            return Err(Y2mError::ExportFailed(format!(
                "expected export at {}",
                path.display()
            )));
        }

        let class_names = std::fs::read_to_string(saved_model_dir(weights).join("metadata.yaml"))
            .ok()
            .and_then(|yaml| parse_metadata_names(&yaml));
        if class_names.is_none() {
            tracing::warn!("Could not read class names from the exported metadata");
        }

        Ok(ExportedModel { path, class_names })
    }
}

impl Quantizer for UltralyticsCli {
    fn quantize(&self, weights: &Path, params: &QuantizationParams) -> Result<PathBuf, Y2mError> {
        tracing::info!("Using Ultralytics Int8 export...");
        let output = self.run(&Self::export_args(weights, params.input_size, Some(params)))?;
        if !output.status.success() {
            return Err(Y2mError::QuantizationFailed(failure_reason(&output)));
        }

        let path = Self::artifact(weights, "int8");
        if !path.exists() {
            return Err(Y2mError::QuantizationFailed(format!(
                "expected export at {}",
                path.display()
            )));
        }
        Ok(path)
    }
}

/// Single image inference through `yolo predict`.
#[derive(Debug, Clone)]
pub struct UltralyticsPredictor {
    cli: UltralyticsCli,
    model: PathBuf,
    confidence_threshold: f32,
    class_names: ClassNames,
    workdir: PathBuf,
}

impl UltralyticsPredictor {
    /// Create a predictor for `model`; prediction files go to `workdir`.
    pub fn new(
        cli: UltralyticsCli,
        model: impl Into<PathBuf>,
        confidence_threshold: f32,
        class_names: ClassNames,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cli,
            model: model.into(),
            confidence_threshold,
            class_names,
            workdir: workdir.into(),
        }
    }

    fn predict_args(&self, image: &Path) -> Vec<String> {
        vec![
            "predict".to_string(),
            format!("model={}", self.model.display()),
            format!("source={}", image.display()),
            format!("conf={}", self.confidence_threshold),
            "save=False".to_string(),
            "save_txt=True".to_string(),
            "save_conf=True".to_string(),
            format!("project={}", self.workdir.display()),
            "name=predict".to_string(),
            "exist_ok=True".to_string(),
        ]
    }

    /// Label file Ultralytics writes for `image`.
    fn label_file(&self, image: &Path) -> PathBuf {
        let stem = image
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.workdir
            .join("predict")
            .join("labels")
            .join(format!("{stem}.txt"))
    }

    /// Detect on one image file. Boxes are normalized to `[0, 1]`.
    pub fn predict(&self, image: &Path) -> Result<Vec<Detection>, Y2mError> {
        if !image.exists() {
            return Err(Y2mError::FileNotFound(image.to_path_buf()));
        }

        let label_file = self.label_file(image);
        if label_file.exists() {
            std::fs::remove_file(&label_file)?;
        }

        let output = self.cli.run(&self.predict_args(image))?;
        if !output.status.success() {
            return Err(Y2mError::PredictionFailed(failure_reason(&output)));
        }

        // no label file means nothing was detected
        if !label_file.exists() {
            return Ok(Vec::new());
        }
        let detections = parse_label_file(&label_file, &self.class_names)?
            .into_iter()
            .filter(|d| d.confidence > self.confidence_threshold)
            .collect();
        Ok(detections)
    }
}
