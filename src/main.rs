use argh::FromArgs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use kornia_io::functional as F;
use y2m::{
    AppConfig, ClassNames, ConvertOptions, ConvertSummary, DetectionSource, InputSize,
    JsonLinesSource, JsonSink, LabelDirSource, LogSink, ReportSink, Stabilizer, UltralyticsCli,
    UltralyticsPredictor, Y2mError, best_detection, convert, resolve_weights,
};

#[derive(FromArgs)]
/// Y2M: YOLO to Mobile conversion pipeline and drowsiness monitor
struct Args {
    /// enable verbose output
    #[argh(switch, short = 'v')]
    verbose: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Convert(ConvertArgs),
    Stream(StreamArgs),
    Image(ImageArgs),
}

#[derive(FromArgs)]
/// convert a YOLO .pt checkpoint to TFLite
#[argh(subcommand, name = "convert")]
struct ConvertArgs {
    /// path to the YOLO .pt model file, or hf://owner/repo/file.pt
    #[argh(option, short = 'w')]
    weights: String,

    /// output directory for converted models (default: ./converted_models)
    #[argh(option, short = 'o', default = "PathBuf::from(\"./converted_models\")")]
    output: PathBuf,

    /// apply int8 quantization for a smaller model
    #[argh(switch, short = 'q')]
    quantize: bool,

    /// input image size as HEIGHT,WIDTH (default: 640,640)
    #[argh(
        option,
        short = 's',
        from_str_fn(parse_input_size),
        default = "InputSize::default()"
    )]
    input_size: InputSize,

    /// dataset yaml used to calibrate the int8 model
    #[argh(option)]
    calibration_data: Option<PathBuf>,

    /// fraction of the calibration dataset to use (default: 1.0)
    #[argh(option, default = "1.0")]
    calibration_fraction: f32,

    /// remove intermediate files (.onnx) after conversion
    #[argh(switch)]
    cleanup: bool,

    /// the ultralytics executable (default: yolo)
    #[argh(option, default = "PathBuf::from(\"yolo\")")]
    yolo: PathBuf,
}

#[derive(FromArgs)]
/// replay a detection stream and report the stabilized state
#[argh(subcommand, name = "stream")]
struct StreamArgs {
    /// detections as JSON lines, one array per frame (default: stdin)
    #[argh(option)]
    jsonl: Option<PathBuf>,

    /// ultralytics save_txt label directory of a video
    #[argh(option)]
    labels: Option<PathBuf>,

    /// total number of frames of the video behind --labels
    #[argh(option)]
    frames: Option<u64>,

    /// configuration file (JSON)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// comma separated class names in model order
    #[argh(option)]
    names: Option<String>,

    /// print reports as JSON lines
    #[argh(switch)]
    json: bool,
}

#[derive(FromArgs)]
/// run the checkpoint on a single image
#[argh(subcommand, name = "image")]
struct ImageArgs {
    /// path to the image
    #[argh(option, short = 'i')]
    image: PathBuf,

    /// path to the model file (default: best.pt)
    #[argh(option, short = 'm', default = "PathBuf::from(\"best.pt\")")]
    model: PathBuf,

    /// configuration file (JSON)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// comma separated class names in model order
    #[argh(option)]
    names: Option<String>,

    /// the ultralytics executable (default: yolo)
    #[argh(option, default = "PathBuf::from(\"yolo\")")]
    yolo: PathBuf,
}

fn parse_input_size(value: &str) -> Result<InputSize, String> {
    let (height, width) = value
        .split_once([',', 'x'])
        .ok_or_else(|| format!("expected HEIGHT,WIDTH, got {value:?}"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .ok()
            .filter(|&v| v > 0)
            .ok_or_else(|| format!("invalid size {s:?}"))
    };
    Ok(InputSize {
        height: parse(height)?,
        width: parse(width)?,
    })
}

fn banner(title: &str) {
    println!("\n{}", "=".repeat(50));
    println!("   {title}");
    println!("{}\n", "=".repeat(50));
}

fn load_config(path: Option<&PathBuf>, names: Option<&str>) -> Result<AppConfig, Y2mError> {
    let mut config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(names) = names {
        config.detector.class_names = ClassNames::from_csv(names);
    }
    Ok(config)
}

fn run_convert(args: &ConvertArgs) -> Result<ConvertSummary, Y2mError> {
    banner("Y2M - YOLO to Mobile Conversion Pipeline");

    let hub_workdir = std::env::temp_dir().join("y2m").join("hub");
    let options = ConvertOptions {
        weights: resolve_weights(&args.weights, &hub_workdir)?,
        output_dir: args.output.clone(),
        input_size: args.input_size,
        quantize: args.quantize,
        calibration_data: args.calibration_data.clone(),
        calibration_fraction: args.calibration_fraction,
        cleanup: args.cleanup,
    };
    let backend = UltralyticsCli::new(&args.yolo);
    let summary = convert(&options, &backend, &backend)?;

    banner("[SUCCESS] Conversion Complete!");
    println!("Output directory: {}", summary.output_dir.display());
    for path in std::iter::once(&summary.float32)
        .chain(summary.int8.as_ref())
        .chain(std::iter::once(&summary.metadata))
    {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        println!("   +-- {name}");
    }
    println!();
    Ok(summary)
}

fn open_source(
    args: &StreamArgs,
    class_names: &ClassNames,
) -> Result<Box<dyn DetectionSource>, Y2mError> {
    Ok(match (&args.jsonl, &args.labels) {
        (Some(_), Some(_)) => {
            return Err(Y2mError::InvalidArguments(
                "--jsonl and --labels are exclusive".to_string(),
            ));
        }
        (Some(path), None) => Box::new(JsonLinesSource::open(path)?),
        (None, Some(dir)) => Box::new(LabelDirSource::open(dir, class_names.clone(), args.frames)?),
        (None, None) => Box::new(JsonLinesSource::new(std::io::stdin().lock(), "<stdin>")),
    })
}

fn run_stream(args: &StreamArgs) -> Result<u64, Y2mError> {
    let config = load_config(args.config.as_ref(), args.names.as_deref())?;
    let threshold = config.detector.confidence_threshold;

    let source = open_source(args, &config.detector.class_names)?;

    let mut sink: Box<dyn ReportSink> = if args.json {
        Box::new(JsonSink::new(std::io::stdout()))
    } else {
        banner("DROWSINESS DETECTION - STREAM");
        Box::new(LogSink::new(std::io::stdout()))
    };

    let mut stabilizer = Stabilizer::new(config.stabilizer);
    for frame in source {
        let detections = frame?
            .into_iter()
            .filter(|detection| detection.confidence > threshold);
        if let Some(report) = stabilizer.ingest(detections) {
            sink.report(&report)?;
        }
    }

    if args.json {
        tracing::info!("Ran {} inferences", stabilizer.frame_count());
    } else {
        println!(
            "\n[SUCCESS] Ran {} inferences successfully!",
            stabilizer.frame_count()
        );
    }
    Ok(stabilizer.frame_count())
}

fn run_image(args: &ImageArgs) -> Result<(), Y2mError> {
    let config = load_config(args.config.as_ref(), args.names.as_deref())?;

    if !args.model.exists() {
        return Err(Y2mError::FileNotFound(args.model.clone()));
    }
    if !args.image.exists() {
        return Err(Y2mError::FileNotFound(args.image.clone()));
    }

    banner("IMAGE INFERENCE TEST");
    println!("Loading image: {}", args.image.display());

    // read the image as RGB8 for its dimensions
    let image = F::read_image_any(&args.image)?;
    let (width, height) = (image.width() as f32, image.height() as f32);

    let predictor = UltralyticsPredictor::new(
        UltralyticsCli::new(&args.yolo),
        &args.model,
        config.detector.confidence_threshold,
        config.detector.class_names.clone(),
        std::env::temp_dir().join("y2m"),
    );
    let detections = predictor.predict(&args.image)?;

    println!("\nDetections found: {}", detections.len());
    for (i, detection) in detections.iter().enumerate() {
        let bbox = detection
            .bbox
            .map(|bbox| bbox.scale(width, height).to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  [{}] Class: '{}', Confidence: {:.2}, Box: {}",
            i + 1,
            detection.label,
            detection.confidence,
            bbox
        );
    }
    if let Some(best) = best_detection(detections) {
        println!("\nBest: {} ({:.2})", best.label, best.confidence);
    }

    println!("\n[SUCCESS] Inference completed!");
    Ok(())
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = match &args.command {
        Command::Convert(args) => run_convert(args).map(|_| ()),
        Command::Stream(args) => run_stream(args).map(|_| ()),
        Command::Image(args) => run_image(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_validation() {
                eprintln!("\n[ERROR] Validation failed: {}", e.code());
            }
            eprintln!("\n[ERROR] {}: {e}", e.code());
            ExitCode::from(e.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_size() {
        assert_eq!(
            parse_input_size("480,640"),
            Ok(InputSize {
                height: 480,
                width: 640
            })
        );
        assert_eq!(
            parse_input_size("320x320"),
            Ok(InputSize {
                height: 320,
                width: 320
            })
        );
        assert!(parse_input_size("640").is_err());
        assert!(parse_input_size("0,640").is_err());
    }

    #[test]
    fn test_convert_args() -> Result<(), Box<dyn std::error::Error>> {
        let args = Args::from_args(
            &["y2m"],
            &["-v", "convert", "--weights", "best.pt", "--quantize", "-s", "320,320"],
        )
        .map_err(|e| e.output)?;
        assert!(args.verbose);
        match args.command {
            Command::Convert(convert) => {
                assert_eq!(convert.weights, "best.pt");
                assert!(convert.quantize);
                assert!(!convert.cleanup);
                assert_eq!(convert.input_size.height, 320);
                assert_eq!(convert.output, PathBuf::from("./converted_models"));
            }
            _ => return Err("expected convert".into()),
        }
        Ok(())
    }

    #[test]
    fn test_stream_sources_are_exclusive() -> Result<(), Box<dyn std::error::Error>> {
        let args = Args::from_args(
            &["y2m"],
            &["stream", "--jsonl", "frames.jsonl", "--labels", "labels"],
        )
        .map_err(|e| e.output)?;
        let Command::Stream(stream) = args.command else {
            return Err("expected stream".into());
        };
        let err = open_source(&stream, &ClassNames::default())
            .err()
            .ok_or("expected error")?;
        assert!(matches!(err, Y2mError::InvalidArguments(_)));
        assert_eq!(err.code(), "ERR_USAGE");
        Ok(())
    }
}
