use serde::{Deserialize, Serialize};

use crate::{
    Detection, HistoryWindow, StabilizedState, WindowSummary, best_detection, classify,
    window::DEFAULT_WINDOW_CAPACITY,
};

/// Stabilizer configuration struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Number of detections kept in the window.
    pub window_capacity: usize,
    /// The state is evaluated every `evaluation_interval` frames.
    pub evaluation_interval: u64,
    /// An unchanged state is re-reported every `heartbeat_interval` frames.
    pub heartbeat_interval: u64,
}

/// Default configuration for the stabilizer.
impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            evaluation_interval: 5,
            heartbeat_interval: 30,
        }
    }
}

/// State report emitted by the stabilizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    /// The window voted for a state.
    State {
        /// Frame counter at emission, starting at 1.
        frame: u64,
        /// Window composition.
        #[serde(flatten)]
        summary: WindowSummary,
    },
    /// Heartbeat while no detection has been seen yet.
    NoDetection {
        /// Frame counter at emission, starting at 1.
        frame: u64,
    },
}

impl Report {
    /// Frame the report was emitted on.
    pub fn frame(&self) -> u64 {
        match self {
            Report::State { frame, .. } | Report::NoDetection { frame } => *frame,
        }
    }

    /// Reported state.
    pub fn state(&self) -> StabilizedState {
        match self {
            Report::State { summary, .. } => summary.state,
            Report::NoDetection { .. } => StabilizedState::NoDetection,
        }
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Report::State { frame, summary } => write!(
                f,
                "[Frame {frame}] State: {} (avg conf: {:.2}, history: {}D/{}A)",
                summary.state,
                summary.avg_confidence.unwrap_or_default(),
                summary.drowsy_count,
                summary.alert_count
            ),
            Report::NoDetection { frame } => {
                write!(f, "[Frame {frame}] No detections in recent frames")
            }
        }
    }
}

/// Outcome of [`transition`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// Last reported state after this frame.
    pub last_reported: Option<StabilizedState>,
    /// Report to emit for this frame, if any.
    pub report: Option<Report>,
}

/// Reporting cadence for one frame.
///
/// `frame` is the already incremented frame counter and `window` the window
/// after ingesting the frame. The state is only evaluated on multiples of
/// the evaluation interval, so a change between two evaluations surfaces at
/// the next one. An evaluated state is reported when it differs from
/// `last_reported` or when the heartbeat is due. While the window is empty
/// only the heartbeat reports, and it leaves `last_reported` untouched.
pub fn transition(
    frame: u64,
    window: &HistoryWindow,
    last_reported: Option<StabilizedState>,
    config: &StabilizerConfig,
) -> Transition {
    let heartbeat = frame % config.heartbeat_interval.max(1) == 0;

    if !window.is_empty() && frame % config.evaluation_interval.max(1) == 0 {
        let summary = classify(window);
        if last_reported != Some(summary.state) || heartbeat {
            return Transition {
                last_reported: Some(summary.state),
                report: Some(Report::State { frame, summary }),
            };
        }
    } else if window.is_empty() && heartbeat {
        return Transition {
            last_reported,
            report: Some(Report::NoDetection { frame }),
        };
    }

    Transition {
        last_reported,
        report: None,
    }
}

/// Detection stream stabilizer.
///
/// Owns the window, the frame counter and the last reported state for the
/// lifetime of one stream.
#[derive(Debug, Clone)]
pub struct Stabilizer {
    config: StabilizerConfig,
    window: HistoryWindow,
    frame_count: u64,
    last_reported: Option<StabilizedState>,
}

impl Stabilizer {
    /// Create a new stabilizer at the start of a stream.
    pub fn new(config: StabilizerConfig) -> Self {
        Self {
            window: HistoryWindow::new(config.window_capacity),
            config,
            frame_count: 0,
            last_reported: None,
        }
    }

    /// Process the raw detections of one frame.
    pub fn ingest<I>(&mut self, detections: I) -> Option<Report>
    where
        I: IntoIterator<Item = Detection>,
    {
        self.ingest_event(best_detection(detections))
    }

    /// Process one frame already reduced to its best detection.
    pub fn ingest_event(&mut self, detection: Option<Detection>) -> Option<Report> {
        self.window.ingest(detection);
        self.frame_count += 1;

        let Transition {
            last_reported,
            report,
        } = transition(
            self.frame_count,
            &self.window,
            self.last_reported,
            &self.config,
        );
        self.last_reported = last_reported;

        if let Some(report) = &report {
            tracing::debug!(frame = report.frame(), state = %report.state(), "state report");
        }
        report
    }

    /// Number of frames processed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Current window.
    pub fn window(&self) -> &HistoryWindow {
        &self.window
    }

    /// State of the last emitted state report.
    pub fn last_reported(&self) -> Option<StabilizedState> {
        self.last_reported
    }

    /// Classify the current window without touching the cadence.
    pub fn summary(&self) -> WindowSummary {
        classify(&self.window)
    }

    /// Configuration in use.
    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self::new(StabilizerConfig::default())
    }
}

/// Lazily turn a stream of per-frame raw detections into state reports.
pub fn stabilize<F, I>(frames: F, config: StabilizerConfig) -> impl Iterator<Item = Report>
where
    F: IntoIterator<Item = I>,
    I: IntoIterator<Item = Detection>,
{
    let mut stabilizer = Stabilizer::new(config);
    frames
        .into_iter()
        .filter_map(move |detections| stabilizer.ingest(detections))
}
