use serde::Serialize;

use crate::{HistoryWindow, Label};

/// Smoothed classification derived from the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StabilizedState {
    /// Drowsy detections outnumber alert ones.
    Drowsy,
    /// Alert detections outnumber drowsy ones.
    Alert,
    /// Both sides are tied.
    Uncertain,
    /// The window is empty.
    NoDetection,
}

impl std::fmt::Display for StabilizedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                StabilizedState::Drowsy => "DROWSY",
                StabilizedState::Alert => "ALERT",
                StabilizedState::Uncertain => "UNCERTAIN",
                StabilizedState::NoDetection => "NO_DETECTION",
            }
        )
    }
}

/// Composition of the window and the state it votes for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowSummary {
    /// Majority state.
    pub state: StabilizedState,
    /// Mean confidence over every entry, `None` for an empty window.
    pub avg_confidence: Option<f32>,
    /// Number of `drowsy` entries.
    pub drowsy_count: usize,
    /// Number of `notdrowsy` entries.
    pub alert_count: usize,
}

/// Majority vote over the window.
///
/// Entries with an unknown label count toward the average confidence but
/// toward neither side of the vote.
pub fn classify(window: &HistoryWindow) -> WindowSummary {
    if window.is_empty() {
        return WindowSummary {
            state: StabilizedState::NoDetection,
            avg_confidence: None,
            drowsy_count: 0,
            alert_count: 0,
        };
    }

    let mut drowsy_count = 0;
    let mut alert_count = 0;
    let mut sum = 0.0;
    for detection in window.iter() {
        match detection.label {
            Label::Drowsy => drowsy_count += 1,
            Label::NotDrowsy => alert_count += 1,
            Label::Unknown(_) | Label::Named(_) => {}
        }
        sum += detection.confidence;
    }

    let state = match drowsy_count.cmp(&alert_count) {
        std::cmp::Ordering::Greater => StabilizedState::Drowsy,
        std::cmp::Ordering::Less => StabilizedState::Alert,
        std::cmp::Ordering::Equal => StabilizedState::Uncertain,
    };

    WindowSummary {
        state,
        avg_confidence: Some(sum / window.len() as f32),
        drowsy_count,
        alert_count,
    }
}
