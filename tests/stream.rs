use y2m::{
    ClassNames, Detection, JsonLinesSource, Label, LabelDirSource, Report, Stabilizer,
    StabilizerConfig, StabilizedState, stabilize,
};

fn frames_of(labels: &[Label], confidence: f32) -> Vec<Vec<Detection>> {
    labels
        .iter()
        .map(|label| vec![Detection::new(label.clone(), confidence)])
        .collect()
}

#[test]
fn test_drowsy_then_alert_stream() {
    let mut labels = vec![Label::Drowsy; 15];
    labels.extend(vec![Label::NotDrowsy; 15]);

    let reports: Vec<Report> =
        stabilize(frames_of(&labels, 0.9), StabilizerConfig::default()).collect();

    let summary: Vec<(u64, StabilizedState)> =
        reports.iter().map(|r| (r.frame(), r.state())).collect();
    assert_eq!(
        summary,
        vec![
            (5, StabilizedState::Drowsy),
            (20, StabilizedState::Alert),
            (30, StabilizedState::Alert),
        ]
    );

    match reports[1] {
        Report::State { summary, .. } => {
            assert_eq!(summary.drowsy_count, 0);
            assert_eq!(summary.alert_count, 5);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_evaluations_between_reports_are_silent() {
    let mut labels = vec![Label::Drowsy; 15];
    labels.extend(vec![Label::NotDrowsy; 15]);

    let mut stabilizer = Stabilizer::default();
    for (frame, detections) in frames_of(&labels, 0.9).into_iter().enumerate() {
        let frame = frame as u64 + 1;
        let report = stabilizer.ingest(detections);
        if frame % 5 == 0 {
            let expected = if frame <= 15 {
                StabilizedState::Drowsy
            } else {
                StabilizedState::Alert
            };
            assert_eq!(stabilizer.summary().state, expected, "frame {frame}");
        }
        assert_eq!(report.is_some(), matches!(frame, 5 | 20 | 30), "frame {frame}");
    }
    assert_eq!(stabilizer.frame_count(), 30);
}

#[test]
fn test_change_on_frame_13_reported_on_15() {
    let mut stabilizer = Stabilizer::default();
    let mut reported = Vec::new();
    for frame in 1..=15u64 {
        // frames 11 and 12 empty, alert from 13 on
        let detections = match frame {
            1..=10 => vec![Detection::new(Label::Drowsy, 0.8)],
            11 | 12 => vec![],
            _ => vec![Detection::new(Label::NotDrowsy, 0.8)],
        };
        if let Some(report) = stabilizer.ingest(detections) {
            reported.push((report.frame(), report.state()));
        }
        if frame == 13 || frame == 14 {
            assert_eq!(stabilizer.last_reported(), Some(StabilizedState::Drowsy));
        }
    }
    // window at 15: d d a a a
    assert_eq!(
        reported,
        vec![(5, StabilizedState::Drowsy), (15, StabilizedState::Alert)]
    );
}

#[test]
fn test_window_bound_over_mixed_stream() {
    let mut stabilizer = Stabilizer::default();
    let mut seed: u32 = 12345;
    let mut recent = Vec::new();
    for _ in 0..500 {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let detections = match seed >> 29 {
            0 | 1 => vec![],
            2 | 3 => vec![Detection::new(Label::Drowsy, (seed % 100) as f32 / 100.0)],
            4 | 5 => vec![Detection::new(Label::NotDrowsy, (seed % 100) as f32 / 100.0)],
            _ => vec![
                Detection::new(Label::Unknown(3), 0.5),
                Detection::new(Label::Drowsy, (seed % 100) as f32 / 100.0),
            ],
        };
        if let Some(best) = y2m::best_detection(detections.clone()) {
            recent.push(best);
        }
        stabilizer.ingest(detections);

        let window: Vec<Detection> = stabilizer.window().iter().cloned().collect();
        assert!(window.len() <= 5);
        let start = recent.len().saturating_sub(5);
        assert_eq!(window.as_slice(), &recent[start..]);
    }
}

#[test]
fn test_json_lines_replay() -> Result<(), Box<dyn std::error::Error>> {
    let mut input = String::new();
    for _ in 0..30 {
        input.push_str("[]\n");
    }
    for _ in 0..5 {
        input.push_str(r#"[{"label": "notdrowsy", "confidence": 0.6}, {"label": "drowsy", "confidence": 0.3}]"#);
        input.push('\n');
    }

    let frames = JsonLinesSource::new(input.as_bytes(), "memory").collect::<Result<Vec<_>, _>>()?;
    let reports: Vec<String> = stabilize(frames, StabilizerConfig::default())
        .map(|r| r.to_string())
        .collect();
    assert_eq!(
        reports,
        vec![
            "[Frame 30] No detections in recent frames".to_string(),
            "[Frame 35] State: ALERT (avg conf: 0.60, history: 0D/5A)".to_string(),
        ]
    );
    Ok(())
}

#[test]
fn test_out_of_vocabulary_label_replay() -> Result<(), Box<dyn std::error::Error>> {
    let input = concat!(
        "[{\"label\": \"drowsy\", \"confidence\": 0.9}]\n",
        "[{\"label\": \"drowsy\", \"confidence\": 0.9}]\n",
        "[{\"label\": \"yawn\", \"confidence\": 0.8}]\n",
        "[{\"label\": \"notdrowsy\", \"confidence\": 0.6}]\n",
        "[{\"label\": \"drowsy\", \"confidence\": 0.7}]\n",
    );

    let frames = JsonLinesSource::new(input.as_bytes(), "memory").collect::<Result<Vec<_>, _>>()?;
    let reports: Vec<Report> = stabilize(frames, StabilizerConfig::default()).collect();
    assert_eq!(reports.len(), 1);
    match reports[0] {
        Report::State { frame, summary } => {
            assert_eq!(frame, 5);
            assert_eq!(summary.state, StabilizedState::Drowsy);
            assert_eq!(summary.drowsy_count, 3);
            assert_eq!(summary.alert_count, 1);
            // yawn still counts toward the average
            let avg = summary.avg_confidence.ok_or("missing average")?;
            assert!((avg - 0.78).abs() < 1e-5);
        }
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[test]
fn test_label_dir_replay() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    for frame in 1..=10 {
        // odd frames detect nothing
        if frame % 2 == 0 {
            std::fs::write(
                dir.path().join(format!("clip_{frame}.txt")),
                "0 0.5 0.5 0.3 0.3 0.9\n1 0.5 0.5 0.3 0.3 0.2\n",
            )?;
        }
    }

    let source = LabelDirSource::open(dir.path(), ClassNames::default(), None)?;
    let mut stabilizer = Stabilizer::default();
    let mut reports = Vec::new();
    for frame in source {
        if let Some(report) = stabilizer.ingest(frame?) {
            reports.push(report);
        }
    }
    assert_eq!(stabilizer.frame_count(), 10);
    assert_eq!(stabilizer.window().len(), 5);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].frame(), 5);
    assert_eq!(reports[0].state(), StabilizedState::Drowsy);
    Ok(())
}
