//! Replayable detection streams.
//!
//! A source yields the raw detections of one frame per item; an empty vector
//! is a frame where nothing was detected.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::{BoundingBox, ClassNames, Detection, Y2mError};

/// Stream of per-frame raw detections.
pub trait DetectionSource: Iterator<Item = Result<Vec<Detection>, Y2mError>> {}

impl<T> DetectionSource for T where T: Iterator<Item = Result<Vec<Detection>, Y2mError>> {}

/// Frames recorded as JSON lines, one array of detections per line.
///
/// ```text
/// [{"label": "drowsy", "confidence": 0.91}]
/// []
/// [{"label": "notdrowsy", "confidence": 0.55}, {"label": "drowsy", "confidence": 0.4}]
/// ```
///
/// Blank lines are skipped.
pub struct JsonLinesSource<R> {
    lines: std::io::Lines<R>,
    name: String,
    line_number: usize,
}

impl<R: BufRead> JsonLinesSource<R> {
    /// Read frames from `reader`; `name` is used in error messages.
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            lines: reader.lines(),
            name: name.into(),
            line_number: 0,
        }
    }
}

impl JsonLinesSource<std::io::BufReader<std::fs::File>> {
    /// Open a JSON lines file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Y2mError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Y2mError::FileNotFound(path.to_path_buf()));
        }
        let file = std::fs::File::open(path)?;
        Ok(Self::new(
            std::io::BufReader::new(file),
            path.display().to_string(),
        ))
    }
}

impl<R: BufRead> Iterator for JsonLinesSource<R> {
    type Item = Result<Vec<Detection>, Y2mError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(|e| Y2mError::MalformedRecord {
                location: format!("{}:{}", self.name, self.line_number),
                reason: e.to_string(),
            }));
        }
    }
}

/// Parse one line of an Ultralytics label file: `class xc yc w h [conf]`.
///
/// Coordinates are kept normalized. Files written without `save_conf` carry
/// no confidence, which is read as 1.0.
pub fn parse_label_line(line: &str, class_names: &ClassNames) -> Result<Detection, String> {
    let fields = line.split_whitespace().collect::<Vec<_>>();
    if fields.len() != 5 && fields.len() != 6 {
        return Err(format!("expected 5 or 6 fields, found {}", fields.len()));
    }
    let class_id = fields[0]
        .parse::<usize>()
        .map_err(|e| format!("class id {:?}: {e}", fields[0]))?;
    let mut values = [0.0f32; 5];
    for (value, field) in values.iter_mut().zip(&fields[1..]) {
        *value = field.parse().map_err(|e| format!("value {field:?}: {e}"))?;
    }
    let [x, y, w, h, conf] = values;
    let confidence = if fields.len() == 6 { conf } else { 1.0 };

    Ok(Detection::new(class_names.label(class_id), confidence)
        .with_bbox(BoundingBox::from_center(x, y, w, h)))
}

/// Parse a whole Ultralytics label file.
pub fn parse_label_file(
    path: impl AsRef<Path>,
    class_names: &ClassNames,
) -> Result<Vec<Detection>, Y2mError> {
    let path = path.as_ref();
    std::fs::read_to_string(path)?
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            parse_label_line(line, class_names).map_err(|reason| Y2mError::MalformedRecord {
                location: format!("{}:{}", path.display(), index + 1),
                reason,
            })
        })
        .collect()
}

/// Frame index of a video label file named `<stem>_<frame>.txt`.
fn frame_index(path: &Path) -> Option<u64> {
    if path.extension()? != "txt" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (_, index) = stem.rsplit_once('_')?;
    index.parse().ok()
}

/// Frames replayed from an Ultralytics `save_txt` label directory.
///
/// Ultralytics only writes a label file for frames with at least one
/// detection, so every missing index up to the last frame is an empty frame.
pub struct LabelDirSource {
    files: BTreeMap<u64, PathBuf>,
    class_names: ClassNames,
    next_frame: u64,
    last_frame: u64,
}

impl LabelDirSource {
    /// Index the label files of `dir`.
    ///
    /// `frames` extends the stream past the last label file, for videos whose
    /// trailing frames had no detection.
    pub fn open(
        dir: impl AsRef<Path>,
        class_names: ClassNames,
        frames: Option<u64>,
    ) -> Result<Self, Y2mError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Y2mError::FileNotFound(dir.to_path_buf()));
        }

        let mut files = BTreeMap::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            match frame_index(&path) {
                Some(index) => {
                    files.insert(index, path);
                }
                None => tracing::debug!("skipping {}", path.display()),
            }
        }

        let last_file = files.keys().next_back().copied().unwrap_or(0);
        let last_frame = frames.map_or(last_file, |frames| frames.max(last_file));
        tracing::info!(
            "indexed {} label files, {} frames in {}",
            files.len(),
            last_frame,
            dir.display()
        );

        Ok(Self {
            files,
            class_names,
            next_frame: 1,
            last_frame,
        })
    }
}

impl Iterator for LabelDirSource {
    type Item = Result<Vec<Detection>, Y2mError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_frame > self.last_frame {
            return None;
        }
        let frame = self.next_frame;
        self.next_frame += 1;
        Some(match self.files.get(&frame) {
            Some(path) => parse_label_file(path, &self.class_names),
            None => Ok(Vec::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Label;

    #[test]
    fn test_json_lines() -> Result<(), Box<dyn std::error::Error>> {
        let input = r#"[{"label": "drowsy", "confidence": 0.9}]

[]
[{"label": "notdrowsy", "confidence": 0.5}, {"label": "class_4", "confidence": 0.7}]
"#;
        let frames = JsonLinesSource::new(input.as_bytes(), "memory")
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], vec![Detection::new(Label::Drowsy, 0.9)]);
        assert!(frames[1].is_empty());
        assert_eq!(frames[2][1].label, Label::Unknown(4));
        Ok(())
    }

    #[test]
    fn test_json_lines_unknown_label() -> Result<(), Box<dyn std::error::Error>> {
        let input = r#"[{"label": "drowsy", "confidence": 0.9}]
[{"label": "drowsy", "confidence": 0.9}]
[{"label": "yawn", "confidence": 0.8}]
[{"label": "notdrowsy", "confidence": 0.6}]
[{"label": "drowsy", "confidence": 0.7}]
"#;
        let frames = JsonLinesSource::new(input.as_bytes(), "memory")
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[2][0].label, Label::Named("yawn".to_string()));
        assert_eq!(frames[2][0].confidence, 0.8);
        Ok(())
    }

    #[test]
    fn test_json_lines_error_location() {
        let input = "[]\n{not json}\n";
        let mut source = JsonLinesSource::new(input.as_bytes(), "memory");
        assert!(matches!(source.next(), Some(Ok(_))));
        match source.next() {
            Some(Err(Y2mError::MalformedRecord { location, .. })) => {
                assert_eq!(location, "memory:2")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_label_line() -> Result<(), Box<dyn std::error::Error>> {
        let names = ClassNames::default();
        let detection = parse_label_line("1 0.5 0.5 0.2 0.4 0.87", &names)?;
        assert_eq!(detection.label, Label::NotDrowsy);
        assert_eq!(detection.confidence, 0.87);
        let bbox = detection.bbox.ok_or("missing bbox")?;
        assert!((bbox.ymin - 0.3).abs() < 1e-6);

        let detection = parse_label_line("0 0.5 0.5 0.2 0.4", &names)?;
        assert_eq!(detection.confidence, 1.0);

        assert!(parse_label_line("0 0.5 0.5", &names).is_err());
        assert!(parse_label_line("a 0.5 0.5 0.2 0.4", &names).is_err());
        Ok(())
    }

    #[test]
    fn test_frame_index() {
        assert_eq!(frame_index(Path::new("run/labels/clip_12.txt")), Some(12));
        assert_eq!(frame_index(Path::new("run/labels/my_clip_3.txt")), Some(3));
        assert_eq!(frame_index(Path::new("run/labels/image.txt")), None);
        assert_eq!(frame_index(Path::new("run/labels/clip_3.json")), None);
    }

    #[test]
    fn test_label_dir_gaps_are_empty_frames() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("clip_2.txt"), "0 0.5 0.5 0.1 0.1 0.8\n")?;
        std::fs::write(
            dir.path().join("clip_4.txt"),
            "1 0.5 0.5 0.1 0.1 0.6\n0 0.4 0.4 0.1 0.1 0.7\n",
        )?;
        std::fs::write(dir.path().join("notes.md"), "ignored")?;

        let frames = LabelDirSource::open(dir.path(), ClassNames::default(), Some(6))?
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(frames.len(), 6);
        assert!(frames[0].is_empty());
        assert_eq!(frames[1].len(), 1);
        assert!(frames[2].is_empty());
        assert_eq!(frames[3].len(), 2);
        assert!(frames[4].is_empty() && frames[5].is_empty());
        Ok(())
    }

    #[test]
    fn test_label_dir_missing() {
        let result = LabelDirSource::open("/nonexistent/labels", ClassNames::default(), None);
        assert!(matches!(result, Err(Y2mError::FileNotFound(_))));
    }
}
