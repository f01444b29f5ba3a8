use serde::{Deserialize, Serialize};

/// Class label of a detection.
///
/// The drowsiness model knows two classes. Any other class, by index or by
/// name, is kept so that it still takes part in the window average without
/// counting toward either side of the vote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Label {
    /// The subject looks drowsy.
    Drowsy,
    /// The subject looks alert.
    NotDrowsy,
    /// A class index outside the known vocabulary.
    Unknown(u32),
    /// A class name outside the known vocabulary, e.g. `yawn`.
    Named(String),
}

impl Label {
    /// Whether the label takes part in the drowsy / alert vote.
    pub fn is_known(&self) -> bool {
        matches!(self, Label::Drowsy | Label::NotDrowsy)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Drowsy => write!(f, "drowsy"),
            Label::NotDrowsy => write!(f, "notdrowsy"),
            Label::Unknown(id) => write!(f, "class_{id}"),
            Label::Named(name) => f.write_str(name),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        match s {
            "drowsy" => Label::Drowsy,
            "notdrowsy" => Label::NotDrowsy,
            _ => s
                .strip_prefix("class_")
                .and_then(|id| id.parse().ok())
                .map_or_else(|| Label::Named(s.to_string()), Label::Unknown),
        }
    }
}

impl std::str::FromStr for Label {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Label::from(s))
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::from(s.as_str())
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.to_string()
    }
}

/// Table mapping model class indices to labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassNames(Vec<String>);

impl ClassNames {
    /// Create a table from the class names in model order.
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    /// Parse a comma separated list of names, e.g. `drowsy,notdrowsy`.
    pub fn from_csv(csv: &str) -> Self {
        Self(
            csv.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Names in model order.
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Label for a class index.
    ///
    /// Names other than `drowsy` and `notdrowsy` map to [`Label::Named`],
    /// indices past the end of the table to [`Label::Unknown`].
    pub fn label(&self, class_id: usize) -> Label {
        match self.0.get(class_id) {
            Some(name) => Label::from(name.as_str()),
            None => Label::Unknown(class_id as u32),
        }
    }
}

impl Default for ClassNames {
    fn default() -> Self {
        Self(vec!["drowsy".to_string(), "notdrowsy".to_string()])
    }
}
