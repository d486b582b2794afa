use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// Sentinel recorded when no usable answer could be produced for a label.
pub const NOT_ANSWERED: &str = "Not answered";

/// Accumulated mapping from question text to the answer ultimately
/// recorded for it, for the lifetime of one modal traversal.
///
/// Keys are deduplicated by trimmed, case-folded comparison; the casing
/// of the first-seen label is the one stored. Re-inserting an existing
/// key overwrites its answer (the host page re-renders logical steps, so
/// later reads are fresher). Insertion order is preserved for
/// deterministic logging and serialization.
#[derive(Debug, Default, Clone)]
pub struct LabelRecord {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

fn normalize_key(label: &str) -> String {
    label.trim().to_lowercase()
}

impl LabelRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: &str, answer: impl Into<String>) {
        let key = normalize_key(label);
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = answer.into(),
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((label.trim().to_string(), answer.into()));
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.index
            .get(&normalize_key(label))
            .map(|&i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(&normalize_key(label))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, a)| (l.as_str(), a.as_str()))
    }
}

impl Serialize for LabelRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, answer) in &self.entries {
            map.serialize_entry(label, answer)?;
        }
        map.end()
    }
}

/// Per-traversal flag raised when a required field could not be answered.
/// Once set, no further field on the modal is filled and the only
/// navigation taken is the discard path.
#[derive(Debug, Default)]
pub struct AbortSignal {
    aborted: bool,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self) {
        self.aborted = true;
    }

    pub fn is_set(&self) -> bool {
        self.aborted
    }
}

/// Per-job output handed to the persistence collaborator once a
/// traversal completes or is abandoned.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApplicationResult {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub responses: LabelRecord,
}
