use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rules_group::Severity;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogMetadata {
    #[serde(default)]
    pub application: String,
    #[serde(default)]
    pub subsystem: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// One ingested log entry: its text (plain string or JSON) plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub text: Value,
    #[serde(default)]
    pub metadata: LogMetadata,
}

/// Address of a value inside a record: `text` or `text.a.b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    Text,
    Key(Vec<String>),
}

impl FieldPath {
    /// Paths without the `text.` prefix are read relative to the text.
    pub fn parse(path: &str) -> Self {
        let path = path.trim();
        if path.is_empty() || path == "text" {
            return FieldPath::Text;
        }
        let relative = path.strip_prefix("text.").unwrap_or(path);
        FieldPath::Key(relative.split('.').map(str::to_string).collect())
    }
}

impl LogRecord {
    pub fn new(text: impl Into<Value>) -> Self {
        Self {
            text: text.into(),
            metadata: LogMetadata::default(),
        }
    }

    /// Builds a record from one raw line; JSON objects become structured text.
    pub fn from_line(line: &str) -> Self {
        match serde_json::from_str::<Value>(line) {
            Ok(value @ Value::Object(_)) => Self::new(value),
            _ => Self::new(Value::String(line.to_string())),
        }
    }

    pub fn with_metadata(mut self, metadata: LogMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        match path {
            FieldPath::Text => Some(&self.text),
            FieldPath::Key(keys) => keys.iter().try_fold(&self.text, |value, key| value.get(key)),
        }
    }

    /// The value at `path` as matchable text: strings as-is, anything else as JSON.
    pub fn get_str(&self, path: &FieldPath) -> Option<String> {
        self.get(path).map(value_as_text)
    }

    /// Writes `value` at `path`, turning plain text into `{"text": <text>}` and
    /// creating intermediate objects as needed.
    pub fn set(&mut self, path: &FieldPath, value: Value) {
        let keys = match path {
            FieldPath::Text => {
                self.text = value;
                return;
            }
            FieldPath::Key(keys) => keys,
        };

        let Some((last, parents)) = keys.split_last() else {
            return;
        };
        let Some(mut current) = self.structured_text() else {
            return;
        };
        for key in parents {
            let entry = current
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = match entry {
                Value::Object(map) => map,
                _ => return,
            };
        }
        current.insert(last.clone(), value);
    }

    pub fn remove(&mut self, path: &FieldPath) -> Option<Value> {
        let keys = match path {
            FieldPath::Text => return Some(std::mem::replace(&mut self.text, Value::Null)),
            FieldPath::Key(keys) => keys,
        };
        let (last, parents) = keys.split_last()?;
        let mut current = &mut self.text;
        for key in parents {
            current = current.get_mut(key)?;
        }
        current.as_object_mut()?.remove(last)
    }

    fn structured_text(&mut self) -> Option<&mut Map<String, Value>> {
        let map = match std::mem::take(&mut self.text) {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            original => {
                let mut map = Map::new();
                map.insert("text".to_string(), original);
                map
            }
        };
        self.text = Value::Object(map);
        self.text.as_object_mut()
    }
}

pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
