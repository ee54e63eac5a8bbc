//! Header-driven column resolution
//!
//! The result log names its columns in the first line. Physical order is not
//! fixed, so every field is looked up by name through a [`HeaderIndex`] built
//! once when the log is opened.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Header names of the columns a sample is built from.
///
/// Defaults match the Grinder data log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub start_time: String,
    pub test_time: String,
    pub time_to_first_byte: String,
    pub response_code: String,
    pub resolve_time: String,
    pub connect_time: String,
    pub errors: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            start_time: "Start time (ms since Epoch)".to_string(),
            test_time: "Test time".to_string(),
            time_to_first_byte: "Time to first byte".to_string(),
            response_code: "HTTP response code".to_string(),
            resolve_time: "Time to resolve host".to_string(),
            connect_time: "Time to establish connection".to_string(),
            errors: "Errors".to_string(),
        }
    }
}

impl ColumnNames {
    /// All configured names, in a stable order
    pub fn all(&self) -> [&str; 7] {
        [
            self.start_time.as_str(),
            self.test_time.as_str(),
            self.time_to_first_byte.as_str(),
            self.response_code.as_str(),
            self.resolve_time.as_str(),
            self.connect_time.as_str(),
            self.errors.as_str(),
        ]
    }
}

/// Header name → column position, fixed for the life of a reader
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderIndex {
    index: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn from_header(line: &str, delimiter: char) -> Self {
        let index = line
            .split(delimiter)
            .enumerate()
            .map(|(ix, field)| (field.trim().to_string(), ix))
            .collect();
        Self { index }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Resolve the sample columns; names absent from the header stay `None`
    pub fn resolve(&self, names: &ColumnNames) -> ResolvedColumns {
        ResolvedColumns {
            start_time: self.position(&names.start_time),
            test_time: self.position(&names.test_time),
            time_to_first_byte: self.position(&names.time_to_first_byte),
            response_code: self.position(&names.response_code),
            resolve_time: self.position(&names.resolve_time),
            connect_time: self.position(&names.connect_time),
            errors: self.position(&names.errors),
        }
    }

    /// Configured names that the header does not contain
    pub fn missing<'a>(&self, names: &'a ColumnNames) -> Vec<&'a str> {
        names
            .all()
            .into_iter()
            .filter(|name| !self.index.contains_key(*name))
            .collect()
    }
}

/// Field positions of one sample's inputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub start_time: Option<usize>,
    pub test_time: Option<usize>,
    pub time_to_first_byte: Option<usize>,
    pub response_code: Option<usize>,
    pub resolve_time: Option<usize>,
    pub connect_time: Option<usize>,
    pub errors: Option<usize>,
}
