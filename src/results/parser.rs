use super::columns::ResolvedColumns;
use super::sample::{SampleRecord, GENERIC_ERROR};

/// Why a data line did not produce a sample. Never surfaced to callers; the
/// reader logs it at debug level and moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedLine {
    #[error("column '{0}' is not in the header")]
    UnknownColumn(&'static str),

    #[error("line has no field {index} ({column})")]
    MissingField { column: &'static str, index: usize },

    #[error("{column} is not a non-negative integer: '{value}'")]
    NotANumber { column: &'static str, value: String },
}

/// Turns one trimmed data line into a sample using resolved header positions
#[derive(Debug, Clone)]
pub struct LineParser {
    columns: ResolvedColumns,
    delimiter: char,
}

impl LineParser {
    pub fn new(columns: ResolvedColumns, delimiter: char) -> Self {
        Self { columns, delimiter }
    }

    pub fn parse(&self, line: &str) -> Result<SampleRecord, MalformedLine> {
        let fields: Vec<&str> = line.split(self.delimiter).collect();

        // Checked first: a truncated write usually leaves a garbled start time
        let start_ms = self.millis(&fields, self.columns.start_time, "start time")?;
        let test_ms = self.millis(&fields, self.columns.test_time, "test time")?;
        let ttfb_ms = self.millis(&fields, self.columns.time_to_first_byte, "time to first byte")?;
        let resolve_ms = self.millis(&fields, self.columns.resolve_time, "resolve time")?;
        let connect_ms = self.millis(&fields, self.columns.connect_time, "connect time")?;
        let errors = self.millis(&fields, self.columns.errors, "errors")?;
        let response_code = self
            .field(&fields, self.columns.response_code, "response code")?
            .trim()
            .to_string();

        Ok(SampleRecord {
            timestamp: start_ms as f64 / 1000.0,
            label: String::new(),
            concurrency: None,
            response_time: test_ms as f64 / 1000.0,
            connect_time: resolve_ms.saturating_add(connect_ms) as f64 / 1000.0,
            latency: ttfb_ms as f64 / 1000.0,
            response_code,
            error: (errors != 0).then(|| GENERIC_ERROR.to_string()),
        })
    }

    fn field<'a>(
        &self,
        fields: &[&'a str],
        index: Option<usize>,
        column: &'static str,
    ) -> Result<&'a str, MalformedLine> {
        let index = index.ok_or(MalformedLine::UnknownColumn(column))?;
        fields
            .get(index)
            .copied()
            .ok_or(MalformedLine::MissingField { column, index })
    }

    fn millis(
        &self,
        fields: &[&str],
        index: Option<usize>,
        column: &'static str,
    ) -> Result<u64, MalformedLine> {
        let raw = self.field(fields, index, column)?.trim();
        raw.parse::<u64>().map_err(|_| MalformedLine::NotANumber {
            column,
            value: raw.to_string(),
        })
    }
}
