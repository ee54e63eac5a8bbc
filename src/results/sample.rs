use serde::{Deserialize, Serialize};

/// Error description attached to samples whose error count is non-zero.
/// The result log only carries a count, not a reason.
pub const GENERIC_ERROR: &str = "There were some errors in Grinder test";

/// One normalized request measurement.
///
/// Times are in seconds. `label` is always empty and `concurrency` always
/// `None` for this source: the result log names neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Request start, seconds since the Unix epoch
    pub timestamp: f64,
    pub label: String,
    pub concurrency: Option<u32>,
    pub response_time: f64,
    /// Host resolution plus connection establishment
    pub connect_time: f64,
    /// Time to first byte
    pub latency: f64,
    pub response_code: String,
    pub error: Option<String>,
}

impl SampleRecord {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
