//! Meta report: the structured record the isolation layer leaves behind.
//!
//! Wire format is one `key:value` pair per line:
//!
//! ```text
//! time:0.031
//! status:TO
//! message:wall clock limit exceeded
//! ```
//!
//! `time` is mandatory; `status` is absent on a normal exit; unknown keys
//! are ignored so newer isolation layers stay parseable.

use codebox_core::{Error, Result};

/// Status codes the isolation layer may write.
pub mod status {
    /// The isolation layer itself failed.
    pub const INTERNAL: &str = "XX";
    /// Wall-clock ceiling exceeded.
    pub const TIMEOUT: &str = "TO";
    /// Non-zero exit from the sandboxed process.
    pub const RUNTIME: &str = "RE";
    /// Terminated by a signal.
    pub const SIGNAL: &str = "SG";
}

/// Parsed meta report.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaReport {
    /// Termination status code; `None` means the process exited normally.
    pub status: Option<String>,
    /// Wall-clock seconds the run took.
    pub time_seconds: f64,
    /// Optional human-readable detail.
    pub message: Option<String>,
}

impl MetaReport {
    /// Parse the raw report content.
    ///
    /// A missing or non-numeric `time` field is a
    /// [`Error::MalformedMetaReport`] — never silently defaulted to zero,
    /// since a fabricated elapsed time would be indistinguishable from a
    /// real one.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut status = None;
        let mut time = None;
        let mut message = None;

        for line in raw.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            match key.trim() {
                "status" => status = Some(value.trim().to_string()),
                "message" => message = Some(value.trim().to_string()),
                "time" => {
                    let parsed = value.trim().parse::<f64>().map_err(|_| {
                        Error::malformed_meta_report(format!(
                            "time field is not a number: {:?}",
                            value.trim()
                        ))
                    })?;
                    time = Some(parsed);
                }
                _ => {}
            }
        }

        let time_seconds =
            time.ok_or_else(|| Error::malformed_meta_report("time field is missing"))?;
        if !time_seconds.is_finite() || time_seconds < 0.0 {
            return Err(Error::malformed_meta_report(format!(
                "time field is not a non-negative duration: {}",
                time_seconds
            )));
        }

        Ok(Self {
            status,
            time_seconds,
            message,
        })
    }

    /// Render the report in wire format. Used by the isolation backends.
    pub fn render(&self) -> String {
        let mut out = format!("time:{:.3}\n", self.time_seconds);
        if let Some(ref status) = self.status {
            out.push_str(&format!("status:{}\n", status));
        }
        if let Some(ref message) = self.message {
            out.push_str(&format!("message:{}\n", message));
        }
        out
    }
}
