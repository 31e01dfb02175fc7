//! JSON report adapter implementing ReportPort.
//!
//! Writes the whole [`ScanReport`] as one JSON document to a file, or to
//! stdout when no path is given.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::domain::error::TrendscanError;
use crate::domain::scan::ScanReport;
use crate::ports::report_port::ReportPort;

pub struct JsonReportAdapter {
    output_path: Option<PathBuf>,
    pretty: bool,
}

impl JsonReportAdapter {
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self {
            output_path,
            pretty: true,
        }
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    pub fn render(&self, report: &ScanReport) -> Result<String, TrendscanError> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        };
        rendered.map_err(|e| TrendscanError::Report {
            reason: format!("failed to serialize report: {e}"),
        })
    }
}

impl ReportPort for JsonReportAdapter {
    fn emit(&self, report: &ScanReport) -> Result<(), TrendscanError> {
        let mut json = self.render(report)?;
        json.push('\n');

        match &self.output_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, json)?;
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(json.as_bytes())?;
                stdout.flush()?;
            }
        }
        Ok(())
    }
}
