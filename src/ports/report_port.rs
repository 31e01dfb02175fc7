//! Report output port trait.

use crate::domain::error::TrendscanError;
use crate::domain::scan::ScanReport;

/// Port for handing a finished cycle to its consumer.
pub trait ReportPort {
    fn emit(&self, report: &ScanReport) -> Result<(), TrendscanError>;
}
