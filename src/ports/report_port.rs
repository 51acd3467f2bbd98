//! Report output port trait.

use crate::domain::error::TallyError;
use crate::domain::netting::ContractAggregate;
use crate::domain::reconstruct::PositionSummary;
use std::path::Path;

/// Port for persisting aggregation results.
///
/// `digits` is the rendering precision for monetary amounts; values stay
/// exact until they pass through here.
pub trait ReportPort {
    fn write_netting(
        &self,
        totals: &[ContractAggregate],
        digits: u32,
        output: &Path,
    ) -> Result<(), TallyError>;

    fn write_positions(
        &self,
        summaries: &[PositionSummary],
        digits: u32,
        output: &Path,
    ) -> Result<(), TallyError>;
}
