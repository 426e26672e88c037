//! Report output port trait.

use std::path::Path;

use crate::domain::error::FxError;
use crate::domain::indicator_set::IndicatorFrame;
use crate::domain::position::TradeRecord;
use crate::domain::simulator::BarTrace;

/// Port for writing run artifacts.
pub trait ReportPort {
    /// Writes the augmented series, one row per bar. `trace` holds the
    /// simulator's per-bar state and may be empty when no walk was run.
    fn write_snapshot(
        &self,
        frame: &IndicatorFrame,
        trace: &[BarTrace],
        output_path: &Path,
    ) -> Result<(), FxError>;

    fn write_trades(&self, trades: &[TradeRecord], output_path: &Path) -> Result<(), FxError>;
}
