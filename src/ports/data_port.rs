//! Price data access port trait.

use crate::domain::error::FxError;
use crate::domain::series::Series;

pub trait DataPort {
    /// Loads the full validated bar history for `instrument`, oldest first.
    fn fetch_series(&self, instrument: &str) -> Result<Series, FxError>;
}
