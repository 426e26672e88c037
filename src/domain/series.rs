//! Validated, time-ordered bar series.
//!
//! A [`Series`] can only be built from bars that are strictly increasing by
//! timestamp with finite positive prices and non-negative volume. Any
//! violation rejects the whole input.

use crate::domain::error::FxError;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    bars: Vec<Bar>,
}

impl Series {
    pub fn new(bars: Vec<Bar>) -> Result<Self, FxError> {
        for (i, bar) in bars.iter().enumerate() {
            validate_bar(i, bar)?;
            if i > 0 {
                let prev = bars[i - 1].timestamp;
                if bar.timestamp == prev {
                    return Err(malformed(i, format!("duplicate timestamp {}", bar.timestamp)));
                }
                if bar.timestamp < prev {
                    return Err(malformed(
                        i,
                        format!("timestamp {} precedes {}", bar.timestamp, prev),
                    ));
                }
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

fn validate_bar(index: usize, bar: &Bar) -> Result<(), FxError> {
    let prices = [
        ("open", bar.open),
        ("high", bar.high),
        ("low", bar.low),
        ("close", bar.close),
    ];
    for (name, value) in prices {
        if !value.is_finite() || value <= 0.0 {
            return Err(malformed(index, format!("{name} must be a positive number, got {value}")));
        }
    }
    if !bar.volume.is_finite() || bar.volume < 0.0 {
        return Err(malformed(
            index,
            format!("volume must be non-negative, got {}", bar.volume),
        ));
    }
    Ok(())
}

fn malformed(index: usize, reason: String) -> FxError {
    FxError::MalformedSeries { index, reason }
}
