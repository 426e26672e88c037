//! CSV file data adapter.
//!
//! Expects a header row naming `time` (or `timestamp`/`date`/`datetime`),
//! `open`, `high`, `low`, `close` and optionally `volume`, in any order and
//! case. Rows must already be in ascending time order.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::debug;

use crate::domain::error::FxError;
use crate::domain::ohlcv::Bar;
use crate::domain::series::Series;
use crate::ports::data_port::DataPort;

const FALLBACK_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Debug)]
pub struct CsvAdapter {
    path: PathBuf,
    timestamp_format: Option<String>,
}

impl CsvAdapter {
    /// `path` is either a CSV file or a directory holding `<INSTRUMENT>.csv`
    /// files.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            timestamp_format: None,
        }
    }

    pub fn with_timestamp_format(mut self, format: Option<String>) -> Self {
        self.timestamp_format = format.filter(|f| !f.trim().is_empty());
        self
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        if self.path.is_dir() {
            self.path.join(format!("{instrument}.csv"))
        } else {
            self.path.clone()
        }
    }

    fn parse_timestamp(&self, value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        if let Some(format) = &self.timestamp_format {
            return NaiveDateTime::parse_from_str(value, format)
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(value, format)
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                });
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.naive_utc());
        }
        FALLBACK_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }

    fn read_bars(&self, path: &Path) -> Result<Vec<Bar>, FxError> {
        let content = fs::read_to_string(path).map_err(|e| FxError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| FxError::Data {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let columns = Columns::locate(headers)?;

        let mut bars = Vec::new();
        for (index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| FxError::MalformedSeries {
                index,
                reason: format!("CSV parse error: {e}"),
            })?;
            bars.push(self.parse_bar(index, &record, &columns)?);
        }
        Ok(bars)
    }

    fn parse_bar(
        &self,
        index: usize,
        record: &StringRecord,
        columns: &Columns,
    ) -> Result<Bar, FxError> {
        let raw_time = field(index, record, columns.time, "time")?;
        let timestamp = self
            .parse_timestamp(raw_time)
            .ok_or_else(|| FxError::MalformedSeries {
                index,
                reason: format!("invalid timestamp '{raw_time}'"),
            })?;

        let volume = match columns.volume {
            Some(col) => number(index, record, col, "volume")?,
            None => 0.0,
        };

        Ok(Bar {
            timestamp,
            open: number(index, record, columns.open, "open")?,
            high: number(index, record, columns.high, "high")?,
            low: number(index, record, columns.low, "low")?,
            close: number(index, record, columns.close, "close")?,
            volume,
        })
    }
}

impl DataPort for CsvAdapter {
    fn fetch_series(&self, instrument: &str) -> Result<Series, FxError> {
        let path = self.csv_path(instrument);
        let bars = self.read_bars(&path)?;
        debug!(path = %path.display(), bars = bars.len(), "loaded price history");
        Series::new(bars)
    }
}

struct Columns {
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, FxError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
        };
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| FxError::Data {
                reason: format!("missing {} column", names[0]),
            })
        };

        Ok(Columns {
            time: require(&["time", "timestamp", "date", "datetime"])?,
            open: require(&["open"])?,
            high: require(&["high"])?,
            low: require(&["low"])?,
            close: require(&["close"])?,
            volume: find(&["volume"]),
        })
    }
}

fn field<'r>(
    index: usize,
    record: &'r StringRecord,
    col: usize,
    name: &str,
) -> Result<&'r str, FxError> {
    record.get(col).ok_or_else(|| FxError::MalformedSeries {
        index,
        reason: format!("missing {name} value"),
    })
}

fn number(index: usize, record: &StringRecord, col: usize, name: &str) -> Result<f64, FxError> {
    let raw = field(index, record, col, name)?;
    raw.parse::<f64>().map_err(|_| FxError::MalformedSeries {
        index,
        reason: format!("invalid {name} value '{raw}'"),
    })
}
