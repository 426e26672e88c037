//! CSV report adapter implementing ReportPort.
//!
//! The snapshot holds one row per input bar: OHLCV, every indicator column
//! (blank while its window is still filling) and the simulator's position
//! trace (blank on bars the walk never visited).

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::error::FxError;
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator_set::IndicatorFrame;
use crate::domain::position::{Side, TradeRecord};
use crate::domain::simulator::BarTrace;
use crate::ports::report_port::ReportPort;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Serialize)]
struct SnapshotRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    short_ma: Option<f64>,
    long_ma: Option<f64>,
    ema: Option<f64>,
    rsi: Option<f64>,
    bb_mid: Option<f64>,
    bb_upper: Option<f64>,
    bb_lower: Option<f64>,
    atr: Option<f64>,
    rolling_std: Option<f64>,
    annualized_vol: Option<f64>,
    ewma_vol: Option<f64>,
    signal: Option<&'static str>,
    position: Option<&'static str>,
    entry_price: Option<f64>,
    exit_price: Option<f64>,
    profit: Option<f64>,
}

fn position_label(side: Option<Side>) -> &'static str {
    match side {
        Some(Side::Long) => "long",
        Some(Side::Short) => "short",
        None => "flat",
    }
}

fn create_writer(output_path: &Path) -> Result<csv::Writer<File>, FxError> {
    csv::Writer::from_path(output_path).map_err(|e| FxError::Report {
        reason: format!("failed to create {}: {}", output_path.display(), e),
    })
}

fn write_error(output_path: &Path, e: impl std::fmt::Display) -> FxError {
    FxError::Report {
        reason: format!("failed to write {}: {}", output_path.display(), e),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_snapshot(
        &self,
        frame: &IndicatorFrame,
        trace: &[BarTrace],
        output_path: &Path,
    ) -> Result<(), FxError> {
        let params = frame.params;
        let column = |t: IndicatorType, i: usize| frame.column(&t).and_then(|s| s.simple_at(i));
        let bands = |i: usize| {
            frame
                .column(&params.bollinger_type())
                .and_then(|s| s.bands_at(i))
        };
        let by_index: HashMap<usize, &BarTrace> = trace.iter().map(|t| (t.index, t)).collect();

        let mut writer = create_writer(output_path)?;
        for (i, bar) in frame.bars().iter().enumerate() {
            let (bb_upper, bb_mid, bb_lower) = match bands(i) {
                Some((u, m, l)) => (Some(u), Some(m), Some(l)),
                None => (None, None, None),
            };
            let step = by_index.get(&i);

            let row = SnapshotRow {
                time: bar.timestamp.format(TIME_FORMAT).to_string(),
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                short_ma: column(params.short_ma_type(), i),
                long_ma: column(params.long_ma_type(), i),
                ema: column(IndicatorType::Ema(params.ema), i),
                rsi: column(IndicatorType::Rsi(params.rsi), i),
                bb_mid,
                bb_upper,
                bb_lower,
                atr: column(IndicatorType::Atr(params.atr), i),
                rolling_std: column(IndicatorType::RollingVol(params.volatility), i),
                annualized_vol: column(IndicatorType::AnnualizedVol(params.volatility), i),
                ewma_vol: column(params.ewma_type(), i),
                signal: step.map(|t| t.signal.as_str()),
                position: step.map(|t| position_label(t.position)),
                entry_price: step.and_then(|t| t.entry_price),
                exit_price: step.and_then(|t| t.exit_price),
                profit: step.and_then(|t| t.profit),
            };
            writer
                .serialize(row)
                .map_err(|e| write_error(output_path, e))?;
        }
        writer.flush().map_err(|e| write_error(output_path, e))?;
        Ok(())
    }

    fn write_trades(&self, trades: &[TradeRecord], output_path: &Path) -> Result<(), FxError> {
        let mut writer = create_writer(output_path)?;
        if trades.is_empty() {
            writer
                .write_record([
                    "side",
                    "entry_time",
                    "exit_time",
                    "entry_price",
                    "exit_price",
                    "profit",
                    "reason",
                ])
                .map_err(|e| write_error(output_path, e))?;
        }
        for trade in trades {
            writer
                .serialize(trade)
                .map_err(|e| write_error(output_path, e))?;
        }
        writer.flush().map_err(|e| write_error(output_path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator_set::IndicatorParams;
    use crate::domain::ohlcv::Bar;
    use crate::domain::position::ExitReason;
    use crate::domain::series::Series;
    use crate::domain::signal::Signal;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use std::fs;
    use tempfile::TempDir;

    fn ts(h: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(h)
    }

    fn params() -> IndicatorParams {
        IndicatorParams {
            short_ma: 2,
            long_ma: 3,
            ema: 2,
            rsi: 2,
            bb_period: 3,
            bb_stddev_mult_x100: 200,
            atr: 2,
            volatility: 2,
            ewma_lambda_x100: 94,
        }
    }

    fn frame() -> IndicatorFrame {
        let bars = [1.10, 1.11, 1.12, 1.11, 1.13]
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: ts(i as i64),
                open: c,
                high: c + 0.001,
                low: c - 0.001,
                close: c,
                volume: 100.0,
            })
            .collect();
        IndicatorFrame::compute(&Series::new(bars).unwrap(), params())
    }

    fn read_rows(path: &Path) -> (csv::StringRecord, Vec<csv::StringRecord>) {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        let rows = rdr.records().map(|r| r.unwrap()).collect();
        (headers, rows)
    }

    #[test]
    fn snapshot_has_row_per_bar_with_blank_warmup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.csv");
        CsvReportAdapter::new()
            .write_snapshot(&frame(), &[], &path)
            .unwrap();

        let (headers, rows) = read_rows(&path);
        assert_eq!(rows.len(), 5);
        assert_eq!(&headers[0], "time");
        let short_ma = headers.iter().position(|h| h == "short_ma").unwrap();
        let long_ma = headers.iter().position(|h| h == "long_ma").unwrap();
        assert_eq!(&rows[0][short_ma], "");
        assert!(!rows[1][short_ma].is_empty());
        assert_eq!(&rows[1][long_ma], "");
        assert!(!rows[2][long_ma].is_empty());
        assert_eq!(&rows[0][0], "2024-01-01 00:00:00");
    }

    #[test]
    fn snapshot_carries_trace() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.csv");
        let trace = vec![
            BarTrace {
                index: 3,
                timestamp: ts(3),
                signal: Signal::EnterLong,
                position: Some(Side::Long),
                entry_price: Some(1.11),
                exit_price: None,
                profit: None,
            },
            BarTrace {
                index: 4,
                timestamp: ts(4),
                signal: Signal::None,
                position: None,
                entry_price: None,
                exit_price: Some(1.113),
                profit: Some(0.003),
            },
        ];
        CsvReportAdapter::new()
            .write_snapshot(&frame(), &trace, &path)
            .unwrap();

        let (headers, rows) = read_rows(&path);
        let col = |name: &str| headers.iter().position(|h| h == name).unwrap();
        assert_eq!(&rows[2][col("position")], "");
        assert_eq!(&rows[3][col("signal")], "enter_long");
        assert_eq!(&rows[3][col("position")], "long");
        assert_eq!(&rows[3][col("entry_price")], "1.11");
        assert_eq!(&rows[4][col("position")], "flat");
        assert_eq!(&rows[4][col("profit")], "0.003");
    }

    #[test]
    fn trades_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        let trades = vec![TradeRecord {
            side: Side::Short,
            entry_time: ts(1),
            exit_time: ts(4),
            entry_price: 1.1,
            exit_price: 1.097,
            profit: 0.003,
            reason: ExitReason::TakeProfit,
        }];
        CsvReportAdapter::new().write_trades(&trades, &path).unwrap();

        let (headers, rows) = read_rows(&path);
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["side", "entry_time", "exit_time", "entry_price", "exit_price", "profit", "reason"]
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "short");
        assert_eq!(&rows[0][1], "2024-01-01T01:00:00");
        assert_eq!(&rows[0][6], "take_profit");
    }

    #[test]
    fn empty_trades_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        CsvReportAdapter::new().write_trades(&[], &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("side,"));
    }

    #[test]
    fn unwritable_path_is_report_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("trades.csv");
        let err = CsvReportAdapter::new().write_trades(&[], &path).unwrap_err();
        assert!(matches!(err, FxError::Report { .. }));
    }
}
