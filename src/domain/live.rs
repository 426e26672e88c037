//! Live evaluation of the latest bar.
//!
//! A caller fetches a fresh series once per bar, hands it to
//! [`LiveSession::evaluate`], and submits the returned [`OrderIntent`] through
//! its own execution component. The session never performs I/O; the
//! last-processed timestamp is plain state the caller persists between runs.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime, Timelike};
use tracing::{debug, warn};

use crate::domain::error::FxError;
use crate::domain::indicator_set::IndicatorFrame;
use crate::domain::order_intent::OrderIntent;
use crate::domain::position::Side;
use crate::domain::series::Series;
use crate::domain::signal::Signal;
use crate::domain::strategy::StrategyConfig;

const STATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub enum LiveDecision {
    /// The latest bar was already processed by an earlier call.
    Skipped { timestamp: NaiveDateTime },
    NoSignal { timestamp: NaiveDateTime },
    Order {
        timestamp: NaiveDateTime,
        intent: OrderIntent,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveSession {
    pub last_processed: Option<NaiveDateTime>,
}

impl LiveSession {
    pub fn new(last_processed: Option<NaiveDateTime>) -> Self {
        LiveSession { last_processed }
    }

    /// Restores a session from its persisted form. Blank input means no bar
    /// has been processed yet.
    pub fn from_state(text: &str) -> Result<Self, FxError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(LiveSession::default());
        }
        let ts = NaiveDateTime::parse_from_str(text, STATE_FORMAT).map_err(|e| FxError::Data {
            reason: format!("invalid session state '{text}': {e}"),
        })?;
        Ok(LiveSession::new(Some(ts)))
    }

    pub fn to_state(&self) -> String {
        self.last_processed
            .map(|ts| ts.format(STATE_FORMAT).to_string())
            .unwrap_or_default()
    }

    /// Evaluates the configured rule on the last bar of `series`.
    ///
    /// Fails with `InsufficientHistory` when the last bar has no full
    /// indicator set. Otherwise the bar is recorded as processed.
    pub fn evaluate(
        &mut self,
        series: &Series,
        strategy: &StrategyConfig,
    ) -> Result<LiveDecision, FxError> {
        let minimum = strategy.params.minimum_bars();
        let Some(last_bar) = series.last() else {
            return Err(FxError::InsufficientHistory { bars: 0, minimum });
        };
        let timestamp = last_bar.timestamp;

        if strategy.duplicate_bar_guard
            && self.last_processed.is_some_and(|seen| timestamp <= seen)
        {
            warn!(%timestamp, "bar already processed, skipping");
            return Ok(LiveDecision::Skipped { timestamp });
        }

        let frame = IndicatorFrame::compute(series, strategy.params);
        let last = series.len() - 1;
        let current = frame.row(last).ok_or(FxError::InsufficientHistory {
            bars: series.len(),
            minimum,
        })?;
        let previous = last.checked_sub(1).and_then(|i| frame.row(i));

        let rule = strategy.build_rule();
        let signal = rule.evaluate(&current, previous.as_ref());
        self.last_processed = Some(timestamp);
        debug!(%timestamp, ?signal, rule = rule.name(), "evaluated latest bar");

        let side = match signal {
            Signal::EnterLong => Side::Long,
            Signal::EnterShort => Side::Short,
            Signal::None => return Ok(LiveDecision::NoSignal { timestamp }),
        };

        let entry = current.bar.close;
        let intent = if strategy.uses_atr_stops() {
            OrderIntent::with_atr_stop(
                side,
                strategy.units,
                entry,
                current.indicators.atr,
                strategy.atr_stop_multiplier,
            )
        } else {
            OrderIntent::with_fixed_distances(
                side,
                strategy.units,
                entry,
                strategy.simulation.take_profit,
                strategy.simulation.stop_loss,
            )
        };
        Ok(LiveDecision::Order { timestamp, intent })
    }
}

/// Candle sizes, named the way FX data vendors name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    S5,
    S10,
    S15,
    S30,
    M1,
    M2,
    M4,
    M5,
    M10,
    M15,
    M30,
    H1,
    H2,
    H3,
    H4,
    H6,
    H8,
    H12,
    D,
}

impl Granularity {
    pub fn seconds(&self) -> i64 {
        match self {
            Granularity::S5 => 5,
            Granularity::S10 => 10,
            Granularity::S15 => 15,
            Granularity::S30 => 30,
            Granularity::M1 => 60,
            Granularity::M2 => 120,
            Granularity::M4 => 240,
            Granularity::M5 => 300,
            Granularity::M10 => 600,
            Granularity::M15 => 900,
            Granularity::M30 => 1800,
            Granularity::H1 => 3600,
            Granularity::H2 => 7200,
            Granularity::H3 => 10_800,
            Granularity::H4 => 14_400,
            Granularity::H6 => 21_600,
            Granularity::H8 => 28_800,
            Granularity::H12 => 43_200,
            Granularity::D => 86_400,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::S5 => "S5",
            Granularity::S10 => "S10",
            Granularity::S15 => "S15",
            Granularity::S30 => "S30",
            Granularity::M1 => "M1",
            Granularity::M2 => "M2",
            Granularity::M4 => "M4",
            Granularity::M5 => "M5",
            Granularity::M10 => "M10",
            Granularity::M15 => "M15",
            Granularity::M30 => "M30",
            Granularity::H1 => "H1",
            Granularity::H2 => "H2",
            Granularity::H3 => "H3",
            Granularity::H4 => "H4",
            Granularity::H6 => "H6",
            Granularity::H8 => "H8",
            Granularity::H12 => "H12",
            Granularity::D => "D",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let g = match s.trim().to_uppercase().as_str() {
            "S5" => Granularity::S5,
            "S10" => Granularity::S10,
            "S15" => Granularity::S15,
            "S30" => Granularity::S30,
            "M1" => Granularity::M1,
            "M2" => Granularity::M2,
            "M4" => Granularity::M4,
            "M5" => Granularity::M5,
            "M10" => Granularity::M10,
            "M15" => Granularity::M15,
            "M30" => Granularity::M30,
            "H1" => Granularity::H1,
            "H2" => Granularity::H2,
            "H3" => Granularity::H3,
            "H4" => Granularity::H4,
            "H6" => Granularity::H6,
            "H8" => Granularity::H8,
            "H12" => Granularity::H12,
            "D" => Granularity::D,
            other => return Err(format!("unknown granularity '{other}'")),
        };
        Ok(g)
    }
}

/// Start of the candle after the one containing `now`. Boundaries are
/// aligned to the Unix epoch in UTC, so hourly candles start on the hour and
/// daily candles at midnight.
pub fn next_bar_boundary(now: NaiveDateTime, granularity: Granularity) -> NaiveDateTime {
    let step = granularity.seconds();
    let into_bar = now.and_utc().timestamp().rem_euclid(step);
    let floor = now - Duration::seconds(into_bar) - Duration::nanoseconds(now.nanosecond() as i64);
    floor + Duration::seconds(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;
    use crate::domain::indicator_set::IndicatorParams;
    use crate::domain::ohlcv::Bar;
    use crate::domain::signal::RuleKind;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 8)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn small_strategy() -> StrategyConfig {
        StrategyConfig {
            rule: RuleKind::MeanReversion,
            params: IndicatorParams {
                short_ma: 2,
                long_ma: 4,
                ema: 3,
                rsi: 3,
                bb_period: 4,
                bb_stddev_mult_x100: 100,
                atr: 3,
                volatility: 3,
                ewma_lambda_x100: 94,
            },
            ..StrategyConfig::default()
        }
    }

    /// Flat, then a sharp fall: RSI 0 and a close under the lower band.
    fn selloff() -> Series {
        Series::new(make_bars(&[1.1000, 1.1000, 1.1000, 1.1000, 1.0990, 1.0970, 1.0900])).unwrap()
    }

    fn flat(n: usize) -> Series {
        Series::new(make_bars(&vec![1.1; n])).unwrap()
    }

    #[test]
    fn selloff_produces_long_order() {
        let mut session = LiveSession::default();
        let series = selloff();
        let decision = session.evaluate(&series, &small_strategy()).unwrap();
        let LiveDecision::Order { timestamp, intent } = decision else {
            panic!("expected an order, got {decision:?}");
        };
        assert_eq!(timestamp, series.last().unwrap().timestamp);
        assert_eq!(intent.side, Side::Long);
        assert_eq!(intent.units, 1000);
        assert_eq!(intent.entry, 1.0900);
        assert!(intent.stop_price < intent.entry);
        assert!(intent.target_price > intent.entry);
        assert_eq!(session.last_processed, Some(timestamp));
    }

    #[test]
    fn fixed_distances_when_atr_disabled() {
        let strategy = StrategyConfig {
            atr_stop_multiplier: 0.0,
            ..small_strategy()
        };
        let decision = LiveSession::default().evaluate(&selloff(), &strategy).unwrap();
        let LiveDecision::Order { intent, .. } = decision else {
            panic!("expected an order");
        };
        assert!((intent.stop_price - 1.0880).abs() < 1e-9);
        assert!((intent.target_price - 1.0930).abs() < 1e-9);
    }

    #[test]
    fn duplicate_bar_is_skipped() {
        let mut session = LiveSession::default();
        let strategy = small_strategy();
        let series = flat(8);
        assert!(matches!(
            session.evaluate(&series, &strategy).unwrap(),
            LiveDecision::NoSignal { .. }
        ));
        assert!(matches!(
            session.evaluate(&series, &strategy).unwrap(),
            LiveDecision::Skipped { .. }
        ));
    }

    #[test]
    fn guard_off_reevaluates() {
        let strategy = StrategyConfig {
            duplicate_bar_guard: false,
            ..small_strategy()
        };
        let mut session = LiveSession::default();
        let series = flat(8);
        session.evaluate(&series, &strategy).unwrap();
        assert!(matches!(
            session.evaluate(&series, &strategy).unwrap(),
            LiveDecision::NoSignal { .. }
        ));
    }

    #[test]
    fn newer_bar_is_evaluated() {
        let strategy = small_strategy();
        let mut session = LiveSession::default();
        session.evaluate(&flat(8), &strategy).unwrap();
        assert!(matches!(
            session.evaluate(&flat(9), &strategy).unwrap(),
            LiveDecision::NoSignal { .. }
        ));
    }

    #[test]
    fn short_series_is_insufficient_history() {
        let err = LiveSession::default()
            .evaluate(&flat(3), &small_strategy())
            .unwrap_err();
        assert!(matches!(
            err,
            FxError::InsufficientHistory { bars: 3, minimum: 4 }
        ));
    }

    #[test]
    fn empty_series_is_insufficient_history() {
        let empty = Series::new(Vec::<Bar>::new()).unwrap();
        let err = LiveSession::default()
            .evaluate(&empty, &small_strategy())
            .unwrap_err();
        assert!(matches!(err, FxError::InsufficientHistory { bars: 0, .. }));
    }

    #[test]
    fn state_round_trip() {
        let session = LiveSession::new(Some(at(13, 0, 0)));
        assert_eq!(session.to_state(), "2024-03-08T13:00:00");
        assert_eq!(LiveSession::from_state(&session.to_state()).unwrap(), session);
        assert_eq!(LiveSession::from_state("  \n").unwrap(), LiveSession::default());
        assert!(LiveSession::from_state("yesterday").is_err());
    }

    #[test]
    fn next_hour_boundary() {
        assert_eq!(next_bar_boundary(at(13, 27, 41), Granularity::H1), at(14, 0, 0));
        assert_eq!(next_bar_boundary(at(13, 0, 0), Granularity::H1), at(14, 0, 0));
    }

    #[test]
    fn sub_minute_and_multi_hour_boundaries() {
        assert_eq!(next_bar_boundary(at(9, 0, 7), Granularity::S5), at(9, 0, 10));
        assert_eq!(next_bar_boundary(at(9, 14, 59), Granularity::M15), at(9, 15, 0));
        assert_eq!(next_bar_boundary(at(13, 30, 0), Granularity::H4), at(16, 0, 0));
    }

    #[test]
    fn daily_boundary_is_next_midnight() {
        let next = next_bar_boundary(at(23, 59, 59), Granularity::D);
        assert_eq!(
            next,
            NaiveDate::from_ymd_opt(2024, 3, 9)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn subsecond_time_is_dropped() {
        let now = at(13, 59, 59) + Duration::milliseconds(750);
        assert_eq!(next_bar_boundary(now, Granularity::H1), at(14, 0, 0));
    }

    #[test]
    fn granularity_parses() {
        assert_eq!("h1".parse::<Granularity>(), Ok(Granularity::H1));
        assert_eq!("M15".parse::<Granularity>(), Ok(Granularity::M15));
        assert_eq!(Granularity::S30.to_string(), "S30");
        assert!("W".parse::<Granularity>().is_err());
    }
}
