//! Strategy configuration: one parameterized run description instead of a
//! copy of the walk per variant.

use std::fmt;

use crate::domain::indicator_set::IndicatorParams;
use crate::domain::report::{DEFAULT_PIP_FACTOR, ReportingMode};
use crate::domain::signal::{
    CrossoverRule, MeanReversionRule, RuleKind, SignalRule, TrendFilterRule,
};
use crate::domain::simulator::SimulationConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub name: String,
    pub instrument: String,
    pub rule: RuleKind,
    pub params: IndicatorParams,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub simulation: SimulationConfig,
    pub reporting: ReportingMode,
    pub duplicate_bar_guard: bool,
    pub units: u64,
    /// Stop distance in ATRs for live order intents; 0 uses the fixed
    /// take-profit/stop-loss distances instead.
    pub atr_stop_multiplier: f64,
    pub trend: TrendFilterRule,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            name: "Unnamed".to_string(),
            instrument: "EUR_USD".to_string(),
            rule: RuleKind::MeanReversion,
            params: IndicatorParams::default(),
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            simulation: SimulationConfig::default(),
            reporting: ReportingMode::Pips {
                pip_factor: DEFAULT_PIP_FACTOR,
            },
            duplicate_bar_guard: true,
            units: 1000,
            atr_stop_multiplier: 1.5,
            trend: TrendFilterRule::default(),
        }
    }
}

impl StrategyConfig {
    pub fn build_rule(&self) -> Box<dyn SignalRule> {
        match self.rule {
            RuleKind::Crossover => Box::new(CrossoverRule),
            RuleKind::MeanReversion => Box::new(MeanReversionRule {
                oversold: self.rsi_oversold,
                overbought: self.rsi_overbought,
            }),
        }
    }

    pub fn uses_atr_stops(&self) -> bool {
        self.atr_stop_multiplier > 0.0
    }
}

impl fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.params;
        writeln!(f, "Strategy:      {}", self.name)?;
        writeln!(f, "Instrument:    {}", self.instrument)?;
        writeln!(f, "Rule:          {}", self.rule)?;
        writeln!(
            f,
            "Indicators:    SMA({}) SMA({}) EMA({}) RSI({}) BB({}, {:.2}) ATR({}) VOL({}) EWMA({:.2})",
            p.short_ma,
            p.long_ma,
            p.ema,
            p.rsi,
            p.bb_period,
            p.bb_stddev_mult_x100 as f64 / 100.0,
            p.atr,
            p.volatility,
            p.ewma_lambda_x100 as f64 / 100.0,
        )?;
        writeln!(
            f,
            "RSI bounds:    {} / {}",
            self.rsi_oversold, self.rsi_overbought
        )?;
        writeln!(
            f,
            "Take profit:   {}  Stop loss: {}",
            self.simulation.take_profit, self.simulation.stop_loss
        )?;
        match self.reporting {
            ReportingMode::Pips { pip_factor } => {
                writeln!(f, "Reporting:     pips (x{pip_factor})")?
            }
            ReportingMode::Compounding => writeln!(
                f,
                "Reporting:     compounding (buy rsi > {}, sell rsi < {})",
                self.trend.buy_rsi, self.trend.sell_rsi
            )?,
        }
        writeln!(f, "Bar guard:     {}", self.duplicate_bar_guard)?;
        write!(
            f,
            "Orders:        {} units, ATR stop x{}",
            self.units, self.atr_stop_multiplier
        )
    }
}
