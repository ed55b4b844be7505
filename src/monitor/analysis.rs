//! Heuristic sniper-activity read of a token snapshot
//!
//! Every threshold is a strict comparison: a value sitting exactly on a
//! threshold does not raise the flag.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::common::types::TokenSnapshot;

/// 24h volume above which a token shows a volume spike
pub const VOLUME_SPIKE_USD: Decimal = dec!(100000);
/// Absolute 24h change (percent) above which a token counts as volatile
pub const VOLATILITY_PCT: Decimal = dec!(50);
/// Market caps below this are micro caps
pub const MICRO_CAP_USD: Decimal = dec!(100000);

pub const HIGH_VOLUME_USD: Decimal = dec!(500000);
pub const RAPID_CHANGE_PCT: Decimal = dec!(100);
pub const LOW_MARKET_CAP_USD: Decimal = dec!(50000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Graded by how many sniper indicators are raised
    fn from_indicator_count(count: usize) -> Self {
        match count {
            0 => RiskLevel::Low,
            1 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCapRange {
    Micro,
    Small,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SniperIndicators {
    pub high_volume: bool,
    pub rapid_price_change: bool,
    pub low_market_cap: bool,
}

impl SniperIndicators {
    pub fn raised(&self) -> usize {
        [self.high_volume, self.rapid_price_change, self.low_market_cap]
            .iter()
            .filter(|flag| **flag)
            .count()
    }
}

/// Result of an `analyze` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SniperAnalysis {
    pub token: String,
    pub risk_level: RiskLevel,
    pub volume_spike: bool,
    pub price_volatility: bool,
    pub market_cap_range: MarketCapRange,
    pub sniper_indicators: SniperIndicators,
}

impl SniperAnalysis {
    pub fn from_snapshot(snapshot: &TokenSnapshot) -> Self {
        let change = snapshot.change_24h.abs();
        let sniper_indicators = SniperIndicators {
            high_volume: snapshot.volume_24h > HIGH_VOLUME_USD,
            rapid_price_change: change > RAPID_CHANGE_PCT,
            low_market_cap: snapshot.market_cap < LOW_MARKET_CAP_USD,
        };

        Self {
            token: snapshot.address.clone(),
            risk_level: RiskLevel::from_indicator_count(sniper_indicators.raised()),
            volume_spike: snapshot.volume_24h > VOLUME_SPIKE_USD,
            price_volatility: change > VOLATILITY_PCT,
            market_cap_range: if snapshot.market_cap < MICRO_CAP_USD {
                MarketCapRange::Micro
            } else {
                MarketCapRange::Small
            },
            sniper_indicators,
        }
    }
}
