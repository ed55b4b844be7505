use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::schedule::{FeeRates, FeeSchedule};
use crate::common::errors::{Result, TrackerError};
use crate::config::types::TreasuryWallets;

/// Fixed total supply used to derive market cap from unit price
///
/// Assumes every token has exactly this supply; it is not a general
/// market-cap formula.
pub const TOTAL_SUPPLY: Decimal = dec!(1000000000);

/// Rates applied while a token trades on its bonding curve
pub const BONDING_CURVE_RATES: FeeRates =
    FeeRates::new(dec!(0.00300), dec!(0.00950), dec!(0.00000), dec!(0.01250));

/// Tier label reported for bonding-phase trades
pub const BONDING_CURVE_LABEL: &str = "Bonding Curve";

/// Market cap in the base unit for a given unit price
pub fn market_cap_from_price(price: Decimal) -> Result<Decimal> {
    price
        .checked_mul(TOTAL_SUPPLY)
        .ok_or_else(|| TrackerError::Validation(format!("market cap overflow for price {}", price)))
}

/// Which fee-rate source applies to a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradePhase {
    /// Pre-pool trading with a flat rate set
    Bonding,
    /// Pooled trading with tiered rates by market cap
    Canonical,
}

impl std::fmt::Display for TradePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradePhase::Bonding => write!(f, "bonding"),
            TradePhase::Canonical => write!(f, "canonical"),
        }
    }
}

impl FromStr for TradePhase {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bonding" => Ok(TradePhase::Bonding),
            "canonical" => Ok(TradePhase::Canonical),
            other => Err(TrackerError::Validation(format!(
                "unknown trade phase '{}'",
                other
            ))),
        }
    }
}

/// Party receiving a share of the fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeParty {
    Creator,
    Protocol,
    Lp,
}

/// Amount owed to one treasury wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeAllocation {
    pub party: FeeParty,
    pub wallet: String,
    pub amount: Decimal,
}

/// Fee amounts for a single trade
///
/// Amounts are unrounded; callers pick display precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeBreakdown {
    pub trade_value: Decimal,
    pub creator: Decimal,
    pub protocol: Decimal,
    pub lp: Decimal,
    pub total: Decimal,
    /// Blended rate as a fraction
    pub total_rate: Decimal,
    /// "Bonding Curve" or the tier's range label
    pub tier: String,
    pub phase: TradePhase,
    /// Only set for canonical-phase trades
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Decimal>,
}

impl FeeBreakdown {
    fn from_rates(
        trade_value: Decimal,
        rates: &FeeRates,
        tier: &str,
        phase: TradePhase,
        market_cap: Option<Decimal>,
    ) -> Self {
        Self {
            trade_value,
            creator: trade_value * rates.creator,
            protocol: trade_value * rates.protocol,
            lp: trade_value * rates.lp,
            total: trade_value * rates.total,
            total_rate: rates.total,
            tier: tier.to_string(),
            phase,
            market_cap,
        }
    }

    /// Split the fee across the configured treasury wallets
    ///
    /// Parties with a zero share are omitted.
    pub fn allocations(&self, wallets: &TreasuryWallets) -> Vec<FeeAllocation> {
        [
            (FeeParty::Creator, &wallets.creator, self.creator),
            (FeeParty::Protocol, &wallets.protocol, self.protocol),
            (FeeParty::Lp, &wallets.lp, self.lp),
        ]
        .into_iter()
        .filter(|(_, _, amount)| !amount.is_zero())
        .map(|(party, wallet, amount)| FeeAllocation {
            party,
            wallet: wallet.clone(),
            amount,
        })
        .collect()
    }
}

/// Computes deterministic fee breakdowns
///
/// Pure: no network or persistence access.
#[derive(Debug, Clone, Default)]
pub struct FeeCalculator {
    schedule: FeeSchedule,
}

impl FeeCalculator {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    /// Fee breakdown for trading `amount` units at `unit_price`
    ///
    /// # Errors
    /// `Validation` for negative inputs or arithmetic overflow.
    pub fn breakdown(
        &self,
        amount: Decimal,
        unit_price: Decimal,
        phase: TradePhase,
    ) -> Result<FeeBreakdown> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(TrackerError::Validation(format!(
                "trade amount must be non-negative, got {}",
                amount
            )));
        }
        if unit_price.is_sign_negative() && !unit_price.is_zero() {
            return Err(TrackerError::Validation(format!(
                "unit price must be non-negative, got {}",
                unit_price
            )));
        }

        let trade_value = amount.checked_mul(unit_price).ok_or_else(|| {
            TrackerError::Validation(format!(
                "trade value overflow for {} x {}",
                amount, unit_price
            ))
        })?;

        match phase {
            TradePhase::Bonding => Ok(FeeBreakdown::from_rates(
                trade_value,
                &BONDING_CURVE_RATES,
                BONDING_CURVE_LABEL,
                phase,
                None,
            )),
            TradePhase::Canonical => {
                let market_cap = market_cap_from_price(unit_price)?;
                let tier = self.schedule.resolve_tier(market_cap);
                Ok(FeeBreakdown::from_rates(
                    trade_value,
                    &tier.rates,
                    tier.range,
                    phase,
                    Some(market_cap),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::schedule::CANONICAL_FEE_TIERS;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bonding_fee_scenario() {
        let calc = FeeCalculator::default();
        let fees = calc
            .breakdown(dec!(100), dec!(0.001), TradePhase::Bonding)
            .unwrap();

        assert_eq!(fees.trade_value, dec!(0.1));
        assert_eq!(fees.total, dec!(0.00125));
        assert_eq!(fees.creator, dec!(0.0003));
        assert_eq!(fees.protocol, dec!(0.00095));
        assert_eq!(fees.lp, Decimal::ZERO);
        assert_eq!(fees.tier, BONDING_CURVE_LABEL);
        assert_eq!(fees.market_cap, None);
    }

    #[test]
    fn test_bonding_ignores_market_cap() {
        let calc = FeeCalculator::default();
        for price in [dec!(0.0000001), dec!(0.001), dec!(5)] {
            let fees = calc.breakdown(dec!(10), price, TradePhase::Bonding).unwrap();
            assert_eq!(fees.total_rate, dec!(0.01250));
            assert_eq!(fees.total, fees.trade_value * dec!(0.0125));
        }
    }

    #[test]
    fn test_canonical_uses_market_cap_tier() {
        let calc = FeeCalculator::default();
        // 0.000001 SOL * 1B supply = 1000 SOL market cap
        let fees = calc
            .breakdown(dec!(1000), dec!(0.000001), TradePhase::Canonical)
            .unwrap();

        assert_eq!(fees.market_cap, Some(dec!(1000)));
        assert_eq!(fees.tier, "420–1470 SOL");
        assert_eq!(fees.total_rate, dec!(0.01200));
        assert_eq!(fees.total, dec!(0.001) * dec!(0.012));
    }

    #[test]
    fn test_canonical_parts_sum_to_total_for_every_tier() {
        let calc = FeeCalculator::default();
        for tier in CANONICAL_FEE_TIERS.iter() {
            let market_cap = tier.upper_bound.unwrap_or(dec!(500000));
            let price = market_cap / TOTAL_SUPPLY;
            let fees = calc.breakdown(dec!(12345), price, TradePhase::Canonical).unwrap();
            assert_eq!(fees.tier, tier.range);
            assert_eq!(fees.creator + fees.protocol + fees.lp, fees.total);
        }
    }

    #[test]
    fn test_rejects_negative_inputs() {
        let calc = FeeCalculator::default();
        assert!(matches!(
            calc.breakdown(dec!(-1), dec!(0.1), TradePhase::Bonding),
            Err(TrackerError::Validation(_))
        ));
        assert!(matches!(
            calc.breakdown(dec!(1), dec!(-0.1), TradePhase::Canonical),
            Err(TrackerError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_trade_has_zero_fees() {
        let fees = FeeCalculator::default()
            .breakdown(Decimal::ZERO, dec!(0.5), TradePhase::Canonical)
            .unwrap();
        assert!(fees.total.is_zero());
    }

    #[test]
    fn test_phase_parsing() {
        assert_eq!("Bonding".parse::<TradePhase>().unwrap(), TradePhase::Bonding);
        assert_eq!(" canonical ".parse::<TradePhase>().unwrap(), TradePhase::Canonical);
        assert!("amm".parse::<TradePhase>().is_err());
    }

    #[test]
    fn test_allocations_skip_zero_shares() {
        let wallets = TreasuryWallets {
            protocol: "proto_wallet".to_string(),
            creator: "creator_wallet".to_string(),
            lp: "lp_wallet".to_string(),
        };
        let fees = FeeCalculator::default()
            .breakdown(dec!(100), dec!(0.001), TradePhase::Bonding)
            .unwrap();

        let allocations = fees.allocations(&wallets);
        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].party, FeeParty::Creator);
        assert_eq!(allocations[0].wallet, "creator_wallet");
        assert_eq!(allocations[1].amount, dec!(0.00095));
    }
}
