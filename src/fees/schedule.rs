//! Tiered fee schedule keyed by market capitalization
//!
//! Rates are fractions (`0.00300` = 0.300%), never percentages. Tier upper
//! bounds are inclusive: a market cap equal to a tier's bound belongs to
//! that tier.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::common::errors::{Result, TrackerError};

/// Per-party fee rates, as fractions of trade value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeRates {
    pub creator: Decimal,
    pub protocol: Decimal,
    pub lp: Decimal,
    pub total: Decimal,
}

impl FeeRates {
    pub const fn new(creator: Decimal, protocol: Decimal, lp: Decimal, total: Decimal) -> Self {
        Self {
            creator,
            protocol,
            lp,
            total,
        }
    }

    /// Whether the party rates add up to the blended total
    pub fn is_balanced(&self) -> bool {
        self.creator + self.protocol + self.lp == self.total
    }

    fn has_negative(&self) -> bool {
        [self.creator, self.protocol, self.lp, self.total]
            .iter()
            .any(|r| r.is_sign_negative() && !r.is_zero())
    }
}

/// A contiguous market-cap band with fixed rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeTier {
    /// Inclusive upper edge; `None` for the final, unbounded tier
    pub upper_bound: Option<Decimal>,
    pub rates: FeeRates,
    /// Human-readable band, e.g. "420–1470 SOL"
    pub range: &'static str,
}

impl FeeTier {
    /// Whether `market_cap` is at or below this tier's upper edge
    pub fn covers(&self, market_cap: Decimal) -> bool {
        match self.upper_bound {
            Some(bound) => market_cap <= bound,
            None => true,
        }
    }
}

const fn tier(
    upper_bound: Decimal,
    creator: Decimal,
    protocol: Decimal,
    lp: Decimal,
    total: Decimal,
    range: &'static str,
) -> FeeTier {
    FeeTier {
        upper_bound: Some(upper_bound),
        rates: FeeRates::new(creator, protocol, lp, total),
        range,
    }
}

/// Canonical-phase tiers by market cap in the base unit (SOL)
///
/// The first band has a 0.020% LP share; every other band holds protocol
/// at 0.050% and LP at 0.200% while the creator share steps down.
pub const CANONICAL_FEE_TIERS: [FeeTier; 25] = [
    tier(dec!(420), dec!(0.00300), dec!(0.00930), dec!(0.00020), dec!(0.01250), "0–420 SOL"),
    tier(dec!(1470), dec!(0.00950), dec!(0.00050), dec!(0.00200), dec!(0.01200), "420–1470 SOL"),
    tier(dec!(2460), dec!(0.00900), dec!(0.00050), dec!(0.00200), dec!(0.01150), "1470–2460 SOL"),
    tier(dec!(3440), dec!(0.00850), dec!(0.00050), dec!(0.00200), dec!(0.01100), "2460–3440 SOL"),
    tier(dec!(4420), dec!(0.00800), dec!(0.00050), dec!(0.00200), dec!(0.01050), "3440–4420 SOL"),
    tier(dec!(9820), dec!(0.00750), dec!(0.00050), dec!(0.00200), dec!(0.01000), "4420–9820 SOL"),
    tier(dec!(14740), dec!(0.00700), dec!(0.00050), dec!(0.00200), dec!(0.00950), "9820–14740 SOL"),
    tier(dec!(19650), dec!(0.00650), dec!(0.00050), dec!(0.00200), dec!(0.00900), "14740–19650 SOL"),
    tier(dec!(24560), dec!(0.00600), dec!(0.00050), dec!(0.00200), dec!(0.00850), "19650–24560 SOL"),
    tier(dec!(29470), dec!(0.00550), dec!(0.00050), dec!(0.00200), dec!(0.00800), "24560–29470 SOL"),
    tier(dec!(34380), dec!(0.00500), dec!(0.00050), dec!(0.00200), dec!(0.00750), "29470–34380 SOL"),
    tier(dec!(39300), dec!(0.00450), dec!(0.00050), dec!(0.00200), dec!(0.00700), "34380–39300 SOL"),
    tier(dec!(44210), dec!(0.00400), dec!(0.00050), dec!(0.00200), dec!(0.00650), "39300–44210 SOL"),
    tier(dec!(49120), dec!(0.00350), dec!(0.00050), dec!(0.00200), dec!(0.00600), "44210–49120 SOL"),
    tier(dec!(54030), dec!(0.00300), dec!(0.00050), dec!(0.00200), dec!(0.00550), "49120–54030 SOL"),
    tier(dec!(58940), dec!(0.00275), dec!(0.00050), dec!(0.00200), dec!(0.00525), "54030–58940 SOL"),
    tier(dec!(63860), dec!(0.00250), dec!(0.00050), dec!(0.00200), dec!(0.00500), "58940–63860 SOL"),
    tier(dec!(68770), dec!(0.00225), dec!(0.00050), dec!(0.00200), dec!(0.00475), "63860–68770 SOL"),
    tier(dec!(73681), dec!(0.00200), dec!(0.00050), dec!(0.00200), dec!(0.00450), "68770–73681 SOL"),
    tier(dec!(78590), dec!(0.00175), dec!(0.00050), dec!(0.00200), dec!(0.00425), "73681–78590 SOL"),
    tier(dec!(83500), dec!(0.00150), dec!(0.00050), dec!(0.00200), dec!(0.00400), "78590–83500 SOL"),
    tier(dec!(88400), dec!(0.00125), dec!(0.00050), dec!(0.00200), dec!(0.00375), "83500–88400 SOL"),
    tier(dec!(93330), dec!(0.00100), dec!(0.00050), dec!(0.00200), dec!(0.00350), "88400–93330 SOL"),
    tier(dec!(98240), dec!(0.00075), dec!(0.00050), dec!(0.00200), dec!(0.00325), "93330–98240 SOL"),
    // Open-ended: stabilizes at 0.300% total
    FeeTier {
        upper_bound: None,
        rates: FeeRates::new(dec!(0.00050), dec!(0.00050), dec!(0.00200), dec!(0.00300)),
        range: "≥ 98240 SOL",
    },
];

/// Ordered, validated list of fee tiers
#[derive(Debug, Clone, PartialEq)]
pub struct FeeSchedule {
    tiers: Vec<FeeTier>,
}

impl FeeSchedule {
    /// Build a schedule, checking that it covers every market cap exactly once
    pub fn new(tiers: Vec<FeeTier>) -> Result<Self> {
        let Some(last) = tiers.last() else {
            return Err(TrackerError::Validation(
                "fee schedule has no tiers".to_string(),
            ));
        };
        if last.upper_bound.is_some() {
            return Err(TrackerError::Validation(format!(
                "final fee tier '{}' must be unbounded",
                last.range
            )));
        }

        let mut previous: Option<Decimal> = None;
        for tier in &tiers[..tiers.len() - 1] {
            let bound = tier.upper_bound.ok_or_else(|| {
                TrackerError::Validation(format!(
                    "only the final fee tier may be unbounded, found '{}'",
                    tier.range
                ))
            })?;
            if let Some(prev) = previous {
                if bound <= prev {
                    return Err(TrackerError::Validation(format!(
                        "fee tier '{}' is out of order ({} <= {})",
                        tier.range, bound, prev
                    )));
                }
            }
            previous = Some(bound);
        }

        for tier in &tiers {
            if tier.rates.has_negative() {
                return Err(TrackerError::Validation(format!(
                    "fee tier '{}' has a negative rate",
                    tier.range
                )));
            }
            if !tier.rates.is_balanced() {
                return Err(TrackerError::Validation(format!(
                    "fee tier '{}' rates do not sum to its total",
                    tier.range
                )));
            }
        }

        Ok(Self { tiers })
    }

    /// The built-in canonical schedule
    pub fn canonical() -> Self {
        Self {
            tiers: CANONICAL_FEE_TIERS.to_vec(),
        }
    }

    pub fn tiers(&self) -> &[FeeTier] {
        &self.tiers
    }

    /// Position of the tier that owns `market_cap`
    pub fn tier_index(&self, market_cap: Decimal) -> usize {
        // Bounds ascend and only the last tier is open, so the predicate is monotone.
        let index = self.tiers.partition_point(|tier| !tier.covers(market_cap));
        if index == self.tiers.len() {
            unreachable!("fee schedule must end with an unbounded tier");
        }
        index
    }

    /// First tier whose upper bound is >= `market_cap`
    pub fn resolve_tier(&self, market_cap: Decimal) -> &FeeTier {
        &self.tiers[self.tier_index(market_cap)]
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::canonical()
    }
}

/// Default number of decimals shown by [`percent`]
pub const DEFAULT_PERCENT_DIGITS: u32 = 3;

/// Format a fraction as a percentage string for display
pub fn percent(fraction: Decimal, digits: u32) -> String {
    let value = (fraction * dec!(100))
        .round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}%", digits as usize, value)
}
