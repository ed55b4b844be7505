//! Trading-fee engine
//!
//! Two phases are supported:
//!
//! - **bonding**: one flat rate set (creator 0.300%, protocol 0.950%, lp 0%)
//! - **canonical**: rates come from a 25-tier schedule keyed by market cap,
//!   where market cap = unit price × fixed total supply
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use token_tracker::fees::{FeeCalculator, TradePhase};
//!
//! let fees = FeeCalculator::default()
//!     .breakdown(dec!(100), dec!(0.001), TradePhase::Bonding)
//!     .unwrap();
//! assert_eq!(fees.total, dec!(0.00125));
//! ```

mod calculator;
mod schedule;

pub use calculator::{
    market_cap_from_price, FeeAllocation, FeeBreakdown, FeeCalculator, FeeParty, TradePhase,
    BONDING_CURVE_LABEL, BONDING_CURVE_RATES, TOTAL_SUPPLY,
};
pub use schedule::{
    percent, FeeRates, FeeSchedule, FeeTier, CANONICAL_FEE_TIERS, DEFAULT_PERCENT_DIGITS,
};
