//! DexScreener price source

pub mod client;
pub mod messages;

pub use client::DexScreenerClient;
