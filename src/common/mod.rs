//! Types, errors and trait seams shared across the crate

pub mod channels;
pub mod errors;
pub mod events;
pub mod traits;
pub mod types;
