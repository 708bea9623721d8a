//! Stock alert thresholds, status classification and alert conditions.
//!
//! The engine decides which alert condition holds. Delivering it is the
//! caller's job.

mod evaluate;
mod thresholds;

pub use evaluate::*;
pub use thresholds::*;
