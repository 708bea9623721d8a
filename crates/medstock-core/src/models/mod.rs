//! Domain models for the stock ledger and care scheduling engine.

mod alert;
mod medication;
mod movement;
mod patient;
mod posology;
mod replenishment;
mod schedule;

pub use alert::*;
pub use medication::*;
pub use movement::*;
pub use patient::*;
pub use posology::*;
pub use replenishment::*;
pub use schedule::*;
