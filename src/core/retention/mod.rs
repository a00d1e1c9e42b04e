//! Opportunistic reclamation of aged disk artifacts
//!
//! No background scheduler exists in this system. Instead, [`SweepGate`]
//! turns the admission call path into a cheap interval check, and at most
//! once per interval one caller pays for a [`RetentionSweeper`] pass over the
//! configured directories.

mod gate;
mod sweeper;

#[cfg(test)]
mod tests;

pub use gate::SweepGate;
pub use sweeper::{RetentionSweeper, RootSweep, SweepReport};
