//! Queue/transport controller: which track plays, and what comes next.

mod controller;
mod repeat;

pub use controller::{Controller, DurationCorrection, TransportSnapshot};
pub use repeat::RepeatMode;

#[cfg(test)]
mod tests;
