//! Mathematical utilities: great-circle distance and day arithmetic.

pub mod geo;
pub mod time;

pub use geo::*;
pub use time::*;
