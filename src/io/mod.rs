//! Input/output helpers.
//!
//! - cleaned catalogue CSV ingest (`dataset`)
//! - recent-events JSON input (`events`)
//! - derived feature export (`export`)

pub mod dataset;
pub mod events;
pub mod export;

pub use dataset::*;
pub use events::*;
pub use export::*;
