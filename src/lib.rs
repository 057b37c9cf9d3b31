//! Truth-level studies of neutrino events in a liquid-argon detector
//!
//! The containment study classifies charged-current events by whether
//! their hadronic system deposits all of its energy inside the active
//! volume. The generator comparison histograms flat generator output.
pub mod analysis;
pub mod ancestry;
pub mod comparison;
pub mod containment;
pub mod error;
pub mod event;
pub mod histogram;
pub mod json;
pub mod selection;
pub mod style;
mod util;

pub use crate::error::{Error, Result};
pub use crate::event::{Event, EventRecord};
