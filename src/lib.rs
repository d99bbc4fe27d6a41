//! Discrete-event simulation of retail stores for comparing inventory policies.
//!
//! Each invocation advances the simulation up to a "today" cursor: the
//! catalog window rolls forward, prices and demand are refreshed, and every
//! store plays out its not-yet-simulated days. Stock is tracked as dated lots
//! consumed earliest-expiry first; unmet demand accumulates as backorders that
//! the ordering policy turns into supplier orders.

pub mod error;
pub mod evaluation;
pub mod io;
pub mod model;
pub mod simulation;
pub mod strategy;

pub use error::{Result, SimError};
