// src/strategy/mod.rs

pub mod implementations;
pub mod registry;
pub mod traits;
