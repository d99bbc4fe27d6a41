// src/io/mod.rs

pub mod lake;
pub mod reporting;
pub mod timestamp;
