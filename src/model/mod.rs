// src/model/mod.rs

pub mod catalog;
pub mod inventory;
pub mod order;
pub mod store;
