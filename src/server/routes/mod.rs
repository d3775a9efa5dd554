//! Route handlers

pub mod health;
pub mod stops;
pub mod vehicles;
