//! Utility helpers: glam math extensions and logging timers.

pub mod logging;
pub mod math;

pub use math::*;
