//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and projection helpers
//! - Frame timing and the monotonic clock
//! - Logging setup

pub mod math;
pub mod time;
pub mod logging;
