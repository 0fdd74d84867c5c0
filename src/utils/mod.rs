//! Utility Modules

pub mod error;
pub mod logging;
