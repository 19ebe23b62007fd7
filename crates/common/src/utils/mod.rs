//! Small cross-crate helpers.

pub mod logging;
