//! Input validation for values arriving from untrusted callers.

pub mod sanitize;

pub use sanitize::sanitize_name;
