//! Helpers used by callers before they reach a container.

pub mod validation;
