//! HTTP handlers.

pub mod papers;
