//! Report rendering
//!
//! Pure functions from a [`RateSnapshot`](crate::pipeline::RateSnapshot) to
//! message text. Every configured row renders to exactly one line or block.

mod formatter;

pub use formatter::{format_report, format_unavailable, Markup, UNAVAILABLE_TEXT};
