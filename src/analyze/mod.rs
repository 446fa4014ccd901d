//! Item analysis: topic classification and the post-classification filters.

pub mod classify;
pub mod filters;

pub use crate::analyze::classify::{classify, score_breakdown, Category};
pub use crate::analyze::filters::DayWindow;
