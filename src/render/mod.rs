//! Render module - scope and scale widgets

mod scale;
mod scope;

pub use scale::{XScale, YScale};
pub use scope::{max_scroll, sample_offset, Scope, ScopeSettings};
