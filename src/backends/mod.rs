//! Inference runtimes behind optional features.

#[cfg(feature = "tract")]
pub mod tract;

#[cfg(feature = "tract")]
pub use tract::{TractRuntime, TractSession};
