//! Shared primitives for the Frugal router crates

#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod prompt;

pub use error::HttpError;
pub use prompt::Prompt;
