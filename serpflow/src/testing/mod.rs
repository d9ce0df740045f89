//! Testing utilities.
//!
//! This module provides:
//! - HTML fixtures for healthy, blocked and empty result pages
//! - Scripted and closure-backed fetchers

pub mod fakes;
pub mod fixtures;

pub use fakes::{FnFetcher, ScriptStep, ScriptedFetcher};
