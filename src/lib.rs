//! Gobmovie - GCF/GMV movie packaging tool
//!
//! This library crate exposes the application glue around `gobmovie-media`
//! for integration testing.

pub mod config;
pub mod inspect;
pub mod scanner;
