//! Jellyfin newsletter
//!
//! Finds what was added to a Jellyfin library during an observation window,
//! reported at the coarsest level that covers each change, and enriches it
//! with TMDB metadata for a newsletter.

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod jobs;
pub mod services;
