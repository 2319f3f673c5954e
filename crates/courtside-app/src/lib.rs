//! Courtside App Services
//!
//! Cue storage, settings, the sound catalog and the board controller that
//! ties them to the `courtside` playback engine.

pub mod app;
pub mod catalog;
pub mod config;
pub mod data;
pub mod error;
