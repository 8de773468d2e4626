//! Core library for beets-tidal: Tidal popularity sync for a beets library.
pub mod api;
pub mod config;
pub mod db;
pub mod library;
pub mod models;
pub mod retry;
pub mod sync;
pub mod util;
