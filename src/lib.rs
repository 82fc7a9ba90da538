pub mod api;
pub mod config;
pub mod error;
pub mod geometry;
pub mod scorer;
pub mod synthetic;
pub mod trace;
// cmd and reports belong to the binary crate (main.rs).
