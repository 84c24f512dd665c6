// src/lib.rs
pub mod config;
pub mod engine;
pub mod stream;
pub mod types;
