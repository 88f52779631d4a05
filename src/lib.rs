// src/lib.rs

//! sitecrawler: concurrent same-host site crawler library

#[cfg(feature = "api")]
pub mod api;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;
