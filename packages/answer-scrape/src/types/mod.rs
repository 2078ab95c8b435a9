//! Data types for scrape jobs and citation resolution.

pub mod config;
pub mod model;
