//! Core trait abstractions for the scrape-job lifecycle.

pub mod provider;
