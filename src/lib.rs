//! melanalytics: dashboard client for the melanoma-detection analytics service.
//!
//! Authenticates against the service, fetches aggregate statistics and daily
//! activity for a date range, and normalizes the partially-missing payloads
//! into typed KPIs and chart series. The same core backs the terminal
//! `report` command and the browser dashboard served by `web`.

pub mod analytics;
pub mod cli;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod daterange;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod normalize;
pub mod session;
pub mod web;
