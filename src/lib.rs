//! tankwatch: water tank level monitoring.
//!
//! Fetches timestamped level readings from a JSON feed, estimates how long
//! the tank will take to fill or empty, and presents the result on the
//! command line or in a small login-gated web dashboard.

pub mod auth;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod estimator;
pub mod feed;
pub mod logging;
pub mod readings;
pub mod web;
