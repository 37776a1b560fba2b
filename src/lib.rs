// src/lib.rs

//! security.txt scanning worker: probes a web service for its RFC 9116
//! disclosure file, validates it against a configurable policy, stores the
//! verdict and raises an alert when the file is missing or invalid.

pub mod alert;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod store;
pub mod worker;
