// Main library entry point for psdeob.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ports;

pub use error::{Error, Result};
