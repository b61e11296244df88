//! Sandbox module containing all execution-related components.

pub mod config;
pub mod env;
pub mod executor;
pub mod interpreter;
pub mod io;
pub mod limits;
pub mod request;
pub mod staging;
