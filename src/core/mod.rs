//! Core library components.
//!
//! Everything a hop needs to accept, check, forward, and store a
//! registration. The CLI only wires these together.

pub mod config;
pub mod constants;
pub mod crypto;
pub mod domain;
pub mod forward;
pub mod identity;
pub mod pipeline;
pub mod server;
pub mod ssh;
pub mod store;
pub mod tls;
pub mod types;
pub mod validation;
