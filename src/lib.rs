//! Core library for the `pushpoll` CLI.
//!
//! One long-running server task is observed twice: a set of simulated
//! clients receives its progress pushed over WebSocket, a second set pulls
//! it by polling HTTP endpoints. Both sets record what crossed the wire so
//! the two delivery styles can be compared side by side. The binary wires
//! these pieces to a command line; library APIs may evolve with it.
pub mod args;
pub mod config;
pub mod controller;
pub mod engine;
pub mod entry;
pub mod error;
pub mod logger;
pub mod metrics;
pub mod payload;
pub mod profile;
pub mod report;
pub mod shutdown;
pub mod state;
pub mod transport;

#[cfg(test)]
mod test_support;
