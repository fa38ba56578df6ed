//! Client and run state shared between engines and the render collaborator.
//!
//! Each [`ClientState`] is mutated by exactly one engine; everything else
//! only reads snapshots of it.
mod client;
mod run;


pub use client::{
    ClientState, SharedClient, TaskStatus, shared_client, with_client, with_client_in,
};
pub use run::{DeliveryMode, ModeState, RunMeta, RunState, RunStatus};
