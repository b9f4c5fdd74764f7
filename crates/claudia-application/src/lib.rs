//! Application layer for the Claudia client.
//!
//! Hosts the session controller (the single owner of conversation state
//! and the only component that talks to the backend) and the status
//! poller that keeps the reachability badge current.

pub mod controller;
pub mod poller;

pub use controller::SessionController;
pub use poller::{PollerHandle, StatusPoller};
