//! Server-side session state: the player registry and connection lifecycle

pub mod controller;
pub mod registry;

pub use controller::{Broadcast, Connection, ConnectionController, ConnectionPhase};
pub use registry::{Livery, SessionRegistry};
