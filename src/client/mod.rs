pub mod roster;
pub mod sync;

pub use roster::{ConnectionStatus, OverlayFrame, RemoteMarker, RemoteRoster};
pub use sync::{
    validate_position, EchoFilter, NetworkSyncClient, PlayerIdentity, SyncError, SyncEvent, SyncEvents,
};
