//! Inbound message throttling

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;

use crate::ws::protocol::ClientMsg;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Move frames per second allowed per connection.
/// Clients report their position once per rendered frame.
pub const MOVE_RATE_LIMIT: u32 = 120;

/// Per-connection gate for parsed client messages.
///
/// Only position reports are metered; a join always passes so a burst of
/// early moves can never lock a connection out of the session.
pub struct InboundThrottle {
    moves: Limiter,
}

impl InboundThrottle {
    pub fn new() -> Self {
        Self::with_move_rate(MOVE_RATE_LIMIT)
    }

    pub fn with_move_rate(per_second: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));
        Self {
            moves: RateLimiter::direct(quota),
        }
    }

    /// Whether `msg` may be processed now
    pub fn admit(&self, msg: &ClientMsg) -> bool {
        match msg {
            ClientMsg::Join { .. } => true,
            ClientMsg::Move { .. } => self.moves.check().is_ok(),
        }
    }
}

impl Default for InboundThrottle {
    fn default() -> Self {
        Self::new()
    }
}
