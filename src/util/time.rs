//! Process clock helpers

use std::time::Instant;

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Nominal client frame rate used by the headless driver
pub const CLIENT_FPS: u32 = 60;

/// Frame delta in seconds at [`CLIENT_FPS`]
pub fn frame_delta() -> f32 {
    1.0 / CLIENT_FPS as f32
}
