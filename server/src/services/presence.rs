//! Presence helpers: display colors and activity timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::seq::IndexedRandom;

/// Cursor palette handed out to joining connections.
pub const USER_COLORS: [&str; 8] = [
    "#ef4444", // red
    "#f97316", // orange
    "#eab308", // yellow
    "#22c55e", // green
    "#14b8a6", // teal
    "#3b82f6", // blue
    "#8b5cf6", // violet
    "#ec4899", // pink
];

/// Pick a display color at random. Colors may repeat within a room.
#[must_use]
pub fn pick_color() -> String {
    USER_COLORS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_COLORS[0])
        .to_owned()
}

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}
