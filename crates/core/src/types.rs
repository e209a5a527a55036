//! Shared primitive type aliases.

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Default frame rate used when a source does not specify one.
pub const DEFAULT_FPS: u32 = 30;
