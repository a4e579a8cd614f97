pub mod format;
pub mod ratelimit;
pub mod time;

// Re-export main utilities
pub use format::{format_count, format_duration, format_size, truncate_chars};
pub use ratelimit::RateLimiter;
pub use time::get_now_unix;
