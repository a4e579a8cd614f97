use chrono::Utc;

/// Current wall-clock time as Unix seconds.
pub fn get_now_unix() -> i64 {
    Utc::now().timestamp()
}
