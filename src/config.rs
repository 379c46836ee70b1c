use chrono::Duration;

pub const USERS: &str = "usersFirebase";
pub const POSTS: &str = "posts";
pub const COMMENTS: &str = "comments";

/// Filler words dropped from post search terms.
pub const STOP_WORDS: [&str; 9] = ["the", "to", "is", "of", "and", "or", "in", "it", "a"];

pub const DEFAULT_FEED_WINDOW_HOURS: i64 = 24;

// Key layout for key-value backed document stores
pub fn document_key(collection: &str, id: &str) -> String {
    format!("{}:{}", collection, id)
}

pub fn collection_list_key(collection: &str) -> String {
    format!("{}_list", collection)
}

pub fn feed_window_hours() -> i64 {
    std::env::var("BORDGRAM_FEED_WINDOW_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|h| *h > 0)
        .unwrap_or(DEFAULT_FEED_WINDOW_HOURS)
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How far back the general feed reaches.
    pub feed_window: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        ClientConfig {
            feed_window: Duration::hours(feed_window_hours()),
        }
    }

    pub fn with_feed_window(mut self, window: Duration) -> Self {
        self.feed_window = window;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            feed_window: Duration::hours(DEFAULT_FEED_WINDOW_HOURS),
        }
    }
}
