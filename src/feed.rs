use tracing::debug;

use crate::core::backend::Filter;
use crate::core::errors::Result;
use crate::core::helpers::now_millis;
use crate::models::PostData;
use crate::session::{AppSession, Progress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    /// Posts by accounts the user follows.
    Personalized,
    /// Recent posts by anyone.
    General,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    pub source: FeedSource,
    pub posts: Vec<PostData>,
}

impl AppSession {
    /// Selects the home feed: followed accounts first, falling back to every
    /// post inside the configured window when that comes up empty.
    pub async fn refresh_feed(&self) -> Result<Feed> {
        let following = self.user_data().map(|u| u.following).unwrap_or_default();
        let _busy = self.progress(Progress::Feed);

        if !following.is_empty() {
            let posts = self
                .load_posts("Cannot get personalized feed", &[Filter::is_in("userId", following)])
                .await?;
            if !posts.is_empty() {
                return Ok(self.publish_feed(FeedSource::Personalized, posts));
            }
            debug!("personalized feed empty, falling back to general feed");
        }

        let since = now_millis() - self.config.feed_window.num_milliseconds();
        let posts = self
            .load_posts("Cannot get feed", &[Filter::gt("time", since)])
            .await?;
        Ok(self.publish_feed(FeedSource::General, posts))
    }

    fn publish_feed(&self, source: FeedSource, posts: Vec<PostData>) -> Feed {
        debug!(?source, count = posts.len(), "feed loaded");
        self.update_state(|s| s.feed = posts.clone());
        Feed { source, posts }
    }
}
