use tracing::info;

use crate::config::USERS;
use crate::core::backend::{FieldUpdate, Filter};
use crate::core::errors::{ClientError, Result};
use crate::session::{AppSession, Progress};

impl AppSession {
    /// Follows `target_user_id`, or unfollows it if already followed, then
    /// reloads the profile. Returns whether the user now follows the target.
    ///
    /// The change is sent as a field-level array delta, so concurrent edits
    /// of the follow list from another device are not overwritten.
    pub async fn toggle_follow(&self, target_user_id: &str) -> Result<bool> {
        let user_id = self
            .reported("Unable to follow user", self.require_user_id().await)
            .await?;
        if target_user_id.is_empty() || target_user_id == user_id {
            let err = ClientError::Validation("Invalid target user".to_string());
            return self.fail("Unable to follow user", err).await;
        }

        let busy = self.progress(Progress::Main);
        let following = self
            .user_data()
            .map(|u| u.is_following(target_user_id))
            .unwrap_or(false);
        let update = if following {
            FieldUpdate::array_remove("following", target_user_id)
        } else {
            FieldUpdate::array_union("following", target_user_id)
        };
        self.reported(
            "Unable to follow user",
            self.backends.documents.update(USERS, &user_id, vec![update]).await,
        )
        .await?;
        drop(busy);
        info!(%user_id, followed = target_user_id, now_following = !following, "follow toggled");

        self.load_user_data(&user_id).await?;
        Ok(!following)
    }

    /// Counts the users whose follow list contains `user_id`.
    pub async fn refresh_followers(&self, user_id: &str) -> Result<usize> {
        let docs = self
            .reported(
                "Cannot count followers",
                self.backends
                    .documents
                    .query(USERS, &[Filter::array_contains("following", user_id)])
                    .await,
            )
            .await?;
        let followers = docs.len();
        self.update_state(|s| s.followers = followers);
        Ok(followers)
    }
}
