use tracing::info;

use crate::config::{POSTS, USERS};
use crate::core::backend::{FieldUpdate, Filter};
use crate::core::errors::Result;
use crate::core::helpers::{from_document, from_documents, to_document};
use crate::models::{PostData, UserData};
use crate::session::{AppSession, Progress};

/// Profile fields to change. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub user_name: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

impl ProfileUpdate {
    /// Fills unset fields from `current`, keeping its follow list.
    pub fn merge_into(self, user_id: &str, current: UserData) -> UserData {
        UserData {
            user_id: Some(user_id.to_string()),
            name: self.name.or(current.name),
            user_name: self.user_name.or(current.user_name),
            bio: self.bio.or(current.bio),
            image_url: self.image_url.or(current.image_url),
            following: current.following,
        }
    }

    /// Set deltas for the fields this update carries. `following` is owned
    /// by the follow toggle and never written here.
    pub fn field_updates(&self, user_id: &str) -> Vec<FieldUpdate> {
        let mut updates = vec![FieldUpdate::set("userId", user_id)];
        let fields = [
            ("name", &self.name),
            ("userName", &self.user_name),
            ("bio", &self.bio),
            ("imageUrl", &self.image_url),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                updates.push(FieldUpdate::set(field, value.as_str()));
            }
        }
        updates
    }
}

impl AppSession {
    pub async fn update_profile(&self, name: &str, user_name: &str, bio: &str) -> Result<()> {
        self.create_or_update_profile(ProfileUpdate {
            name: Some(name.to_string()),
            user_name: Some(user_name.to_string()),
            bio: Some(bio.to_string()),
            image_url: None,
        })
        .await
    }

    /// Uploads a new avatar, points the profile at it and repairs the avatar
    /// copied into every post the user owns. Returns the avatar URL.
    pub async fn upload_avatar(&self, image: Vec<u8>) -> Result<String> {
        let image_url = self.upload_image(image).await?;
        self.create_or_update_profile(ProfileUpdate {
            image_url: Some(image_url.clone()),
            ..ProfileUpdate::default()
        })
        .await?;
        self.sync_user_posts_image(&image_url).await?;
        Ok(image_url)
    }

    pub(crate) async fn upload_image(&self, image: Vec<u8>) -> Result<String> {
        let _busy = self.progress(Progress::Main);
        self.reported("Cannot upload image", self.backends.blobs.upload(image).await)
            .await
    }

    /// Merges `update` into the user's profile and writes it. An existing
    /// document only gets the fields `update` sets. A user without a profile
    /// document gets a fresh one and the profile load chain runs.
    pub(crate) async fn create_or_update_profile(&self, update: ProfileUpdate) -> Result<()> {
        let user_id = self.reported("Cannot update user", self.require_user_id().await).await?;

        let busy = self.progress(Progress::Main);
        let existing = self
            .reported("Cannot create user", self.backends.documents.get(USERS, &user_id).await)
            .await?;

        match existing {
            Some(doc) => {
                let stored = self.reported("Cannot update user", from_document::<UserData>(doc)).await?;
                let updates = update.field_updates(&user_id);
                let merged = update.merge_into(&user_id, stored);
                self.reported(
                    "Cannot update user",
                    self.backends.documents.update(USERS, &user_id, updates).await,
                )
                .await?;
                self.update_state(|s| s.user_data = Some(merged));
                self.notify("Profile updated!");
                info!(%user_id, "profile updated");
                Ok(())
            }
            None => {
                // never inherit fields from a profile loaded for someone else
                let base = self
                    .user_data()
                    .filter(|u| u.user_id.as_deref() == Some(user_id.as_str()))
                    .unwrap_or_default();
                let merged = update.merge_into(&user_id, base);
                let doc = self.reported("Cannot create user", to_document(&merged)).await?;
                self.reported("Cannot create user", self.backends.documents.set(USERS, &user_id, doc).await)
                    .await?;
                info!(%user_id, "profile created");
                drop(busy);
                self.load_user_data(&user_id).await
            }
        }
    }

    /// Loads the profile, then the user's posts, feed and follower count.
    pub(crate) async fn load_user_data(&self, user_id: &str) -> Result<()> {
        let user = {
            let _busy = self.progress(Progress::Main);
            let doc = self
                .reported("Cannot retrieve user data", self.backends.documents.get(USERS, user_id).await)
                .await?;
            match doc {
                Some(doc) => Some(self.reported("Cannot retrieve user data", from_document::<UserData>(doc)).await?),
                None => None,
            }
        };
        self.update_state(|s| s.user_data = user);

        // each step reports its own failure
        let _ = self.refresh_posts().await;
        let _ = self.refresh_feed().await;
        let _ = self.refresh_followers(user_id).await;
        Ok(())
    }

    /// Rewrites `userImage` on every post owned by the signed-in user in one
    /// batch. Returns how many posts were touched.
    pub(crate) async fn sync_user_posts_image(&self, image_url: &str) -> Result<usize> {
        let user_id = self
            .reported("Cannot update posts image", self.require_user_id().await)
            .await?;
        let docs = self
            .reported(
                "Cannot update posts image",
                self.backends.documents.query(POSTS, &[Filter::eq("userId", user_id.as_str())]).await,
            )
            .await?;
        let posts: Vec<PostData> = self
            .reported("Cannot update posts image", from_documents(docs))
            .await?;

        let updates: Vec<(String, Vec<FieldUpdate>)> = posts
            .into_iter()
            .filter_map(|post| post.post_id)
            .map(|id| (id, vec![FieldUpdate::set("userImage", image_url)]))
            .collect();
        if updates.is_empty() {
            return Ok(0);
        }

        let count = updates.len();
        self.reported(
            "Cannot update posts image",
            self.backends.documents.batch_update(POSTS, updates).await,
        )
        .await?;
        info!(%user_id, count, "post avatars repaired");
        let _ = self.refresh_posts().await;
        Ok(count)
    }
}
