use std::sync::OnceLock;

use regex::Regex;
use tracing::info;

use crate::config::{POSTS, STOP_WORDS};
use crate::core::backend::{FieldUpdate, Filter};
use crate::core::errors::{ClientError, Result};
use crate::core::helpers::{from_documents, new_id, now_millis, to_document};
use crate::models::PostData;
use crate::session::{AppSession, Progress};

fn separator_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"[\s.,?!#]+").expect("Regex should compile")
    })
}

/// Search tokens for a post description: split on whitespace and `. , ? ! #`,
/// lowercased, without empty tokens and stop words. Repeats are kept.
pub fn search_terms(description: &str) -> Vec<String> {
    separator_regex()
        .split(description)
        .map(str::to_lowercase)
        .filter(|token| !token.is_empty() && !STOP_WORDS.contains(&token.as_str()))
        .collect()
}

pub fn newest_first(mut posts: Vec<PostData>) -> Vec<PostData> {
    posts.sort_by(|a, b| b.time.cmp(&a.time));
    posts
}

impl AppSession {
    /// Uploads the image and publishes a post for the signed-in user.
    ///
    /// Losing the current user between the upload and the write signs the
    /// session out.
    pub async fn create_post(&self, image: Vec<u8>, description: &str) -> Result<PostData> {
        let post_image = self.upload_image(image).await?;

        let busy = self.progress(Progress::Main);
        let user_id = match self.require_user_id().await {
            Ok(id) => id,
            Err(_) => {
                let err = ClientError::Session("Username unavailable, unable to publish post.".to_string());
                return self.fail("Error", err).await;
            }
        };
        let profile = self.user_data().unwrap_or_default();
        let post_id = new_id();

        let post = PostData {
            post_id: Some(post_id.clone()),
            user_id: Some(user_id),
            username: profile.user_name,
            user_image: profile.image_url,
            post_image: Some(post_image),
            post_description: Some(description.to_string()),
            time: now_millis(),
            likes: Vec::new(),
            search_terms: search_terms(description),
        };

        let doc = self.reported("Unable to create post", to_document(&post)).await?;
        self.reported("Unable to create post", self.backends.documents.set(POSTS, &post_id, doc).await)
            .await?;
        self.notify("Post successfully added!");
        info!(%post_id, terms = post.search_terms.len(), "post published");
        drop(busy);

        let _ = self.refresh_posts().await;
        Ok(post)
    }

    /// Reloads the signed-in user's own posts.
    pub async fn refresh_posts(&self) -> Result<Vec<PostData>> {
        let user_id = match self.require_user_id().await {
            Ok(id) => id,
            Err(_) => {
                let err = ClientError::Session("Username unavailable, unable to refresh post.".to_string());
                return self.fail("Error", err).await;
            }
        };
        let _busy = self.progress(Progress::RefreshPosts);
        let posts = self
            .load_posts("Cannot fetch posts", &[Filter::eq("userId", user_id)])
            .await?;
        self.update_state(|s| s.posts = posts.clone());
        Ok(posts)
    }

    /// Single-token exact match against post search terms. Blank input runs
    /// no query and returns the results already on screen.
    pub async fn search_posts(&self, term: &str) -> Result<Vec<PostData>> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Ok(self.state().search_results);
        }
        let _busy = self.progress(Progress::Search);
        let posts = self
            .load_posts("Cannot search post", &[Filter::array_contains("searchTerms", term)])
            .await?;
        self.update_state(|s| s.search_results = posts.clone());
        Ok(posts)
    }

    pub fn clear_search(&self) {
        self.update_state(|s| s.search_results.clear());
    }

    /// Adds or removes the signed-in user's like and returns the post with
    /// its new likes. Cached copies in the view state are patched too.
    pub async fn toggle_like(&self, post: &PostData) -> Result<PostData> {
        let user_id = self
            .reported("Unable to like the post", self.require_user_id().await)
            .await?;
        let post_id = match post.post_id.clone() {
            Some(id) => id,
            None => {
                let err = ClientError::Validation("post has no id".to_string());
                return self.fail("Unable to like the post", err).await;
            }
        };

        let busy = self.progress(Progress::Main);
        let liked = post.is_liked_by(&user_id);
        let update = if liked {
            FieldUpdate::array_remove("likes", user_id.as_str())
        } else {
            FieldUpdate::array_union("likes", user_id.as_str())
        };
        self.reported(
            "Unable to like the post",
            self.backends.documents.update(POSTS, &post_id, vec![update]).await,
        )
        .await?;
        drop(busy);

        let mut updated = post.clone();
        if liked {
            updated.likes.retain(|id| id != &user_id);
        } else {
            updated.likes.push(user_id);
        }

        let likes = updated.likes.clone();
        self.update_state(|s| {
            for list in [&mut s.posts, &mut s.feed, &mut s.search_results] {
                for cached in list.iter_mut().filter(|p| p.post_id.as_deref() == Some(post_id.as_str())) {
                    cached.likes = likes.clone();
                }
            }
        });
        Ok(updated)
    }

    /// Runs a post query and sorts the result newest first.
    pub(crate) async fn load_posts(&self, context: &str, filters: &[Filter]) -> Result<Vec<PostData>> {
        let docs = self
            .reported(context, self.backends.documents.query(POSTS, filters).await)
            .await?;
        let posts = self.reported(context, from_documents(docs)).await?;
        Ok(newest_first(posts))
    }
}
