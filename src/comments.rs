use tracing::info;

use crate::config::COMMENTS;
use crate::core::backend::Filter;
use crate::core::errors::{ClientError, Result};
use crate::core::helpers::{from_documents, new_id, now_millis, to_document};
use crate::models::CommentData;
use crate::session::{AppSession, Progress};

pub fn newest_comments_first(mut comments: Vec<CommentData>) -> Vec<CommentData> {
    comments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    comments
}

impl AppSession {
    /// Adds a comment under the signed-in user's username and reloads the
    /// thread.
    pub async fn add_comment(&self, post_id: &str, text: &str) -> Result<CommentData> {
        let username = match self.user_data().and_then(|u| u.user_name) {
            Some(name) => name,
            None => {
                let err = ClientError::Session("username unavailable".to_string());
                return self.fail("Cannot create the comment", err).await;
            }
        };
        let busy = self.progress(Progress::Comment);
        let comment_id = new_id();
        let comment = CommentData {
            comment_id: Some(comment_id.clone()),
            post_id: Some(post_id.to_string()),
            username: Some(username),
            text: Some(text.to_string()),
            timestamp: now_millis(),
        };

        let doc = self.reported("Cannot create the comment", to_document(&comment)).await?;
        self.reported(
            "Cannot create the comment",
            self.backends.documents.set(COMMENTS, &comment_id, doc).await,
        )
        .await?;
        drop(busy);
        info!(%comment_id, post_id, "comment added");
        self.notify("Comment added!");

        let _ = self.get_post_comments(post_id).await;
        Ok(comment)
    }

    /// Loads every comment on a post, newest first.
    pub async fn get_post_comments(&self, post_id: &str) -> Result<Vec<CommentData>> {
        let _busy = self.progress(Progress::Comment);
        let docs = self
            .reported(
                "Cannot retrieve comments",
                self.backends.documents.query(COMMENTS, &[Filter::eq("postId", post_id)]).await,
            )
            .await?;
        let comments = self.reported("Cannot retrieve comments", from_documents(docs)).await?;
        let comments = newest_comments_first(comments);
        self.update_state(|s| s.comments = comments.clone());
        Ok(comments)
    }
}
