use tracing::{info, warn};

use crate::config::USERS;
use crate::core::backend::Filter;
use crate::core::errors::{ClientError, Result};
use crate::session::{AppSession, Progress};
use crate::users::ProfileUpdate;

fn all_filled(fields: &[&str]) -> bool {
    fields.iter().all(|f| !f.is_empty())
}

impl AppSession {
    /// Registers a new account and creates its profile.
    ///
    /// The username check and the account creation are separate calls, so two
    /// concurrent signups with the same username can both pass the check.
    pub async fn signup(&self, user_name: &str, email: &str, password: &str) -> Result<()> {
        if !all_filled(&[user_name, email, password]) {
            return self
                .fail("", ClientError::Validation("Please fill all fields".to_string()))
                .await;
        }
        let _busy = self.progress(Progress::Main);

        let existing = self
            .reported(
                "Cannot check username",
                self.backends.documents.query(USERS, &[Filter::eq("userName", user_name)]).await,
            )
            .await?;
        if !existing.is_empty() {
            return self
                .fail("", ClientError::DuplicateUsername(user_name.to_string()))
                .await;
        }

        let user_id = self
            .reported("Signup failed", self.backends.identity.create_account(email, password).await)
            .await?;
        self.update_state(|s| {
            s.signed_in = true;
            // whatever was loaded belongs to the previous user
            s.user_data = None;
            s.posts.clear();
            s.comments.clear();
            s.followers = 0;
        });
        info!(%user_id, user_name, "account created");

        self.create_or_update_profile(ProfileUpdate {
            user_name: Some(user_name.to_string()),
            ..ProfileUpdate::default()
        })
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        if !all_filled(&[email, password]) {
            return self
                .fail("", ClientError::Validation("Please fill all fields".to_string()))
                .await;
        }
        let user_id = {
            let _busy = self.progress(Progress::Main);
            self.reported("Login failed", self.backends.identity.sign_in(email, password).await)
                .await?
        };
        self.update_state(|s| s.signed_in = true);
        info!(%user_id, "signed in");
        self.load_user_data(&user_id).await
    }

    /// Signs out and forgets everything loaded for the previous user.
    pub async fn logout(&self) {
        if let Err(err) = self.backends.identity.sign_out().await {
            warn!(error = %err, "sign out failed");
        }
        self.update_state(|s| {
            s.signed_in = false;
            s.user_data = None;
            s.posts.clear();
            s.feed.clear();
            s.search_results.clear();
            s.comments.clear();
            s.followers = 0;
        });
        self.notify("Logged out!");
    }

    /// Resumes a session the identity provider still holds.
    pub async fn restore(&self) {
        if let Some(user_id) = self.backends.identity.current_user_id().await {
            self.update_state(|s| s.signed_in = true);
            // failures were already reported
            let _ = self.load_user_data(&user_id).await;
        }
    }
}
