//! The session owns all mutable view state.
//!
//! Operations live in the feature modules (`auth`, `users`, `posts`, `feed`,
//! `follow`, `comments`) as `impl AppSession` blocks. Each one raises a
//! progress flag through a [`ProgressGuard`], reports failures once through
//! the notification queue and never retries.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::core::backend::AppBackends;
use crate::core::errors::{ClientError, Result};
use crate::models::{CommentData, PostData, UserData};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub signed_in: bool,
    pub in_progress: bool,
    pub refresh_posts_progress: bool,
    pub feed_progress: bool,
    pub search_progress: bool,
    pub comment_progress: bool,
    pub user_data: Option<UserData>,
    /// The signed-in user's own posts, newest first.
    pub posts: Vec<PostData>,
    pub feed: Vec<PostData>,
    pub search_results: Vec<PostData>,
    pub comments: Vec<CommentData>,
    /// Number of users following the signed-in user.
    pub followers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Progress {
    Main,
    RefreshPosts,
    Feed,
    Search,
    Comment,
}

#[derive(Default)]
struct Inner {
    view: ViewState,
    active: HashMap<Progress, u32>,
}

impl Inner {
    fn set_flag(&mut self, flag: Progress) {
        let on = self.active.get(&flag).copied().unwrap_or(0) > 0;
        match flag {
            Progress::Main => self.view.in_progress = on,
            Progress::RefreshPosts => self.view.refresh_posts_progress = on,
            Progress::Feed => self.view.feed_progress = on,
            Progress::Search => self.view.search_progress = on,
            Progress::Comment => self.view.comment_progress = on,
        }
    }
}

/// Keeps a progress flag raised while alive. Nested guards on the same flag
/// keep it raised until the last one drops.
pub struct ProgressGuard<'a> {
    state: &'a Mutex<Inner>,
    flag: Progress,
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = inner.active.get_mut(&self.flag) {
            *count = count.saturating_sub(1);
        }
        inner.set_flag(self.flag);
    }
}

/// Single-consumer queue of user-visible messages. Each message is
/// delivered exactly once.
pub struct Notifications {
    rx: mpsc::UnboundedReceiver<String>,
}

impl Notifications {
    pub fn try_next(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    pub async fn next(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Everything queued so far.
    pub fn drain(&mut self) -> Vec<String> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }
}

pub struct AppSession {
    pub(crate) backends: AppBackends,
    pub(crate) config: ClientConfig,
    state: Mutex<Inner>,
    notifier: mpsc::UnboundedSender<String>,
    notifications: Mutex<Option<Notifications>>,
}

impl AppSession {
    pub fn new(backends: AppBackends, config: ClientConfig) -> Self {
        let (notifier, rx) = mpsc::unbounded_channel();
        AppSession {
            backends,
            config,
            state: Mutex::new(Inner::default()),
            notifier,
            notifications: Mutex::new(Some(Notifications { rx })),
        }
    }

    /// Builds a session and picks up a user the identity provider already
    /// has signed in.
    pub async fn start(backends: AppBackends, config: ClientConfig) -> Self {
        let session = AppSession::new(backends, config);
        session.restore().await;
        session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Hands out the notification receiver. Only the first caller gets it.
    pub fn take_notifications(&self) -> Option<Notifications> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Snapshot of the current view state.
    pub fn state(&self) -> ViewState {
        self.lock().view.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.lock().view.signed_in
    }

    pub fn user_data(&self) -> Option<UserData> {
        self.lock().view.user_data.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn update_state<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> R {
        let mut inner = self.lock();
        f(&mut inner.view)
    }

    pub(crate) fn progress(&self, flag: Progress) -> ProgressGuard<'_> {
        let mut inner = self.lock();
        *inner.active.entry(flag).or_insert(0) += 1;
        inner.set_flag(flag);
        ProgressGuard { state: &self.state, flag }
    }

    pub(crate) fn notify(&self, message: impl Into<String>) {
        if self.notifier.send(message.into()).is_err() {
            debug!("notification receiver dropped");
        }
    }

    /// Logs and publishes a failure once.
    pub(crate) fn report(&self, context: &str, err: &ClientError) {
        warn!(error = %err, "{}", if context.is_empty() { "operation failed" } else { context });
        let detail = err.user_message();
        let message = match (context.is_empty(), detail.is_empty()) {
            (true, _) => detail,
            (false, true) => context.to_string(),
            (false, false) => format!("{}: {}", context, detail),
        };
        self.notify(message);
    }

    /// Reports `err` and hands it back. A session error also signs the user out.
    pub(crate) async fn fail<T>(&self, context: &str, err: ClientError) -> Result<T> {
        self.report(context, &err);
        if err.is_session() {
            self.logout().await;
        }
        Err(err)
    }

    /// Passes `result` through, reporting an error the way [`Self::fail`] does.
    pub(crate) async fn reported<T>(&self, context: &str, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => self.fail(context, err).await,
        }
    }

    pub(crate) async fn require_user_id(&self) -> Result<String> {
        self.backends
            .identity
            .current_user_id()
            .await
            .ok_or_else(|| ClientError::Session("no signed-in user".to_string()))
    }
}
