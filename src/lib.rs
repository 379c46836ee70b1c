//! Client core of a photo feed app.
//!
//! An [`AppSession`] sits on top of three hosted services (identity,
//! documents, blobs) reached through the traits in [`core::backend`]. It runs
//! the profile, post, feed, follow, like, comment and search flows, keeps the
//! resulting [`ViewState`] and publishes user-visible messages on a
//! single-consumer [`Notifications`] queue.

pub mod auth;
pub mod comments;
pub mod config;
pub mod core;
pub mod feed;
pub mod follow;
pub mod models;
pub mod posts;
pub mod session;
pub mod users;

pub use crate::config::ClientConfig;
pub use crate::core::backend::{AppBackends, BlobStore, DocumentStore, FieldDelta, FieldUpdate, Filter, IdentityProvider};
pub use crate::core::errors::{ClientError, Result};
pub use crate::core::kv::{KeyValue, KvDocumentStore, MemoryKv};
pub use crate::core::memory::{MemoryBackends, MemoryBlobStore, MemoryDocumentStore, MemoryIdentityProvider, StoreOp};
pub use crate::feed::{Feed, FeedSource};
pub use crate::models::{CommentData, PostData, UserData};
pub use crate::posts::search_terms;
pub use crate::session::{AppSession, Notifications, Progress, ViewState};
pub use crate::users::ProfileUpdate;
