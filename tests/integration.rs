use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use bordgram::config::{COMMENTS, POSTS, USERS};
use bordgram::core::db::seed_demo_data;
use bordgram::core::helpers::to_document;
use bordgram::models::Document;
use bordgram::{
    AppBackends, AppSession, ClientConfig, ClientError, CommentData, DocumentStore, FeedSource, FieldUpdate,
    Filter, IdentityProvider, MemoryBackends, StoreOp, UserData,
};

fn new_session(mem: &MemoryBackends) -> AppSession {
    AppSession::new(mem.backends(), ClientConfig::default())
}

fn current_user_id(session: &AppSession) -> String {
    session
        .user_data()
        .and_then(|u| u.user_id)
        .expect("profile should be loaded")
}

#[tokio::test]
async fn test_signup_creates_profile_and_signs_in() {
    let mem = MemoryBackends::new();
    let session = new_session(&mem);

    session.signup("pixel", "pixel@bord.local", "secret").await.unwrap();

    let state = session.state();
    assert!(state.signed_in);
    assert!(!state.in_progress, "progress flag must drop after signup");
    let user = state.user_data.expect("profile missing after signup");
    assert_eq!(user.user_name.as_deref(), Some("pixel"));
    assert!(user.following.is_empty());
    assert_eq!(mem.documents.count(USERS), 1);
    assert_eq!(mem.identity.account_count(), 1);
}

#[tokio::test]
async fn test_signup_requires_every_field() {
    let mem = MemoryBackends::new();
    let session = new_session(&mem);
    let mut notes = session.take_notifications().unwrap();

    let err = session.signup("pixel", "", "secret").await.unwrap_err();

    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(notes.drain(), vec!["Please fill all fields".to_string()]);
    assert_eq!(mem.identity.account_count(), 0);
    assert!(!session.state().in_progress);
}

#[tokio::test]
async fn test_second_signup_with_same_username_is_rejected() {
    // The check and the create are separate calls; this covers the sequential
    // case only. Two racing signups can both pass the check.
    let mem = MemoryBackends::new();
    let session = new_session(&mem);
    let mut notes = session.take_notifications().unwrap();

    session.signup("twin", "first@bord.local", "secret").await.unwrap();
    session.logout().await;
    notes.drain();

    let err = session.signup("twin", "second@bord.local", "secret").await.unwrap_err();

    assert_eq!(err, ClientError::DuplicateUsername("twin".to_string()));
    assert_eq!(mem.identity.account_count(), 1, "no second identity may be created");
    assert_eq!(notes.drain(), vec!["Username already exists!".to_string()]);
    assert!(!session.state().signed_in);
    assert!(!session.state().in_progress);
}

#[tokio::test]
async fn test_login_with_bad_credentials() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);
    let mut notes = session.take_notifications().unwrap();

    let err = session.login(&demo.test.email, "wrong").await.unwrap_err();

    assert!(matches!(err, ClientError::Auth(_)));
    let state = session.state();
    assert!(!state.signed_in);
    assert!(!state.in_progress);
    let messages = notes.drain();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Login failed"), "unexpected message {:?}", messages);
}

#[tokio::test]
async fn test_login_loads_profile_posts_feed_and_followers() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);

    session.login(&demo.bob.email, &demo.bob.password).await.unwrap();

    let state = session.state();
    assert!(state.signed_in);
    assert_eq!(current_user_id(&session), demo.bob.user_id);
    assert_eq!(state.posts.len(), 1);
    assert_eq!(state.followers, 1, "test follows bob");
    // bob follows nobody, so the general feed is shown
    assert_eq!(state.feed.len(), 4);
    assert!(!state.feed_progress);
    assert!(!state.refresh_posts_progress);
}

#[tokio::test]
async fn test_feed_falls_back_when_following_nobody() {
    let mem = MemoryBackends::new();
    seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);
    session.signup("loner", "loner@bord.local", "secret").await.unwrap();
    mem.documents.clear_operations();

    let feed = session.refresh_feed().await.unwrap();

    assert_eq!(feed.source, FeedSource::General);
    assert_eq!(feed.posts.len(), 4);
    assert!(feed.posts.windows(2).all(|w| w[0].time >= w[1].time), "feed must be newest first");
    let personalized_queries = mem
        .documents
        .operations()
        .into_iter()
        .filter(|op| matches!(op, StoreOp::Query { filters, .. } if matches!(filters.first(), Some(Filter::In(..)))))
        .count();
    assert_eq!(personalized_queries, 0);
}

#[tokio::test]
async fn test_feed_falls_back_when_followed_accounts_have_no_posts() {
    let mem = MemoryBackends::new();
    let session = new_session(&mem);

    session.signup("quiet", "quiet@bord.local", "secret").await.unwrap();
    let quiet_id = current_user_id(&session);
    session.logout().await;
    session.signup("fan", "fan@bord.local", "secret").await.unwrap();

    assert!(session.toggle_follow(&quiet_id).await.unwrap());
    let feed = session.refresh_feed().await.unwrap();

    assert_eq!(feed.source, FeedSource::General);
    assert!(feed.posts.is_empty());
}

#[tokio::test]
async fn test_personalized_feed_is_not_replaced_by_general_feed() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);
    session.login(&demo.test.email, &demo.test.password).await.unwrap();

    let feed = session.refresh_feed().await.unwrap();

    assert_eq!(feed.source, FeedSource::Personalized);
    assert_eq!(feed.posts.len(), 1);
    assert_eq!(feed.posts[0].user_id.as_deref(), Some(demo.bob.user_id.as_str()));
    assert_eq!(session.state().feed, feed.posts);
}

#[tokio::test]
async fn test_general_feed_respects_window() {
    let mem = MemoryBackends::new();
    seed_demo_data(&mem.backends()).await.unwrap();
    // seeded posts are one and two hours old
    let config = ClientConfig::default().with_feed_window(chrono::Duration::minutes(90));
    let session = AppSession::new(mem.backends(), config);
    session.signup("recent", "recent@bord.local", "secret").await.unwrap();

    let feed = session.refresh_feed().await.unwrap();

    assert_eq!(feed.source, FeedSource::General);
    assert_eq!(feed.posts.len(), 3);
}

#[tokio::test]
async fn test_toggle_follow_adds_then_removes_one_entry() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);
    session.login(&demo.alice.email, &demo.alice.password).await.unwrap();

    assert!(session.toggle_follow(&demo.bob.user_id).await.unwrap());
    let following = session.user_data().unwrap().following;
    assert_eq!(following, vec![demo.bob.user_id.clone()]);
    assert_eq!(session.state().followers, 0);

    assert!(!session.toggle_follow(&demo.bob.user_id).await.unwrap());
    assert!(session.user_data().unwrap().following.is_empty());
}

#[tokio::test]
async fn test_following_yourself_is_rejected() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);
    session.login(&demo.alice.email, &demo.alice.password).await.unwrap();

    let err = session.toggle_follow(&demo.alice.user_id).await.unwrap_err();

    assert!(matches!(err, ClientError::Validation(_)));
    assert!(session.is_signed_in());
}

#[tokio::test]
async fn test_toggle_like_twice_restores_likes() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);
    session.login(&demo.test.email, &demo.test.password).await.unwrap();
    let post = session.state().feed[0].clone();
    let original = post.likes.clone();

    let liked = session.toggle_like(&post).await.unwrap();
    assert_eq!(liked.likes, vec![demo.test.user_id.clone()]);
    assert_eq!(session.state().feed[0].likes, liked.likes, "cached feed copy must follow");

    let unliked = session.toggle_like(&liked).await.unwrap();
    assert_eq!(unliked.likes, original);

    let post_id = post.post_id.unwrap();
    let stored = mem.documents.query(POSTS, &[Filter::eq("postId", post_id.as_str())]).await;
    let stored = bordgram::core::helpers::from_documents::<bordgram::PostData>(stored.unwrap()).unwrap();
    assert_eq!(stored[0].likes, original);
}

#[tokio::test]
async fn test_create_post_tokenizes_and_denormalizes() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);
    let mut notes = session.take_notifications().unwrap();
    session.login(&demo.test.email, &demo.test.password).await.unwrap();

    let post = session
        .create_post(vec![0xFF, 0xD8], "Sunset at the Beach #nofilter")
        .await
        .unwrap();

    assert_eq!(post.search_terms, vec!["sunset", "at", "beach", "nofilter"]);
    assert_eq!(post.username.as_deref(), Some("test"));
    assert_eq!(post.user_id.as_deref(), Some(demo.test.user_id.as_str()));
    assert!(post.likes.is_empty());
    let image_url = post.post_image.clone().unwrap();
    assert_eq!(mem.blobs.fetch(&image_url), Some(vec![0xFF, 0xD8]));

    let state = session.state();
    assert_eq!(state.posts.len(), 2);
    assert_eq!(state.posts[0].post_id, post.post_id, "newest post first");
    assert!(!state.in_progress);
    assert!(notes.drain().contains(&"Post successfully added!".to_string()));
}

#[tokio::test]
async fn test_create_post_without_session_forces_logout() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);
    let mut notes = session.take_notifications().unwrap();
    session.login(&demo.test.email, &demo.test.password).await.unwrap();
    let posts_before = mem.documents.count(POSTS);

    mem.identity.expire_session();
    let err = session.create_post(vec![1], "lost").await.unwrap_err();

    assert!(err.is_session());
    let state = session.state();
    assert!(!state.signed_in);
    assert!(state.user_data.is_none());
    assert!(state.feed.is_empty());
    assert!(!state.in_progress);
    assert_eq!(mem.documents.count(POSTS), posts_before);
    assert_eq!(
        notes.drain(),
        vec![
            "Error: Username unavailable, unable to publish post.".to_string(),
            "Logged out!".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_upload_avatar_repairs_own_posts() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);
    session.login(&demo.alice.email, &demo.alice.password).await.unwrap();
    mem.documents.clear_operations();

    let url = session.upload_avatar(vec![7, 7, 7]).await.unwrap();

    assert_eq!(session.user_data().unwrap().image_url.as_deref(), Some(url.as_str()));
    let docs = mem
        .documents
        .query(POSTS, &[Filter::eq("userId", demo.alice.user_id.as_str())])
        .await
        .unwrap();
    assert_eq!(docs.len(), 2);
    for doc in &docs {
        assert_eq!(doc["userImage"], serde_json::json!(url));
    }
    let batches: Vec<_> = mem
        .documents
        .operations()
        .into_iter()
        .filter_map(|op| match op {
            StoreOp::BatchUpdate { ids, .. } => Some(ids),
            _ => None,
        })
        .collect();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert!(session.state().posts.iter().all(|p| p.user_image.as_deref() == Some(url.as_str())));

    // bob's post keeps its old avatar
    let bob_docs = mem
        .documents
        .query(POSTS, &[Filter::eq("userId", demo.bob.user_id.as_str())])
        .await
        .unwrap();
    assert_eq!(bob_docs[0]["userImage"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_update_profile_merges_with_loaded_profile() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);
    let mut notes = session.take_notifications().unwrap();
    session.login(&demo.test.email, &demo.test.password).await.unwrap();
    let avatar = session.upload_avatar(vec![1]).await.unwrap();
    notes.drain();

    session.update_profile("Tess", "tess", "new bio").await.unwrap();

    let user = session.user_data().unwrap();
    assert_eq!(user.name.as_deref(), Some("Tess"));
    assert_eq!(user.user_name.as_deref(), Some("tess"));
    assert_eq!(user.bio.as_deref(), Some("new bio"));
    assert_eq!(user.image_url.as_deref(), Some(avatar.as_str()), "unset fields are kept");
    assert_eq!(user.following, vec![demo.bob.user_id.clone()]);

    let stored = mem.documents.query(USERS, &[Filter::eq("userName", "tess")]).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["following"], serde_json::json!([demo.bob.user_id]));
    assert_eq!(notes.drain(), vec!["Profile updated!".to_string()]);
}

#[tokio::test]
async fn test_comments_are_sorted_newest_first() {
    let mem = MemoryBackends::new();
    let session = new_session(&mem);
    for (id, timestamp) in [("c1", 100), ("c2", 300), ("c3", 200)] {
        let comment = CommentData {
            comment_id: Some(id.to_string()),
            post_id: Some("post-1".to_string()),
            username: Some("alice".to_string()),
            text: Some(format!("comment {}", id)),
            timestamp,
        };
        mem.documents
            .set(COMMENTS, id, to_document(&comment).unwrap())
            .await
            .unwrap();
    }

    let comments = session.get_post_comments("post-1").await.unwrap();

    let order: Vec<i64> = comments.iter().map(|c| c.timestamp).collect();
    assert_eq!(order, vec![300, 200, 100]);
    assert_eq!(session.state().comments, comments);
    assert!(!session.state().comment_progress);
}

#[tokio::test]
async fn test_add_comment_reloads_thread() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);
    let mut notes = session.take_notifications().unwrap();
    session.login(&demo.test.email, &demo.test.password).await.unwrap();
    let post_id = session.state().feed[0].post_id.clone().unwrap();

    let comment = session.add_comment(&post_id, "nice shot").await.unwrap();

    assert_eq!(comment.username.as_deref(), Some("test"));
    let state = session.state();
    assert_eq!(state.comments.len(), 1);
    assert_eq!(state.comments[0].text.as_deref(), Some("nice shot"));
    assert!(notes.drain().contains(&"Comment added!".to_string()));
}

#[tokio::test]
async fn test_add_comment_needs_a_username() {
    let mem = MemoryBackends::new();
    let session = new_session(&mem);

    let err = session.add_comment("post-1", "hello").await.unwrap_err();

    assert!(err.is_session());
    assert_eq!(mem.documents.count(COMMENTS), 0);
}

#[tokio::test]
async fn test_search_is_single_token_exact_match() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);
    session.login(&demo.alice.email, &demo.alice.password).await.unwrap();

    let found = session.search_posts("  PROJECT ").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(session.state().search_results, found);

    let prefix = session.search_posts("proj").await.unwrap();
    assert!(prefix.is_empty(), "no prefix matching");

    session.search_posts("bord").await.unwrap();
    mem.documents.clear_operations();
    let blank = session.search_posts("   ").await.unwrap();
    assert!(mem.documents.operations().is_empty(), "blank search must not query");
    assert_eq!(blank.len(), 2, "blank search hands back the results on screen");
    assert_eq!(session.state().search_results, blank);

    session.clear_search();
    assert!(session.state().search_results.is_empty());
    assert!(!session.state().search_progress);
}

#[tokio::test]
async fn test_store_failure_is_reported_once_and_flag_drops() {
    let mem = MemoryBackends::new();
    let session = new_session(&mem);
    let mut notes = session.take_notifications().unwrap();
    session.signup("solo", "solo@bord.local", "secret").await.unwrap();
    notes.drain();

    mem.documents.fail_collection(POSTS);
    let err = session.refresh_feed().await.unwrap_err();

    assert!(matches!(err, ClientError::Io(_)));
    assert!(!session.state().feed_progress);
    assert_eq!(
        notes.drain(),
        vec!["Cannot get feed: collection posts unavailable".to_string()]
    );
    assert!(session.is_signed_in(), "I/O errors do not sign out");
}

#[tokio::test]
async fn test_failed_upload_leaves_profile_untouched() {
    let mem = MemoryBackends::new();
    let session = new_session(&mem);
    session.signup("solo", "solo@bord.local", "secret").await.unwrap();

    mem.blobs.set_failing(true);
    let err = session.upload_avatar(vec![1]).await.unwrap_err();

    assert!(matches!(err, ClientError::Io(_)));
    assert!(session.user_data().unwrap().image_url.is_none());
    assert!(!session.state().in_progress);
}

#[tokio::test]
async fn test_notifications_have_a_single_consumer() {
    let mem = MemoryBackends::new();
    let session = new_session(&mem);

    let mut notes = session.take_notifications().unwrap();
    assert!(session.take_notifications().is_none());

    session.logout().await;
    assert_eq!(notes.try_next().as_deref(), Some("Logged out!"));
    assert_eq!(notes.try_next(), None, "messages are delivered once");
}

#[tokio::test]
async fn test_start_restores_signed_in_user() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    mem.backends()
        .identity
        .sign_in(&demo.test.email, &demo.test.password)
        .await
        .unwrap();

    let session = AppSession::start(mem.backends(), ClientConfig::default()).await;

    assert!(session.is_signed_in());
    assert_eq!(current_user_id(&session), demo.test.user_id);
    assert_eq!(session.state().feed.len(), 1);
}

#[tokio::test]
async fn test_logout_clears_state() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);
    session.login(&demo.test.email, &demo.test.password).await.unwrap();
    session.search_posts("bord").await.unwrap();

    session.logout().await;

    let state = session.state();
    assert!(!state.signed_in);
    assert!(state.user_data.is_none());
    assert!(state.posts.is_empty());
    assert!(state.feed.is_empty());
    assert!(state.search_results.is_empty());
    assert_eq!(state.followers, 0);
    assert!(mem.identity.current_user_id().await.is_none());
}

#[tokio::test]
async fn test_signup_while_signed_in_starts_a_clean_profile() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);
    session.login(&demo.test.email, &demo.test.password).await.unwrap();

    session.signup("newbie", "newbie@bord.local", "secret").await.unwrap();

    let stored = mem.documents.query(USERS, &[Filter::eq("userName", "newbie")]).await.unwrap();
    assert_eq!(stored.len(), 1);
    let stored: UserData = serde_json::from_value(serde_json::Value::Object(stored[0].clone())).unwrap();
    assert_eq!(stored.name, None, "name leaked from previous user: {:?}", stored);
    assert_eq!(stored.bio, None);
    assert_eq!(stored.image_url, None);
    assert!(stored.following.is_empty());

    let user = session.user_data().unwrap();
    assert_eq!(user.user_name.as_deref(), Some("newbie"));
    assert!(user.following.is_empty());
    assert_ne!(user.user_id.as_deref(), Some(demo.test.user_id.as_str()));
    assert!(session.state().posts.is_empty());
}

#[tokio::test]
async fn test_profile_update_without_loaded_profile_keeps_stored_fields() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    mem.backends()
        .identity
        .sign_in(&demo.alice.email, &demo.alice.password)
        .await
        .unwrap();
    // signed in at the provider, but nothing loaded into the session
    let session = new_session(&mem);
    assert!(session.user_data().is_none());

    let url = session.upload_avatar(vec![9]).await.unwrap();

    let doc = mem.documents.get(USERS, &demo.alice.user_id).await.unwrap().unwrap();
    let stored: UserData = serde_json::from_value(serde_json::Value::Object(doc)).unwrap();
    assert_eq!(stored.user_name.as_deref(), Some("alice"));
    assert_eq!(stored.name.as_deref(), Some("alice"));
    assert_eq!(stored.bio.as_deref(), Some("Hello, I'm Alice!"));
    assert_eq!(stored.image_url.as_deref(), Some(url.as_str()));

    let user = session.user_data().unwrap();
    assert_eq!(user.user_name.as_deref(), Some("alice"));
    assert_eq!(user.image_url.as_deref(), Some(url.as_str()));
}

/// Flags seen by the store while a write was in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FlagsAtWrite {
    in_progress: bool,
    comment_progress: bool,
}

/// Wraps the memory store and samples the session's progress flags on writes.
struct FlagSamplingStore {
    inner: Arc<bordgram::MemoryDocumentStore>,
    session: Mutex<Weak<AppSession>>,
    samples: Mutex<Vec<(String, FlagsAtWrite)>>,
}

impl FlagSamplingStore {
    fn sample(&self, collection: &str) {
        let session = self.session.lock().unwrap().upgrade();
        if let Some(session) = session {
            let state = session.state();
            self.samples.lock().unwrap().push((
                collection.to_string(),
                FlagsAtWrite { in_progress: state.in_progress, comment_progress: state.comment_progress },
            ));
        }
    }

    fn samples_for(&self, collection: &str) -> Vec<FlagsAtWrite> {
        self.samples
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == collection)
            .map(|(_, flags)| *flags)
            .collect()
    }
}

#[async_trait]
impl DocumentStore for FlagSamplingStore {
    async fn get(&self, collection: &str, id: &str) -> bordgram::Result<Option<Document>> {
        self.inner.get(collection, id).await
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> bordgram::Result<Vec<Document>> {
        self.inner.query(collection, filters).await
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> bordgram::Result<()> {
        self.sample(collection);
        self.inner.set(collection, id, doc).await
    }

    async fn update(&self, collection: &str, id: &str, updates: Vec<FieldUpdate>) -> bordgram::Result<()> {
        self.sample(collection);
        self.inner.update(collection, id, updates).await
    }

    async fn batch_update(&self, collection: &str, updates: Vec<(String, Vec<FieldUpdate>)>) -> bordgram::Result<()> {
        self.sample(collection);
        self.inner.batch_update(collection, updates).await
    }
}

#[tokio::test]
async fn test_like_follow_and_comment_writes_raise_progress_flags() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let store = Arc::new(FlagSamplingStore {
        inner: mem.documents.clone(),
        session: Mutex::new(Weak::new()),
        samples: Mutex::new(Vec::new()),
    });
    let backends = AppBackends::new(mem.identity.clone(), store.clone(), mem.blobs.clone());
    let session = Arc::new(AppSession::new(backends, ClientConfig::default()));
    *store.session.lock().unwrap() = Arc::downgrade(&session);

    session.login(&demo.test.email, &demo.test.password).await.unwrap();
    let post = session.state().feed[0].clone();
    let post_id = post.post_id.clone().unwrap();

    session.toggle_like(&post).await.unwrap();
    session.toggle_follow(&demo.alice.user_id).await.unwrap();
    session.add_comment(&post_id, "flagged").await.unwrap();

    assert!(store.samples_for(POSTS).iter().all(|f| f.in_progress));
    assert!(store.samples_for(USERS).iter().all(|f| f.in_progress));
    let comment_writes = store.samples_for(COMMENTS);
    assert_eq!(comment_writes.len(), 1);
    assert!(comment_writes[0].comment_progress);

    let state = session.state();
    assert!(!state.in_progress);
    assert!(!state.comment_progress);
}

#[tokio::test]
async fn test_failed_like_follow_and_comment_writes_drop_their_flags() {
    let mem = MemoryBackends::new();
    let demo = seed_demo_data(&mem.backends()).await.unwrap();
    let session = new_session(&mem);
    let mut notes = session.take_notifications().unwrap();
    session.login(&demo.test.email, &demo.test.password).await.unwrap();
    let post = session.state().feed[0].clone();
    let post_id = post.post_id.clone().unwrap();

    mem.documents.fail_collection(POSTS);
    assert!(matches!(session.toggle_like(&post).await, Err(ClientError::Io(_))));
    assert!(!session.state().in_progress);

    mem.documents.heal();
    mem.documents.fail_collection(USERS);
    assert!(matches!(session.toggle_follow(&demo.alice.user_id).await, Err(ClientError::Io(_))));
    assert!(!session.state().in_progress);

    mem.documents.heal();
    mem.documents.fail_collection(COMMENTS);
    assert!(matches!(session.add_comment(&post_id, "lost").await, Err(ClientError::Io(_))));
    assert!(!session.state().comment_progress);

    let messages = notes.drain();
    assert!(messages.iter().any(|m| m.starts_with("Unable to like the post")));
    assert!(messages.iter().any(|m| m.starts_with("Unable to follow user")));
    assert!(messages.iter().any(|m| m.starts_with("Cannot create the comment")));
    assert!(session.is_signed_in());
}
