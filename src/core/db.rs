use tracing::info;

use crate::config::{POSTS, USERS};
use crate::core::backend::{AppBackends, FieldUpdate, Filter};
use crate::core::errors::Result;
use crate::core::helpers::{from_document, new_id, now_millis, to_document};
use crate::models::{PostData, UserData};
use crate::posts::search_terms;

const HOUR_MILLIS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct DemoAccount {
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct DemoData {
    pub test: DemoAccount,
    pub alice: DemoAccount,
    pub bob: DemoAccount,
}

/// Creates the `test`, `alice` and `bob` accounts with a few posts and makes
/// `test` follow `bob`. Running it again reuses the existing accounts.
/// Leaves nobody signed in.
pub async fn seed_demo_data(backends: &AppBackends) -> Result<DemoData> {
    let test = ensure_account(backends, "test", "Test user bio", &["This is my first post on Bord!"]).await?;
    let alice = ensure_account(
        backends,
        "alice",
        "Hello, I'm Alice!",
        &[
            "Welcome to my board! Excited to share thoughts here.",
            "Just finished an amazing project. Feeling productive today!",
        ],
    )
    .await?;
    let bob = ensure_account(
        backends,
        "bob",
        "Bob's corner of the internet",
        &["Hey everyone! Just joined Bord, looking forward to connecting with you all."],
    )
    .await?;

    backends
        .documents
        .update(USERS, &test.user_id, vec![FieldUpdate::array_union("following", bob.user_id.as_str())])
        .await?;
    backends.identity.sign_out().await?;

    Ok(DemoData { test, alice, bob })
}

async fn ensure_account(
    backends: &AppBackends,
    user_name: &str,
    bio: &str,
    posts: &[&str],
) -> Result<DemoAccount> {
    let email = format!("{}@bord.local", user_name);
    let password = format!("{}-password", user_name);

    let existing = backends.documents.query(USERS, &[Filter::eq("userName", user_name)]).await?;
    if let Some(doc) = existing.into_iter().next() {
        let user: UserData = from_document(doc)?;
        return Ok(DemoAccount {
            user_id: user.user_id.unwrap_or_default(),
            user_name: user_name.to_string(),
            email,
            password,
        });
    }

    let user_id = backends.identity.create_account(&email, &password).await?;
    let user = UserData {
        user_id: Some(user_id.clone()),
        name: Some(user_name.to_string()),
        user_name: Some(user_name.to_string()),
        bio: Some(bio.to_string()),
        image_url: None,
        following: Vec::new(),
    };
    backends.documents.set(USERS, &user_id, to_document(&user)?).await?;

    let now = now_millis();
    for (age, description) in posts.iter().enumerate() {
        let post_image = backends.blobs.upload(description.as_bytes().to_vec()).await?;
        let post_id = new_id();
        let post = PostData {
            post_id: Some(post_id.clone()),
            user_id: Some(user_id.clone()),
            username: Some(user_name.to_string()),
            user_image: None,
            post_image: Some(post_image),
            post_description: Some(description.to_string()),
            time: now - (age as i64 + 1) * HOUR_MILLIS,
            likes: Vec::new(),
            search_terms: search_terms(description),
        };
        backends.documents.set(POSTS, &post_id, to_document(&post)?).await?;
    }

    info!(%user_id, user_name, "demo account seeded");
    Ok(DemoAccount {
        user_id,
        user_name: user_name.to_string(),
        email,
        password,
    })
}
