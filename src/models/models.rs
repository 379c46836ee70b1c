use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserData {
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub user_name: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub following: Vec<String>,
}

impl UserData {
    pub fn is_following(&self, user_id: &str) -> bool {
        self.following.iter().any(|id| id == user_id)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PostData {
    pub post_id: Option<String>,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub user_image: Option<String>,
    pub post_image: Option<String>,
    pub post_description: Option<String>,
    /// Creation time, epoch millis.
    pub time: i64,
    pub likes: Vec<String>,
    pub search_terms: Vec<String>,
}

impl PostData {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|id| id == user_id)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentData {
    pub comment_id: Option<String>,
    pub post_id: Option<String>,
    pub username: Option<String>,
    pub text: Option<String>,
    pub timestamp: i64,
}

/// Raw document as held by a document store.
pub type Document = serde_json::Map<String, serde_json::Value>;
