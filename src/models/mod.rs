pub mod models;

pub use models::{CommentData, Document, PostData, UserData};
