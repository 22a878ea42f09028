use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

use super::{parse_opt_timestamp, parse_timestamp};

/// Languages a snippet may be tagged with.
pub const LANGUAGES: &[&str] = &[
    "javascript",
    "typescript",
    "python",
    "java",
    "c",
    "cpp",
    "csharp",
    "go",
    "rust",
    "ruby",
    "php",
    "swift",
    "kotlin",
    "sql",
    "html",
    "css",
    "shell",
    "markdown",
];

pub fn supported_language(language: &str) -> bool {
    LANGUAGES.contains(&language)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => {
                log::error!("corrupt visibility in store: {other:?}");
                Err(AppError::Internal)
            }
        }
    }
}

// ______________________________________ Snippets ______________________________________

#[derive(Debug, Clone, Serialize)]
pub struct Snippet {
    pub id: i64,
    pub owner_id: String,
    pub title: String,
    pub code: String,
    pub language: String,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub likes_count: i64,
    pub comments_count: i64,
    pub bookmarks_count: i64,
    pub shares_count: i64,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Raw snippet row as stored. Tags, metadata and timestamps are kept as text
/// so the same row type decodes on both backends.
#[derive(Debug, FromRow)]
pub struct SnippetRow {
    pub id: i64,
    pub owner_id: String,
    pub title: String,
    pub code: String,
    pub language: String,
    pub tags: String,
    pub visibility: String,
    pub likes_count: i64,
    pub comments_count: i64,
    pub bookmarks_count: i64,
    pub shares_count: i64,
    pub metadata: String,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub deleted_at: Option<String>,
}

impl TryFrom<SnippetRow> for Snippet {
    type Error = AppError;

    fn try_from(row: SnippetRow) -> Result<Self, Self::Error> {
        Ok(Snippet {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            code: row.code,
            language: row.language,
            tags: serde_json::from_str(&row.tags)?,
            visibility: Visibility::parse(&row.visibility)?,
            likes_count: row.likes_count,
            comments_count: row.comments_count,
            bookmarks_count: row.bookmarks_count,
            shares_count: row.shares_count,
            metadata: serde_json::from_str(&row.metadata)?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_opt_timestamp(row.updated_at.as_deref())?,
            deleted_at: parse_opt_timestamp(row.deleted_at.as_deref())?,
        })
    }
}

// ______________________________________ Comments ______________________________________

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i64,
    pub snippet_id: i64,
    pub author_id: String,
    pub parent_id: Option<i64>,
    pub content: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub snippet_id: i64,
    pub author_id: String,
    pub parent_id: Option<i64>,
    pub content: String,
    pub metadata: String,
    pub created_at: String,
}

impl TryFrom<CommentRow> for Comment {
    type Error = AppError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        Ok(Comment {
            id: row.id,
            snippet_id: row.snippet_id,
            author_id: row.author_id,
            parent_id: row.parent_id,
            content: row.content,
            metadata: serde_json::from_str(&row.metadata)?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}
