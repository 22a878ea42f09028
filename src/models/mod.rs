mod user;
pub use user::{CredentialsRow, User};

mod claims;
pub use claims::{Claims, UserData};

pub mod snippets;
pub use snippets::{Comment, CommentRow, Snippet, SnippetRow, Visibility};

use chrono::{DateTime, Utc};

use crate::error::AppError;

/// Parse a stored RFC 3339 timestamp back into a `DateTime<Utc>`.
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            log::error!("corrupt timestamp in store: {value:?}: {e}");
            AppError::Internal
        })
}

pub(crate) fn parse_opt_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    value.map(parse_timestamp).transpose()
}
