//! Engagement ledger: the like and comment sets and the derived counters on
//! their parent snippet.
//!
//! Every operation runs as one store transaction so the set-membership change
//! and the counter adjustment commit together or not at all. Counters are
//! moved by exactly the cardinality delta of the set change, never recomputed
//! by counting rows. Operations on the same snippet may race from any number
//! of processes; correctness rests on the store's row locks and on the
//! composite primary key of `snippet_likes`.

use sqlx::{query, query_as, Row};

use crate::db::{now_rfc3339, Pool};
use crate::error::AppError;
use crate::models::{Comment, CommentRow};

#[derive(Clone)]
pub struct EngagementLedger {
    pool: Pool,
}

impl EngagementLedger {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Record that `user_id` likes `snippet_id` and return the resulting
    /// like count. Liking a snippet twice is an idempotent success: the
    /// duplicate call neither inserts a row nor moves the counter.
    pub async fn like(&self, snippet_id: i64, user_id: &str) -> Result<i64, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = visible_like_count(&mut tx, snippet_id, user_id).await?;

        let inserted = query(
            "INSERT INTO snippet_likes (snippet_id, user_id, created_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (snippet_id, user_id) DO NOTHING",
        )
        .bind(snippet_id)
        .bind(user_id)
        .bind(now_rfc3339())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let count = if inserted == 1 {
            query("UPDATE snippets SET likes_count = likes_count + 1 WHERE id = $1 RETURNING likes_count")
                .bind(snippet_id)
                .fetch_one(&mut *tx)
                .await?
                .try_get("likes_count")?
        } else {
            current
        };

        tx.commit().await?;
        Ok(count)
    }

    /// Remove `user_id`'s like from `snippet_id` and return the resulting
    /// count. Unliking a snippet the user never liked is a no-op success.
    /// The counter floors at zero.
    pub async fn unlike(&self, snippet_id: i64, user_id: &str) -> Result<i64, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = visible_like_count(&mut tx, snippet_id, user_id).await?;

        let removed = query("DELETE FROM snippet_likes WHERE snippet_id = $1 AND user_id = $2")
            .bind(snippet_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let count = if removed == 1 {
            query(
                "UPDATE snippets
                 SET likes_count = CASE WHEN likes_count > 0 THEN likes_count - 1 ELSE 0 END
                 WHERE id = $1
                 RETURNING likes_count",
            )
            .bind(snippet_id)
            .fetch_one(&mut *tx)
            .await?
            .try_get("likes_count")?
        } else {
            current
        };

        tx.commit().await?;
        Ok(count)
    }

    /// Whether `user_id` currently likes `snippet_id`.
    pub async fn has_liked(&self, snippet_id: i64, user_id: &str) -> Result<bool, AppError> {
        let snippet = query(
            "SELECT id FROM snippets
             WHERE id = $1 AND deleted_at IS NULL AND (visibility = 'public' OR owner_id = $2)",
        )
        .bind(snippet_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        if snippet.is_none() {
            return Err(AppError::NotFound("Snippet not found"));
        }

        let row = query("SELECT 1 AS present FROM snippet_likes WHERE snippet_id = $1 AND user_id = $2")
            .bind(snippet_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Insert a comment and return the snippet's comment list, newest first.
    /// A reply's parent must be a comment on the same snippet.
    pub async fn add_comment(
        &self,
        snippet_id: i64,
        author_id: &str,
        content: &str,
        parent_id: Option<i64>,
        metadata: Option<serde_json::Value>,
    ) -> Result<Vec<Comment>, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::InvalidArgument("Comment content must not be empty".into()));
        }

        let metadata = match metadata {
            Some(value) if !value.is_object() => {
                return Err(AppError::InvalidArgument("Comment metadata must be an object".into()))
            }
            Some(value) => value.to_string(),
            None => "{}".to_string(),
        };

        let mut tx = self.pool.begin().await?;

        ensure_visible_snippet(&mut tx, snippet_id, author_id).await?;

        if let Some(parent) = parent_id {
            let row = query("SELECT snippet_id FROM snippet_comments WHERE id = $1")
                .bind(parent)
                .fetch_optional(&mut *tx)
                .await?;

            match row {
                Some(row) if row.try_get::<i64, _>("snippet_id")? == snippet_id => {}
                _ => {
                    return Err(AppError::NotFound("Parent comment not found on this snippet"));
                }
            }
        }

        query(
            "INSERT INTO snippet_comments (content, snippet_id, author_id, parent_id, metadata, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(content)
        .bind(snippet_id)
        .bind(author_id)
        .bind(parent_id)
        .bind(metadata)
        .bind(now_rfc3339())
        .execute(&mut *tx)
        .await?;

        query("UPDATE snippets SET comments_count = comments_count + 1 WHERE id = $1")
            .bind(snippet_id)
            .execute(&mut *tx)
            .await?;

        let comments = comment_list(&mut tx, snippet_id).await?;

        tx.commit().await?;
        Ok(comments)
    }

    /// Delete a comment and its reply subtree, returning the resulting
    /// comment count. Only the comment's author or the snippet's owner may
    /// delete it; the counter drops by the number of rows removed, floored
    /// at zero.
    pub async fn remove_comment(
        &self,
        snippet_id: i64,
        comment_id: i64,
        caller_id: &str,
    ) -> Result<i64, AppError> {
        let mut tx = self.pool.begin().await?;

        let comment = query("SELECT author_id FROM snippet_comments WHERE id = $1 AND snippet_id = $2")
            .bind(comment_id)
            .bind(snippet_id)
            .fetch_optional(&mut *tx)
            .await?;

        let author_id: String = match comment {
            Some(row) => row.try_get("author_id")?,
            None => return Err(AppError::NotFound("Comment not found")),
        };

        let owner = query("SELECT owner_id FROM snippets WHERE id = $1 AND deleted_at IS NULL")
            .bind(snippet_id)
            .fetch_optional(&mut *tx)
            .await?;

        let owner_id: String = match owner {
            Some(row) => row.try_get("owner_id")?,
            None => return Err(AppError::NotFound("Snippet not found")),
        };

        if caller_id != author_id && caller_id != owner_id {
            return Err(AppError::Forbidden("Only the comment author or snippet owner may delete it"));
        }

        let removed = query(
            "WITH RECURSIVE doomed AS (
                 SELECT id FROM snippet_comments WHERE id = $1
                 UNION ALL
                 SELECT c.id FROM snippet_comments c JOIN doomed d ON c.parent_id = d.id
             )
             DELETE FROM snippet_comments WHERE id IN (SELECT id FROM doomed)",
        )
        .bind(comment_id)
        .execute(&mut *tx)
        .await?
        .rows_affected() as i64;

        let count: i64 = query(
            "UPDATE snippets
             SET comments_count = CASE WHEN comments_count > $1 THEN comments_count - $1 ELSE 0 END
             WHERE id = $2
             RETURNING comments_count",
        )
        .bind(removed)
        .bind(snippet_id)
        .fetch_one(&mut *tx)
        .await?
        .try_get("comments_count")?;

        tx.commit().await?;
        Ok(count)
    }

    /// Comment list for a snippet, newest first.
    pub async fn comments(
        &self,
        snippet_id: i64,
        viewer_id: Option<&str>,
    ) -> Result<Vec<Comment>, AppError> {
        let mut tx = self.pool.begin().await?;
        ensure_visible_snippet(&mut tx, snippet_id, viewer_id.unwrap_or("")).await?;
        let comments = comment_list(&mut tx, snippet_id).await?;
        tx.commit().await?;
        Ok(comments)
    }
}

/// Fetch the like count of a live snippet visible to `viewer_id`, or
/// `NotFound`. Private snippets are engageable only by their owner; everyone
/// else sees them as absent.
async fn visible_like_count(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    snippet_id: i64,
    viewer_id: &str,
) -> Result<i64, AppError> {
    let row = query(
        "SELECT likes_count FROM snippets
         WHERE id = $1 AND deleted_at IS NULL AND (visibility = 'public' OR owner_id = $2)",
    )
    .bind(snippet_id)
    .bind(viewer_id)
    .fetch_optional(&mut **tx)
    .await?;

    match row {
        Some(row) => Ok(row.try_get("likes_count")?),
        None => Err(AppError::NotFound("Snippet not found")),
    }
}

async fn ensure_visible_snippet(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    snippet_id: i64,
    viewer_id: &str,
) -> Result<(), AppError> {
    visible_like_count(tx, snippet_id, viewer_id).await.map(|_| ())
}

async fn comment_list(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    snippet_id: i64,
) -> Result<Vec<Comment>, AppError> {
    let rows: Vec<CommentRow> = query_as(
        "SELECT id, snippet_id, author_id, parent_id, content, metadata, created_at
         FROM snippet_comments
         WHERE snippet_id = $1
         ORDER BY created_at DESC, id DESC",
    )
    .bind(snippet_id)
    .fetch_all(&mut **tx)
    .await?;

    rows.into_iter().map(Comment::try_from).collect()
}
