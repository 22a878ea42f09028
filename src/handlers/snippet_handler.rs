use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::{
    db::{now_rfc3339, Pool},
    error::AppError,
    models::{
        snippets::supported_language, parse_timestamp, Snippet, SnippetRow, UserData, Visibility,
    },
    AppState,
};

use super::require_user;

const SNIPPET_COLUMNS: &str = "id, owner_id, title, code, language, tags, visibility, \
     likes_count, comments_count, bookmarks_count, shares_count, metadata, \
     created_at, updated_at, deleted_at";

// _______________________________________ User related routes _______________________________________

#[derive(Debug, Deserialize)]
pub struct CreateSnippetRequest {
    pub title: String,
    pub code: String,
    pub language: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub visibility: Option<Visibility>,
    pub metadata: Option<serde_json::Value>,
}

#[post("")]
pub async fn create_snippet(
    app_data: web::Data<AppState>,
    data_json: web::Json<CreateSnippetRequest>,
    user_data: Option<web::ReqData<UserData>>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(user_data)?;
    let req = data_json.into_inner();

    let title = non_empty(&req.title, "title")?;
    let code = non_empty(&req.code, "code")?;
    validate_language(&req.language)?;
    let metadata = metadata_or_default(req.metadata)?;

    let row = sqlx::query(
        "INSERT INTO snippets (title, code, language, tags, visibility, owner_id, metadata, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING id",
    )
    .bind(title)
    .bind(code)
    .bind(&req.language)
    .bind(serde_json::to_string(&req.tags)?)
    .bind(req.visibility.unwrap_or(Visibility::Public).as_str())
    .bind(&user.id)
    .bind(metadata)
    .bind(now_rfc3339())
    .fetch_one(&app_data.db)
    .await?;

    let id: i64 = row.try_get("id")?;
    let snippet = fetch_live_snippet(&app_data.db, id)
        .await?
        .ok_or(AppError::Internal)?;

    Ok(HttpResponse::Created().json(snippet))
}

#[get("/{userId}")]
pub async fn get_user_snippets(
    app_data: web::Data<AppState>,
    path: web::Path<String>,
    user_data: Option<web::ReqData<UserData>>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let owner = user_data
        .map(|u| u.into_inner().id == user_id)
        .unwrap_or(false);

    // Private snippets stay out of everyone else's view of a profile.
    let sql = if owner {
        format!(
            "SELECT {SNIPPET_COLUMNS} FROM snippets
             WHERE owner_id = $1 AND deleted_at IS NULL
             ORDER BY created_at DESC, id DESC"
        )
    } else {
        format!(
            "SELECT {SNIPPET_COLUMNS} FROM snippets
             WHERE owner_id = $1 AND deleted_at IS NULL AND visibility = 'public'
             ORDER BY created_at DESC, id DESC"
        )
    };

    let rows: Vec<SnippetRow> = sqlx::query_as(&sql)
        .bind(&user_id)
        .fetch_all(&app_data.db)
        .await?;
    let snippets = rows
        .into_iter()
        .map(Snippet::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "snippets": snippets,
        "owner": owner
    })))
}

#[get("/{snippetId}")]
pub async fn get_snippet(
    app_data: web::Data<AppState>,
    path: web::Path<i64>,
    user_data: Option<web::ReqData<UserData>>,
) -> Result<HttpResponse, AppError> {
    let snippet_id = path.into_inner();
    let caller = user_data.map(|u| u.into_inner().id);

    let snippet = fetch_live_snippet(&app_data.db, snippet_id)
        .await?
        .ok_or(AppError::NotFound("Snippet not found"))?;
    let owner = caller.as_deref() == Some(snippet.owner_id.as_str());

    if snippet.visibility == Visibility::Private && !owner {
        return Err(AppError::NotFound("Snippet not found"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "snippet": snippet,
        "owner": owner
    })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSnippetRequest {
    pub title: Option<String>,
    pub code: Option<String>,
    pub language: Option<String>,
    pub tags: Option<Vec<String>>,
    pub visibility: Option<Visibility>,
    pub metadata: Option<serde_json::Value>,
}

#[patch("/{snippetId}")]
pub async fn update_snippet(
    app_data: web::Data<AppState>,
    path: web::Path<i64>,
    user_data: Option<web::ReqData<UserData>>,
    json_data: web::Json<UpdateSnippetRequest>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(user_data)?;
    let snippet_id = path.into_inner();
    let req = json_data.into_inner();

    let mut snippet = owned_live_snippet(&app_data.db, snippet_id, &user.id).await?;

    if let Some(title) = req.title {
        snippet.title = non_empty(&title, "title")?.to_string();
    }
    if let Some(code) = req.code {
        snippet.code = non_empty(&code, "code")?.to_string();
    }
    if let Some(language) = req.language {
        validate_language(&language)?;
        snippet.language = language;
    }
    if let Some(tags) = req.tags {
        snippet.tags = tags;
    }
    if let Some(visibility) = req.visibility {
        snippet.visibility = visibility;
    }
    if let Some(metadata) = req.metadata {
        if !metadata.is_object() {
            return Err(AppError::InvalidArgument("Snippet metadata must be an object".into()));
        }
        snippet.metadata = metadata;
    }

    let updated_at = now_rfc3339();
    sqlx::query(
        "UPDATE snippets
         SET title = $1, code = $2, language = $3, tags = $4, visibility = $5,
             metadata = $6, updated_at = $7
         WHERE id = $8",
    )
    .bind(&snippet.title)
    .bind(&snippet.code)
    .bind(&snippet.language)
    .bind(serde_json::to_string(&snippet.tags)?)
    .bind(snippet.visibility.as_str())
    .bind(snippet.metadata.to_string())
    .bind(&updated_at)
    .bind(snippet_id)
    .execute(&app_data.db)
    .await?;

    snippet.updated_at = Some(parse_timestamp(&updated_at)?);
    Ok(HttpResponse::Ok().json(snippet))
}

#[delete("/{snippetId}")]
pub async fn delete_snippet(
    app_data: web::Data<AppState>,
    path: web::Path<i64>,
    user_data: Option<web::ReqData<UserData>>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(user_data)?;
    let snippet_id = path.into_inner();

    owned_live_snippet(&app_data.db, snippet_id, &user.id).await?;

    sqlx::query("UPDATE snippets SET deleted_at = $1 WHERE id = $2")
        .bind(now_rfc3339())
        .bind(snippet_id)
        .execute(&app_data.db)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

// _______________________________________ Snippets related routes _______________________________________

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub language: Option<String>,
    pub title: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct PageResponse {
    pub total_records: i64,
    pub total_pages: u32,
    pub current_page: u32,
    pub records: Vec<Snippet>,
}

#[get("")]
pub async fn get_page_snippets(
    app_data: web::Data<AppState>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let PageParams { language, title, page, limit } = params.into_inner();
    let current_page = page.unwrap_or(1).max(1);
    let per_page = limit.unwrap_or(12).clamp(1, 100);
    let offset = (current_page - 1) * per_page;

    // Placeholders are numbered by hand so the same SQL runs on both
    // backends; each filter claims the next index.
    let language = language.filter(|l| !l.is_empty());
    let pattern = title
        .filter(|t| !t.is_empty())
        .map(|t| format!("%{}%", t.to_lowercase()));

    let mut filters = String::new();
    let mut next_param = 1;
    if language.is_some() {
        filters.push_str(&format!(" AND language = ${next_param}"));
        next_param += 1;
    }
    if pattern.is_some() {
        filters.push_str(&format!(" AND LOWER(title) LIKE ${next_param}"));
        next_param += 1;
    }

    let count_sql = format!(
        "SELECT COUNT(*) AS total FROM snippets
         WHERE visibility = 'public' AND deleted_at IS NULL{filters}"
    );
    let data_sql = format!(
        "SELECT {SNIPPET_COLUMNS} FROM snippets
         WHERE visibility = 'public' AND deleted_at IS NULL{filters}
         ORDER BY created_at DESC, id DESC
         LIMIT ${next_param} OFFSET ${}",
        next_param + 1
    );

    let mut count_query = sqlx::query(&count_sql);
    let mut data_query = sqlx::query_as::<_, SnippetRow>(&data_sql);
    if let Some(lang) = &language {
        count_query = count_query.bind(lang);
        data_query = data_query.bind(lang);
    }
    if let Some(pattern) = &pattern {
        count_query = count_query.bind(pattern);
        data_query = data_query.bind(pattern);
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let total_records: i64 = count_query
        .fetch_one(&app_data.db)
        .await?
        .try_get("total")?;

    let rows: Vec<SnippetRow> = data_query.fetch_all(&app_data.db).await?;
    let records = rows
        .into_iter()
        .map(Snippet::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let total_pages = ((total_records as f64) / (per_page as f64)).ceil() as u32;

    Ok(HttpResponse::Ok().json(PageResponse {
        total_records,
        total_pages,
        current_page,
        records,
    }))
}

// _______________________________________ Shared helpers _______________________________________

async fn fetch_live_snippet(db: &Pool, snippet_id: i64) -> Result<Option<Snippet>, AppError> {
    let sql = format!("SELECT {SNIPPET_COLUMNS} FROM snippets WHERE id = $1 AND deleted_at IS NULL");
    let row: Option<SnippetRow> = sqlx::query_as(&sql)
        .bind(snippet_id)
        .fetch_optional(db)
        .await?;

    row.map(Snippet::try_from).transpose()
}

/// Fetch a live snippet the caller must own. Snippets the caller cannot see
/// surface as absent; visible ones owned by someone else are forbidden.
async fn owned_live_snippet(
    db: &Pool,
    snippet_id: i64,
    caller_id: &str,
) -> Result<Snippet, AppError> {
    let snippet = fetch_live_snippet(db, snippet_id)
        .await?
        .ok_or(AppError::NotFound("Snippet not found"))?;

    if snippet.owner_id != caller_id {
        if snippet.visibility == Visibility::Private {
            return Err(AppError::NotFound("Snippet not found"));
        }
        return Err(AppError::Forbidden("Only the snippet owner may modify it"));
    }

    Ok(snippet)
}

fn non_empty<'a>(value: &'a str, field: &str) -> Result<&'a str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidArgument(format!("Snippet {field} must not be empty")));
    }
    Ok(trimmed)
}

fn validate_language(language: &str) -> Result<(), AppError> {
    if !supported_language(language) {
        return Err(AppError::InvalidArgument(format!("Unsupported language: {language}")));
    }
    Ok(())
}

fn metadata_or_default(metadata: Option<serde_json::Value>) -> Result<String, AppError> {
    match metadata {
        Some(value) if !value.is_object() => {
            Err(AppError::InvalidArgument("Snippet metadata must be an object".into()))
        }
        Some(value) => Ok(value.to_string()),
        None => Ok("{}".to_string()),
    }
}
