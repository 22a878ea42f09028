use actix_web::{delete, get, post, web, HttpResponse};
use serde::Deserialize;

use crate::{error::AppError, models::UserData, AppState};

use super::require_user;

#[post("/{snippetId}/like")]
pub async fn like_snippet(
    app_data: web::Data<AppState>,
    path: web::Path<i64>,
    user_data: Option<web::ReqData<UserData>>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(user_data)?;
    let snippet_id = path.into_inner();

    let likes_count = app_data.ledger.like(snippet_id, &user.id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "likes_count": likes_count })))
}

#[delete("/{snippetId}/like")]
pub async fn unlike_snippet(
    app_data: web::Data<AppState>,
    path: web::Path<i64>,
    user_data: Option<web::ReqData<UserData>>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(user_data)?;
    let snippet_id = path.into_inner();

    let likes_count = app_data.ledger.unlike(snippet_id, &user.id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "likes_count": likes_count })))
}

#[derive(Debug, Deserialize)]
pub struct CheckLikeParams {
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[get("/{snippetId}/like/check")]
pub async fn check_like(
    app_data: web::Data<AppState>,
    path: web::Path<i64>,
    params: web::Query<CheckLikeParams>,
) -> Result<HttpResponse, AppError> {
    let snippet_id = path.into_inner();

    let liked = app_data
        .ledger
        .has_liked(snippet_id, &params.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "liked": liked })))
}

#[get("/{snippetId}/comment")]
pub async fn list_comments(
    app_data: web::Data<AppState>,
    path: web::Path<i64>,
    user_data: Option<web::ReqData<UserData>>,
) -> Result<HttpResponse, AppError> {
    let snippet_id = path.into_inner();
    let viewer = user_data.map(|u| u.into_inner().id);

    let comments = app_data
        .ledger
        .comments(snippet_id, viewer.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(comments))
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub content: String,
    #[serde(default, alias = "parentId")]
    pub parent_id: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

#[post("/{snippetId}/comment")]
pub async fn add_comment(
    app_data: web::Data<AppState>,
    path: web::Path<i64>,
    data_json: web::Json<AddCommentRequest>,
    user_data: Option<web::ReqData<UserData>>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(user_data)?;
    let snippet_id = path.into_inner();
    let req = data_json.into_inner();

    let comments = app_data
        .ledger
        .add_comment(snippet_id, &user.id, &req.content, req.parent_id, req.metadata)
        .await?;

    Ok(HttpResponse::Ok().json(comments))
}

#[derive(Debug, Deserialize)]
pub struct RemoveCommentParams {
    #[serde(rename = "commentId")]
    pub comment_id: i64,
}

#[delete("/{snippetId}/comment")]
pub async fn remove_comment(
    app_data: web::Data<AppState>,
    path: web::Path<i64>,
    params: web::Query<RemoveCommentParams>,
    user_data: Option<web::ReqData<UserData>>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(user_data)?;
    let snippet_id = path.into_inner();

    let comments_count = app_data
        .ledger
        .remove_comment(snippet_id, params.comment_id, &user.id)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "comments_count": comments_count })))
}
