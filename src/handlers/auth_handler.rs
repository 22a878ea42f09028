use actix_web::{
    cookie::{time, Cookie, SameSite},
    post, web, HttpRequest, HttpResponse,
};
use bcrypt::{hash, verify};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::error;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::now_rfc3339,
    error::AppError,
    models::{Claims, CredentialsRow, User, UserData},
    utils::test_password,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct UserRegisterRequest {
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub password: String,
}

#[post("/register")]
pub async fn register(
    app_state: web::Data<AppState>,
    register_json: web::Json<UserRegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let req = register_json.into_inner();

    if let Some(err) = test_password(&req.password) {
        return Err(AppError::InvalidArgument(err.to_string()));
    }

    let password_hash = hash(&req.password, 12).map_err(|e| {
        error!("password hash failed: {e}");
        AppError::Internal
    })?;

    let user_id = Uuid::new_v4().to_string();
    let res = sqlx::query(
        "INSERT INTO users (id, email, username, full_name, password_hash, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(&user_id)
    .bind(&req.email)
    .bind(&req.username)
    .bind(&req.full_name)
    .bind(&password_hash)
    .bind(now_rfc3339())
    .execute(&app_state.db)
    .await;

    match res {
        Ok(_) => Ok(HttpResponse::Created().json(serde_json::json!({ "id": user_id, "error": null }))),
        Err(sqlx::Error::Database(db)) if db.message().contains("email") => {
            Err(AppError::Conflict("Email already registered"))
        }
        Err(sqlx::Error::Database(db)) if db.message().contains("username") => {
            Err(AppError::Conflict("Username taken"))
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct UserLoginRequest {
    pub email: String,
    pub password: String,
}

#[post("/login")]
pub async fn login(
    app_state: web::Data<AppState>,
    req: HttpRequest,
    login_json: web::Json<UserLoginRequest>,
) -> Result<HttpResponse, AppError> {
    let body = login_json.into_inner();

    let row: Option<CredentialsRow> =
        sqlx::query_as("SELECT id, password_hash FROM users WHERE email = $1")
            .bind(&body.email)
            .fetch_optional(&app_state.db)
            .await?;

    let creds = row.ok_or(AppError::Unauthenticated)?;

    match verify(&body.password, &creds.password_hash) {
        Ok(true) => {}
        Ok(false) => return Err(AppError::Unauthenticated),
        Err(e) => {
            error!("password verification failed: {e}");
            return Err(AppError::Internal);
        }
    }

    let user_id = creds.id;
    let now = Utc::now();
    let access_exp = now + ChronoDuration::minutes(15);
    let refresh_exp = now + ChronoDuration::hours(24);

    let access_claims = Claims {
        exp: access_exp.timestamp() as usize,
        user: UserData { id: user_id.clone() },
    };
    let refresh_claims = Claims {
        exp: refresh_exp.timestamp() as usize,
        user: UserData { id: user_id.clone() },
    };

    let access_token = encode(
        &Header::default(),
        &access_claims,
        &EncodingKey::from_secret(app_state.jwt_access_secret.as_bytes()),
    )
    .map_err(|e| {
        error!("access token creation failed: {e}");
        AppError::Internal
    })?;

    let refresh_token = encode(
        &Header::default(),
        &refresh_claims,
        &EncodingKey::from_secret(app_state.jwt_refresh_secret.as_bytes()),
    )
    .map_err(|e| {
        error!("refresh token creation failed: {e}");
        AppError::Internal
    })?;

    let user_agent = req
        .headers()
        .get("User-Agent")
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);
    let ip_address = req
        .connection_info()
        .realip_remote_addr()
        .map(str::to_owned);

    let device_id = match req.cookie("device_id").map(|c| c.value().to_string()) {
        Some(id) => id,
        None => Uuid::new_v4().to_string(),
    };

    let updated = sqlx::query(
        "UPDATE user_sessions
            SET refresh_token = $1,
                user_agent    = $2,
                ip_address    = $3,
                last_used_at  = $4
          WHERE user_id   = $5
            AND device_id = $6
            AND revoked   = 0
         RETURNING id",
    )
    .bind(&refresh_token)
    .bind(&user_agent)
    .bind(&ip_address)
    .bind(now_rfc3339())
    .bind(&user_id)
    .bind(&device_id)
    .fetch_optional(&app_state.db)
    .await?;

    if updated.is_none() {
        sqlx::query(
            "INSERT INTO user_sessions
               (id, user_id, refresh_token, user_agent, ip_address, device_id, created_at, last_used_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&user_id)
        .bind(&refresh_token)
        .bind(&user_agent)
        .bind(&ip_address)
        .bind(&device_id)
        .bind(now_rfc3339())
        .bind(now_rfc3339())
        .execute(&app_state.db)
        .await?;
    }

    let refresh_cookie = Cookie::build("jwt", refresh_token.clone())
        .http_only(true)
        .same_site(SameSite::None)
        .secure(true)
        .max_age(time::Duration::hours(24))
        .path("/")
        .finish();

    let device_cookie = Cookie::build("device_id", device_id.clone())
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .max_age(time::Duration::days(365))
        .path("/")
        .finish();

    Ok(HttpResponse::Ok()
        .cookie(refresh_cookie)
        .cookie(device_cookie)
        .json(serde_json::json!({ "accessToken": access_token, "error": null })))
}

#[post("/logout")]
pub async fn logout(
    app_state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let refresh_token = match req.cookie("jwt") {
        Some(c) => c.value().to_string(),
        None => {
            return Ok(HttpResponse::NoContent().json(serde_json::json!({ "error": "No cookie" })));
        }
    };

    let claims = decode::<Claims>(
        &refresh_token,
        &DecodingKey::from_secret(app_state.jwt_refresh_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Forbidden("Invalid refresh token"))?
    .claims;
    let user_id = claims.user.id;

    let device_id = match req.cookie("device_id") {
        Some(c) => c.value().to_string(),
        None => {
            return Ok(HttpResponse::NoContent()
                .json(serde_json::json!({ "error": "No device_id cookie" })));
        }
    };

    sqlx::query(
        "UPDATE user_sessions
            SET revoked = 1
          WHERE user_id   = $1
            AND device_id = $2",
    )
    .bind(&user_id)
    .bind(&device_id)
    .execute(&app_state.db)
    .await?;

    let mut clear_jwt = Cookie::build("jwt", "")
        .http_only(true)
        .same_site(SameSite::None)
        .secure(true)
        .max_age(time::Duration::hours(24))
        .path("/")
        .finish();
    clear_jwt.make_removal();

    let mut clear_dev = Cookie::build("device_id", "")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .max_age(time::Duration::days(365))
        .path("/")
        .finish();
    clear_dev.make_removal();

    Ok(HttpResponse::Ok()
        .cookie(clear_jwt)
        .cookie(clear_dev)
        .json(serde_json::json!({ "error": null })))
}

#[post("/refresh")]
pub async fn refresh(
    app_state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let refresh_token = req
        .cookie("jwt")
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthenticated)?;
    let device_id = req
        .cookie("device_id")
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthenticated)?;

    let token_data = decode::<Claims>(
        &refresh_token,
        &DecodingKey::from_secret(app_state.jwt_refresh_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Forbidden("Invalid refresh token"))?;
    let user_id = token_data.claims.user.id;

    let session = sqlx::query(
        "SELECT id
           FROM user_sessions
          WHERE user_id       = $1
            AND device_id     = $2
            AND refresh_token = $3
            AND revoked       = 0",
    )
    .bind(&user_id)
    .bind(&device_id)
    .bind(&refresh_token)
    .fetch_optional(&app_state.db)
    .await?;

    if session.is_none() {
        return Err(AppError::Unauthenticated);
    }

    let user: User = sqlx::query_as(
        "SELECT id, email, username, full_name, profile_picture_url, created_at, updated_at
           FROM users
          WHERE id = $1",
    )
    .bind(&user_id)
    .fetch_one(&app_state.db)
    .await?;

    let exp = Utc::now() + ChronoDuration::minutes(15);
    let claims = Claims {
        exp: exp.timestamp() as usize,
        user: UserData { id: user_id },
    };

    let access_token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(app_state.jwt_access_secret.as_bytes()),
    )
    .map_err(|e| {
        error!("access token creation failed: {e}");
        AppError::Internal
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "accessToken": access_token,
        "user": {
            "email": user.email,
            "username": user.username,
            "profilePicture": user.profile_picture_url,
        },
        "error": null
    })))
}
