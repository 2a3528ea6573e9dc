use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use db::{
    models::{
        User, UserBehavior,
        user::{CreateUser, UpdateProfile},
        user_behavior::CreateUserBehavior,
    },
    types::UserRole,
};
use serde::{Deserialize, Serialize};
use utils::response::ApiResponse;
use utils_jwt::{TokenKind, TokenPair};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
    pub password_confirm: String,
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub tokens: TokenPair,
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::Internal(format!("Failed to hash password: {err}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<AuthResponse>>), ApiError> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err("Username must not be empty".into());
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err("Password must be at least 8 characters".into());
    }
    if payload.password != payload.password_confirm {
        return Err("Passwords do not match".into());
    }

    let user = User::create(
        &state.db.pool,
        &CreateUser {
            username: username.to_string(),
            email: payload.email.trim().to_string(),
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
            password_hash: hash_password(&payload.password)?,
            role: payload.role,
        },
    )
    .await?;

    let tokens = state.tokens.generate_pair(user.id, &user.role.to_string())?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(AuthResponse { user, tokens })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<AuthResponse>>, ApiError> {
    let user = User::find_by_username(&state.db.pool, &payload.username)
        .await?
        .filter(|user| verify_password(&payload.password, &user.password_hash))
        .ok_or(ApiError::Unauthorized)?;

    UserBehavior::record(
        &state.db.pool,
        user.id,
        &CreateUserBehavior {
            action_type: "user_login".to_string(),
            ..Default::default()
        },
    )
    .await?;

    let tokens = state.tokens.generate_pair(user.id, &user.role.to_string())?;
    Ok(ResponseJson(ApiResponse::success(AuthResponse {
        user,
        tokens,
    })))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<ResponseJson<ApiResponse<TokenPair>>, ApiError> {
    let claims = state.tokens.verify(&payload.refresh, TokenKind::Refresh)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::Unauthorized)?;
    let user = User::find_by_id(&state.db.pool, user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let tokens = state.tokens.generate_pair(user.id, &user.role.to_string())?;
    Ok(ResponseJson(ApiResponse::success(tokens)))
}

pub async fn get_profile(
    Extension(user): Extension<User>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn update_profile(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfile>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    if payload.email.as_deref().is_some_and(|e| e.trim().is_empty()) {
        return Err("Email must not be empty".into());
    }
    let updated = User::update_profile(&state.db.pool, user.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// Routes reachable without a token.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/profile", get(get_profile).patch(update_profile))
}
