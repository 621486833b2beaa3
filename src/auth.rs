//! Cookie-carried JWT authentication and role gates.
//!
//! [`authenticate`] runs on every protected route: it decodes the session
//! cookie, checks that the account is still active and stores an
//! [`AuthenticatedUser`] in the request extensions. The `require_*`
//! middlewares then gate route groups by role.

use axum::{
    Extension,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use model::entities::{prelude::User, user, user::UserRole};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::schemas::AppState;

/// Claims carried by the session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub role: String,
    pub exp: u64,
    pub iat: u64,
}

/// The caller of a protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub username: String,
    pub role: UserRole,
}

impl TryFrom<Claims> for AuthenticatedUser {
    type Error = ApiError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let invalid = || ApiError::Unauthenticated("Invalid session token".to_string());
        Ok(Self {
            id: claims.sub.parse().map_err(|_| invalid())?,
            username: claims.username,
            role: claims.role.parse().map_err(|_| invalid())?,
        })
    }
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Persistence(format!("Failed to hash password: {}", e)))
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    bcrypt::verify(password, password_hash).unwrap_or(false)
}

/// Issue a signed HS256 session token for `user`.
pub fn issue_token(config: &AppConfig, user: &user::Model) -> Result<String, ApiError> {
    let now = Utc::now().timestamp().max(0) as u64;
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role.as_str().to_string(),
        exp: now + config.jwt_ttl_seconds,
        iat: now,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Persistence(format!("Token generation failed: {}", e)))
}

/// Decode and verify a session token.
pub fn validate_token(config: &AppConfig, token: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!("Token validation failed: {}", e);
        ApiError::Unauthenticated("Invalid or expired session".to_string())
    })
}

/// Value of the cookie called `name`, if the request carries one.
pub fn token_from_cookies(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(config: &AppConfig, token: &str) -> Result<HeaderValue, ApiError> {
    let secure = if config.cookie_secure { "; Secure" } else { "" };
    let cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}{}",
        config.cookie_name, token, config.jwt_ttl_seconds, secure
    );
    HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::Persistence(format!("Invalid cookie value: {}", e)))
}

/// `Set-Cookie` value that expires the session cookie.
pub fn expired_cookie(config: &AppConfig) -> Result<HeaderValue, ApiError> {
    let cookie = format!(
        "{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0",
        config.cookie_name
    );
    HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::Persistence(format!("Invalid cookie value: {}", e)))
}

/// Authentication middleware
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_cookies(request.headers(), &state.config.cookie_name)
        .ok_or_else(|| ApiError::Unauthenticated("Authentication required".to_string()))?;
    let caller = AuthenticatedUser::try_from(validate_token(&state.config, &token)?)?;

    match User::find_by_id(caller.id).one(&state.db).await? {
        Some(account) if account.is_active => {
            trace!(user_id = caller.id, role = %caller.role, "Request authenticated");
        }
        _ => {
            warn!(user_id = caller.id, "Session for missing or inactive user");
            return Err(ApiError::Unauthenticated(
                "Account is inactive or no longer exists".to_string(),
            ));
        }
    }

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

fn require(caller: &AuthenticatedUser, allowed: impl Fn(UserRole) -> bool) -> Result<(), ApiError> {
    if allowed(caller.role) {
        Ok(())
    } else {
        warn!(user_id = caller.id, role = %caller.role, "Role not permitted for route");
        Err(ApiError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ))
    }
}

/// Teacher-only routes
pub async fn require_teacher(
    Extension(caller): Extension<AuthenticatedUser>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require(&caller, |role| role == UserRole::Teacher)?;
    Ok(next.run(request).await)
}

/// Student-only routes
pub async fn require_student(
    Extension(caller): Extension<AuthenticatedUser>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require(&caller, |role| role == UserRole::Student)?;
    Ok(next.run(request).await)
}

/// Admin routes; superadmins pass as well.
pub async fn require_admin(
    Extension(caller): Extension<AuthenticatedUser>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require(&caller, |role| role.is_admin())?;
    Ok(next.run(request).await)
}
