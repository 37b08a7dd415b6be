//! Session-based admin authentication.
//!
//! Login verifies the argon2 password hash and issues a JWT session token,
//! delivered both as an `HttpOnly` cookie and in the response body (the
//! admin UI uses the cookie, scripted clients the bearer header). The
//! `require_admin` middleware gates every `/api/admin` route. Tokens are
//! signed with `SESSION_SECRET`; without one a random secret is generated
//! at startup, which invalidates sessions on restart.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
    web::AppState,
};
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::prelude::*;
use serde::{Deserialize, Serialize};

const SESSION_TTL_HOURS: i64 = 24;
const SESSION_COOKIE: &str = "session";

/// Claims stored in the session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    /// Login name
    pub username: String,
    /// Whether the user may access the admin area
    pub admin: bool,
    /// Expiry timestamp (seconds)
    pub exp: i64,
    /// Issue timestamp (seconds)
    pub iat: i64,
}

/// Signing and verification keys for session tokens.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    /// Builds the keys from a shared secret.
    #[must_use]
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Builds the keys from `SESSION_SECRET`, or a random secret when unset.
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var("SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => Self::from_secret(&secret),
            _ => {
                use argon2::password_hash::{SaltString, rand_core::OsRng};
                tracing::warn!(
                    "SESSION_SECRET not set; sessions will not survive a restart"
                );
                let random = SaltString::generate(&mut OsRng);
                Self::from_secret(random.as_str())
            }
        }
    }

    /// Issues a session token for a user.
    pub fn issue(&self, user: &user::Model) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            admin: user.is_admin,
            exp: (now + Duration::hours(SESSION_TTL_HOURS)).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| Error::Config {
            message: format!("Failed to sign session token: {e}"),
        })
    }

    /// Verifies a token and returns its claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| Error::Unauthorized)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
}

/// POST /api/login
///
/// Failures are uniform to prevent username enumeration.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response> {
    let (Some(username), Some(password)) = (req.username, req.password) else {
        return Err(Error::validation("Fehlende Daten."));
    };

    let found = User::find()
        .filter(user::Column::Username.eq(username))
        .one(&state.db)
        .await?;

    let Some(account) = found else {
        return Err(Error::Unauthorized);
    };
    if !account.verify_password(&password) || !account.is_admin {
        return Err(Error::Unauthorized);
    }

    let token = state.sessions.issue(&account)?;
    let cookie = format!(
        "{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_TTL_HOURS * 3600
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            success: true,
            token,
        }),
    )
        .into_response())
}

/// POST /api/logout - clears the session cookie.
pub async fn logout() -> Response {
    let cookie = format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0");
    (
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "success": true })),
    )
        .into_response()
}

/// Middleware gating the admin routes.
///
/// Accepts the session cookie or an `Authorization: Bearer` header and
/// injects the verified [`Claims`] into the request extensions.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let token = token_from_headers(req.headers()).ok_or(Error::Unauthorized)?;
    let claims = state.sessions.verify(&token)?;
    if !claims.admin {
        return Err(Error::Unauthorized);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}
