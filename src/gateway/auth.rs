//! Bearer JWT authentication and role-scoped callers.
//!
//! `jwt_auth_middleware` verifies the token and stores its [`Claims`] in
//! the request extensions. The caller extractors then check the role claim
//! and resolve the acting profile.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, StatusCode, header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::state::AppState;
use super::types::{ApiError, error_codes};
use crate::core_types::{CarrierId, DriverId, MerchantId, UserId};
use crate::profile::Role;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<UserId, ApiError> {
        self.sub
            .parse()
            .map_err(|_| ApiError::unauthorized("Invalid user ID in token"))
    }
}

pub struct JwtService {
    jwt_secret: String,
    ttl: Duration,
}

impl JwtService {
    pub fn new(jwt_secret: impl Into<String>, ttl_hours: i64) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user_id: UserId, role: Role) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            exp: (now + self.ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .context("Failed to generate token")
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(token, &decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}

pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::UNAUTHORIZED,
                error_codes::MISSING_AUTH,
                "Missing Authorization header",
            )
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Invalid token format"))?;

    match state.jwt.verify_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(_) => Err(ApiError::unauthorized("Invalid or expired token")),
    }
}

fn claims_for(parts: &Parts, role: Role) -> Result<(UserId, Role), ApiError> {
    let claims = parts
        .extensions
        .get::<Claims>()
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;
    if claims.role != role {
        return Err(ApiError::forbidden(format!("{role} role required")));
    }
    Ok((claims.user_id()?, claims.role))
}

/// Authenticated merchant
#[derive(Debug, Clone, Copy)]
pub struct MerchantCaller {
    pub user_id: UserId,
    pub merchant_id: MerchantId,
}

impl FromRequestParts<Arc<AppState>> for MerchantCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let (user_id, _) = claims_for(parts, Role::Merchant)?;
        let profile = state
            .services
            .resolver
            .merchant(user_id)
            .await
            .map_err(|_| ApiError::forbidden("merchant profile not found"))?;
        Ok(Self {
            user_id,
            merchant_id: profile.id,
        })
    }
}

/// Authenticated truck account
#[derive(Debug, Clone, Copy)]
pub struct CarrierCaller {
    pub user_id: UserId,
    pub carrier_id: CarrierId,
}

impl FromRequestParts<Arc<AppState>> for CarrierCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let (user_id, _) = claims_for(parts, Role::TruckAccount)?;
        let account = state
            .services
            .resolver
            .carrier(user_id)
            .await
            .map_err(|_| ApiError::forbidden("truck account not found"))?;
        Ok(Self {
            user_id,
            carrier_id: account.id,
        })
    }
}

/// Authenticated driver.
///
/// A carrier that assigned itself keeps its truck-account token and gains a
/// driver profile, so both roles are accepted as long as the profile exists.
#[derive(Debug, Clone, Copy)]
pub struct DriverCaller {
    pub user_id: UserId,
    pub driver_id: DriverId,
}

impl FromRequestParts<Arc<AppState>> for DriverCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let (user_id, _) = claims_for(parts, Role::Driver)
            .or_else(|_| claims_for(parts, Role::TruckAccount))
            .map_err(|_| ApiError::forbidden("driver role required"))?;
        let profile = state
            .services
            .resolver
            .driver(user_id)
            .await
            .map_err(|_| ApiError::forbidden("driver profile not found"))?;
        Ok(Self {
            user_id,
            driver_id: profile.id,
        })
    }
}

/// Any authenticated user
#[derive(Debug, Clone, Copy)]
pub struct AnyCaller {
    pub user_id: UserId,
    pub role: Role,
}

impl<S: Send + Sync> FromRequestParts<S> for AnyCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;
        Ok(Self {
            user_id: claims.user_id()?,
            role: claims.role,
        })
    }
}
