//! Routes open to every role, plus the public invitation redemption

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};

use super::super::auth::AnyCaller;
use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, CountResponse, TokenResponse, ok};
use crate::core_types::{NotificationId, Page, PageRequest};
use crate::notify::Notification;
use crate::profile::{ProfileId, Role};
use crate::shipment::NewDriver;

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    caller: AnyCaller,
    Query(page): Query<PageRequest>,
) -> ApiResult<Page<Notification>> {
    ok(state.services.inbox.list(caller.user_id, page).await?)
}

pub async fn unseen_count(
    State(state): State<Arc<AppState>>,
    caller: AnyCaller,
) -> ApiResult<CountResponse> {
    let count = state.services.inbox.unseen_count(caller.user_id).await?;
    ok(CountResponse { count })
}

pub async fn mark_seen(
    State(state): State<Arc<AppState>>,
    caller: AnyCaller,
    Path(id): Path<NotificationId>,
) -> ApiResult<()> {
    state.services.inbox.mark_seen(caller.user_id, id).await?;
    ok(())
}

pub async fn mark_all_seen(
    State(state): State<Arc<AppState>>,
    caller: AnyCaller,
) -> ApiResult<CountResponse> {
    let count = state.services.inbox.mark_all_seen(caller.user_id).await?;
    ok(CountResponse { count })
}

/// POST /api/v1/invitations/{token}/redeem
///
/// Public: the invited person has no account yet. Creates it and answers
/// with a driver token.
pub async fn redeem_invitation(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(input): Json<NewDriver>,
) -> ApiResult<TokenResponse> {
    let (user, driver, _) = state
        .services
        .shipments
        .redeem_invitation(&token, input)
        .await?;
    let token = state
        .jwt
        .issue(user.id, Role::Driver)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    ok(TokenResponse {
        token,
        user_id: user.id,
        profile_id: ProfileId::Driver(driver.id),
    })
}

/// POST /internal/mock/register
///
/// Stand-in for the external identity service during development.
#[cfg(feature = "mock-api")]
pub async fn mock_register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<super::super::types::MockRegisterRequest>,
) -> ApiResult<TokenResponse> {
    let role: Role = req.role.parse().map_err(ApiError::bad_request)?;
    let (user, profile_id) = state
        .services
        .profiles
        .register(
            crate::profile::NewUser {
                full_name: req.full_name,
                phone_number: req.phone_number,
                email: req.email,
            },
            role,
        )
        .await?;
    let token = state
        .jwt
        .issue(user.id, role)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    tracing::info!(user_id = %user.id, role = %role, "mock registration");
    ok(TokenResponse {
        token,
        user_id: user.id,
        profile_id,
    })
}
