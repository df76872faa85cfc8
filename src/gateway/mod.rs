pub mod auth;
pub mod handlers;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use handlers::{driver, health, merchant, shared, truck};
use state::AppState;

/// Full application router with state applied
pub fn router(state: Arc<AppState>) -> Router {
    let jwt = || from_fn_with_state(state.clone(), auth::jwt_auth_middleware);

    // ==========================================================================
    // Merchant
    // ==========================================================================
    let merchant_routes = Router::new()
        .route(
            "/requests",
            post(merchant::create_request).get(merchant::list_requests),
        )
        .route("/requests/{id}", get(merchant::get_request))
        .route("/requests/{id}/cancel", post(merchant::cancel_request))
        .route("/requests/{id}/offers", get(merchant::list_offers))
        .route(
            "/requests/{id}/offers/{offer_id}/accept",
            post(merchant::accept_offer),
        )
        .route("/shipments/{id}/tracking", get(merchant::tracking))
        .route(
            "/profile",
            get(merchant::get_profile).put(merchant::update_profile),
        )
        .layer(jwt());

    // ==========================================================================
    // Truck account
    // ==========================================================================
    let truck_routes = Router::new()
        .route("/requests/open", get(truck::browse_open))
        .route("/requests/{id}", get(truck::get_request))
        .route("/trucks", post(truck::add_truck).get(truck::list_trucks))
        .route("/trucks/{id}/active", put(truck::set_truck_active))
        .route("/offers", post(truck::submit_offer).get(truck::list_offers))
        .route("/shipments", get(truck::list_shipments))
        .route("/shipments/{id}", get(truck::get_shipment))
        .route("/shipments/{id}/assign-self", post(truck::assign_self))
        .route("/shipments/{id}/invite-driver", post(truck::invite_driver))
        .route("/shipments/{id}/cancel", post(truck::cancel_shipment))
        .route("/shipments/{id}/qr", get(truck::qr))
        .route("/profile", get(truck::get_profile).put(truck::update_profile))
        .layer(jwt());

    // ==========================================================================
    // Driver
    // ==========================================================================
    let driver_routes = Router::new()
        .route("/shipments", get(driver::list_shipments))
        .route("/shipments/{id}", get(driver::get_shipment))
        .route("/shipments/{id}/start", post(driver::start))
        .route("/shipments/{id}/arrive", post(driver::arrive))
        .route("/shipments/{id}/pause", post(driver::pause))
        .route("/shipments/{id}/resume", post(driver::resume))
        .route("/shipments/{id}/complete", post(driver::complete))
        .route("/shipments/{id}/location", put(driver::update_location))
        .route("/shipments/{id}/tracking", get(driver::tracking))
        .route(
            "/profile",
            get(driver::get_profile).put(driver::update_profile),
        )
        .layer(jwt());

    let notification_routes = Router::new()
        .route("/", get(shared::list_notifications))
        .route("/unseen-count", get(shared::unseen_count))
        .route("/seen", post(shared::mark_all_seen))
        .route("/{id}/seen", post(shared::mark_seen))
        .layer(jwt());

    let app = Router::new()
        .route("/api/v1/health", get(health::health_check))
        .route(
            "/api/v1/invitations/{token}/redeem",
            post(shared::redeem_invitation),
        )
        .nest("/api/v1/merchant", merchant_routes)
        .nest("/api/v1/truck", truck_routes)
        .nest("/api/v1/driver", driver_routes)
        .nest("/api/v1/notifications", notification_routes);

    // Development-only registration; build with `--no-default-features` to drop it.
    #[cfg(feature = "mock-api")]
    let app = app.nest(
        "/internal/mock",
        Router::new().route("/register", post(shared::mock_register)),
    );

    app.with_state(state)
}

/// Bind and serve until the listener fails
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!(%addr, "Gateway listening");
    tracing::info!("Merchant API: /api/v1/merchant/*");
    tracing::info!("Truck API:    /api/v1/truck/*");
    tracing::info!("Driver API:   /api/v1/driver/*");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
