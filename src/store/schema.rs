//! PostgreSQL schema.
//!
//! Status and enum columns are SMALLINT ids. Uniqueness rules that the
//! lifecycle relies on are enforced by indexes, not only by application
//! checks.

use anyhow::{Context, Result};
use sqlx::PgPool;

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users_tb (
    user_id       UUID PRIMARY KEY,
    full_name     TEXT NOT NULL,
    phone_number  TEXT NOT NULL UNIQUE,
    email         TEXT,
    role          SMALLINT NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL
)"#;

const CREATE_MERCHANTS: &str = r#"
CREATE TABLE IF NOT EXISTS merchant_profiles_tb (
    merchant_id   UUID PRIMARY KEY,
    user_id       UUID NOT NULL UNIQUE REFERENCES users_tb(user_id),
    avatar_url    TEXT,
    is_verified   BOOLEAN NOT NULL DEFAULT FALSE,
    created_at    TIMESTAMPTZ NOT NULL
)"#;

const CREATE_TRUCK_ACCOUNTS: &str = r#"
CREATE TABLE IF NOT EXISTS truck_accounts_tb (
    carrier_id             UUID PRIMARY KEY,
    user_id                UUID NOT NULL UNIQUE REFERENCES users_tb(user_id),
    display_name           TEXT NOT NULL,
    avatar_url             TEXT,
    national_id_front_url  TEXT,
    national_id_back_url   TEXT,
    is_available           BOOLEAN NOT NULL DEFAULT TRUE,
    is_verified            BOOLEAN NOT NULL DEFAULT FALSE,
    created_at             TIMESTAMPTZ NOT NULL
)"#;

const CREATE_DRIVERS: &str = r#"
CREATE TABLE IF NOT EXISTS driver_profiles_tb (
    driver_id              UUID PRIMARY KEY,
    user_id                UUID NOT NULL UNIQUE REFERENCES users_tb(user_id),
    full_name              TEXT NOT NULL,
    avatar_url             TEXT,
    national_id_front_url  TEXT,
    national_id_back_url   TEXT,
    is_verified            BOOLEAN NOT NULL DEFAULT FALSE,
    created_at             TIMESTAMPTZ NOT NULL
)"#;

const CREATE_TRUCKS: &str = r#"
CREATE TABLE IF NOT EXISTS trucks_tb (
    truck_id       UUID PRIMARY KEY,
    carrier_id     UUID NOT NULL REFERENCES truck_accounts_tb(carrier_id),
    truck_type     SMALLINT NOT NULL,
    max_weight_kg  NUMERIC(12, 2) NOT NULL,
    plate_number   TEXT NOT NULL,
    is_active      BOOLEAN NOT NULL DEFAULT TRUE,
    created_at     TIMESTAMPTZ NOT NULL
)"#;

const CREATE_REQUESTS: &str = r#"
CREATE TABLE IF NOT EXISTS shipment_requests_tb (
    request_id           UUID PRIMARY KEY,
    merchant_id          UUID NOT NULL REFERENCES merchant_profiles_tb(merchant_id),
    request_number       TEXT NOT NULL UNIQUE,
    required_truck_type  SMALLINT,
    pickup_address       TEXT NOT NULL,
    pickup_area          TEXT,
    pickup_lat           DOUBLE PRECISION,
    pickup_lng           DOUBLE PRECISION,
    dropoff_address      TEXT NOT NULL,
    dropoff_area         TEXT,
    dropoff_lat          DOUBLE PRECISION,
    dropoff_lng          DOUBLE PRECISION,
    sender_name          TEXT NOT NULL,
    sender_phone         TEXT NOT NULL,
    cargo_description    TEXT NOT NULL,
    parcel_type          TEXT,
    weight_kg            NUMERIC(12, 2) NOT NULL CHECK (weight_kg > 0),
    cargo_size           TEXT,
    cargo_count          INTEGER NOT NULL CHECK (cargo_count >= 1),
    delivery_date        DATE NOT NULL,
    time_from            TIME,
    time_to              TIME,
    payment_method       SMALLINT NOT NULL,
    notes                TEXT,
    status               SMALLINT NOT NULL,
    created_at           TIMESTAMPTZ NOT NULL
)"#;

const CREATE_OFFERS: &str = r#"
CREATE TABLE IF NOT EXISTS shipment_offers_tb (
    offer_id    UUID PRIMARY KEY,
    request_id  UUID NOT NULL REFERENCES shipment_requests_tb(request_id),
    carrier_id  UUID NOT NULL REFERENCES truck_accounts_tb(carrier_id),
    price       NUMERIC(14, 2) NOT NULL CHECK (price > 0),
    notes       TEXT,
    status      SMALLINT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    expires_at  TIMESTAMPTZ NOT NULL,
    UNIQUE (request_id, carrier_id)
)"#;

const CREATE_SHIPMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS shipments_tb (
    shipment_id          UUID PRIMARY KEY,
    request_id           UUID NOT NULL UNIQUE REFERENCES shipment_requests_tb(request_id),
    accepted_offer_id    UUID NOT NULL UNIQUE REFERENCES shipment_offers_tb(offer_id),
    truck_id             UUID NOT NULL REFERENCES trucks_tb(truck_id),
    driver_id            UUID REFERENCES driver_profiles_tb(driver_id),
    status               SMALLINT NOT NULL,
    created_at           TIMESTAMPTZ NOT NULL,
    started_at           TIMESTAMPTZ,
    completed_at         TIMESTAMPTZ,
    cancelled_at         TIMESTAMPTZ,
    current_lat          DOUBLE PRECISION,
    current_lng          DOUBLE PRECISION,
    location_updated_at  TIMESTAMPTZ
)"#;

const CREATE_INVITATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS driver_invitations_tb (
    invitation_id  UUID PRIMARY KEY,
    shipment_id    UUID NOT NULL REFERENCES shipments_tb(shipment_id),
    token          TEXT NOT NULL UNIQUE,
    expires_at     TIMESTAMPTZ NOT NULL,
    is_used        BOOLEAN NOT NULL DEFAULT FALSE,
    created_at     TIMESTAMPTZ NOT NULL
)"#;

const CREATE_NOTIFICATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS notifications_tb (
    notification_id  UUID PRIMARY KEY,
    user_id          UUID NOT NULL,
    kind             SMALLINT NOT NULL,
    title            TEXT NOT NULL,
    body             TEXT NOT NULL,
    data             JSONB NOT NULL DEFAULT 'null'::jsonb,
    seen_at          TIMESTAMPTZ,
    created_at       TIMESTAMPTZ NOT NULL
)"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS trucks_plate_uq ON trucks_tb (LOWER(plate_number))",
    "CREATE INDEX IF NOT EXISTS trucks_carrier_idx ON trucks_tb (carrier_id, created_at)",
    "CREATE INDEX IF NOT EXISTS requests_status_idx ON shipment_requests_tb (status, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS requests_merchant_idx ON shipment_requests_tb (merchant_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS offers_carrier_idx ON shipment_offers_tb (carrier_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS offers_pending_expiry_idx ON shipment_offers_tb (expires_at) WHERE status = 0",
    "CREATE INDEX IF NOT EXISTS shipments_driver_idx ON shipments_tb (driver_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS invitations_shipment_idx ON driver_invitations_tb (shipment_id) WHERE NOT is_used",
    "CREATE INDEX IF NOT EXISTS notifications_user_idx ON notifications_tb (user_id, created_at DESC)",
];

/// Create tables and indexes if missing
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing freight schema...");

    for (name, ddl) in [
        ("users_tb", CREATE_USERS),
        ("merchant_profiles_tb", CREATE_MERCHANTS),
        ("truck_accounts_tb", CREATE_TRUCK_ACCOUNTS),
        ("driver_profiles_tb", CREATE_DRIVERS),
        ("trucks_tb", CREATE_TRUCKS),
        ("shipment_requests_tb", CREATE_REQUESTS),
        ("shipment_offers_tb", CREATE_OFFERS),
        ("shipments_tb", CREATE_SHIPMENTS),
        ("driver_invitations_tb", CREATE_INVITATIONS),
        ("notifications_tb", CREATE_NOTIFICATIONS),
    ] {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create {name}"))?;
    }

    for ddl in CREATE_INDEXES {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create index: {ddl}"))?;
    }

    tracing::info!("Freight schema initialized successfully");
    Ok(())
}
