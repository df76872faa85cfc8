use std::sync::Arc;

use super::auth::JwtService;
use crate::context::FreightServices;
use crate::db::Database;

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    pub services: FreightServices,
    pub jwt: Arc<JwtService>,
    /// Set when running on PostgreSQL; pinged by the health check
    pub pg_db: Option<Database>,
}

impl AppState {
    pub fn new(services: FreightServices, jwt: Arc<JwtService>, pg_db: Option<Database>) -> Self {
        Self {
            services,
            jwt,
            pg_db,
        }
    }
}
