use std::sync::Arc;

use super::models::{DriverProfile, MerchantProfile, ProfileId, Role, TruckAccount};
use crate::context::FreightContext;
use crate::core_types::UserId;
use crate::error::{FreightError, FreightResult};

/// Maps an authenticated user id to the role profile acting on its behalf
#[derive(Clone)]
pub struct ProfileResolver {
    ctx: Arc<FreightContext>,
}

impl ProfileResolver {
    pub fn new(ctx: Arc<FreightContext>) -> Self {
        Self { ctx }
    }

    pub async fn resolve(&self, user_id: UserId, role: Role) -> FreightResult<ProfileId> {
        Ok(match role {
            Role::Merchant => ProfileId::Merchant(self.merchant(user_id).await?.id),
            Role::TruckAccount => ProfileId::TruckAccount(self.carrier(user_id).await?.id),
            Role::Driver => ProfileId::Driver(self.driver(user_id).await?.id),
        })
    }

    pub async fn merchant(&self, user_id: UserId) -> FreightResult<MerchantProfile> {
        self.ctx
            .store
            .merchant_by_user(user_id)
            .await?
            .ok_or_else(|| FreightError::not_found("merchant profile"))
    }

    pub async fn carrier(&self, user_id: UserId) -> FreightResult<TruckAccount> {
        self.ctx
            .store
            .carrier_by_user(user_id)
            .await?
            .ok_or_else(|| FreightError::not_found("truck account"))
    }

    pub async fn driver(&self, user_id: UserId) -> FreightResult<DriverProfile> {
        self.ctx
            .store
            .driver_by_user(user_id)
            .await?
            .ok_or_else(|| FreightError::not_found("driver profile"))
    }
}
