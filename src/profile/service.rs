use std::sync::Arc;

use tracing::info;

use super::models::{
    DriverProfile, MerchantProfile, NewUser, ProfileId, ProfileUpdate, ProfileView, Role,
    RoleProfile, TruckAccount, User,
};
use super::resolver::ProfileResolver;
use crate::context::FreightContext;
use crate::core_types::{CarrierId, DriverId, MerchantId, UserId};
use crate::error::{FreightError, FreightResult};

/// Registration and self-service profile maintenance
#[derive(Clone)]
pub struct ProfileService {
    ctx: Arc<FreightContext>,
    resolver: ProfileResolver,
}

/// `Some("")` clears, `Some(v)` sets, `None` keeps
fn merge_optional(slot: &mut Option<String>, update: &Option<String>) {
    if let Some(v) = update {
        let v = v.trim();
        *slot = (!v.is_empty()).then(|| v.to_string());
    }
}

fn required(field: &str, value: &str) -> FreightResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(FreightError::validation(format!("{field} is required")));
    }
    Ok(v.to_string())
}

impl ProfileService {
    pub fn new(ctx: Arc<FreightContext>) -> Self {
        Self {
            resolver: ProfileResolver::new(ctx.clone()),
            ctx,
        }
    }

    /// Create the user and its role profile
    pub async fn register(&self, new_user: NewUser, role: Role) -> FreightResult<(User, ProfileId)> {
        let now = self.ctx.clock.now();
        let user = User {
            id: UserId::new(),
            full_name: required("full name", &new_user.full_name)?,
            phone_number: required("phone number", &new_user.phone_number)?,
            email: new_user
                .email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            role,
            created_at: now,
        };

        let (profile, profile_id) = match role {
            Role::Merchant => {
                let id = MerchantId::new();
                let p = MerchantProfile {
                    id,
                    user_id: user.id,
                    avatar_url: None,
                    is_verified: false,
                    created_at: now,
                };
                (RoleProfile::Merchant(p), ProfileId::Merchant(id))
            }
            Role::TruckAccount => {
                let id = CarrierId::new();
                let p = TruckAccount {
                    id,
                    user_id: user.id,
                    display_name: user.full_name.clone(),
                    avatar_url: None,
                    national_id_front_url: None,
                    national_id_back_url: None,
                    is_available: true,
                    is_verified: false,
                    created_at: now,
                };
                (RoleProfile::Carrier(p), ProfileId::TruckAccount(id))
            }
            Role::Driver => {
                let id = DriverId::new();
                let p = new_driver_profile(id, &user, now);
                (RoleProfile::Driver(p), ProfileId::Driver(id))
            }
        };

        self.ctx.store.register(&user, &profile).await?;
        info!(user_id = %user.id, role = %role, "user registered");
        Ok((user, profile_id))
    }

    async fn user(&self, user_id: UserId) -> FreightResult<User> {
        self.ctx
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| FreightError::not_found("user"))
    }

    pub async fn get_profile(&self, user_id: UserId, role: Role) -> FreightResult<ProfileView> {
        let user = self.user(user_id).await?;
        Ok(match role {
            Role::Merchant => merchant_view(&user, &self.resolver.merchant(user_id).await?),
            Role::TruckAccount => carrier_view(&user, &self.resolver.carrier(user_id).await?),
            Role::Driver => driver_view(&user, &self.resolver.driver(user_id).await?),
        })
    }

    pub async fn update_profile(
        &self,
        user_id: UserId,
        role: Role,
        update: ProfileUpdate,
    ) -> FreightResult<ProfileView> {
        let mut user = self.user(user_id).await?;
        if let Some(name) = &update.full_name {
            user.full_name = required("full name", name)?;
        }
        merge_optional(&mut user.email, &update.email);

        let view = match role {
            Role::Merchant => {
                let mut p = self.resolver.merchant(user_id).await?;
                merge_optional(&mut p.avatar_url, &update.avatar_url);
                self.ctx.store.update_merchant(&p).await?;
                merchant_view(&user, &p)
            }
            Role::TruckAccount => {
                let mut a = self.resolver.carrier(user_id).await?;
                if update.full_name.is_some() {
                    a.display_name = user.full_name.clone();
                }
                merge_optional(&mut a.avatar_url, &update.avatar_url);
                merge_optional(&mut a.national_id_front_url, &update.national_id_front_url);
                merge_optional(&mut a.national_id_back_url, &update.national_id_back_url);
                self.ctx.store.update_carrier(&a).await?;
                carrier_view(&user, &a)
            }
            Role::Driver => {
                let mut d = self.resolver.driver(user_id).await?;
                d.full_name = user.full_name.clone();
                merge_optional(&mut d.avatar_url, &update.avatar_url);
                merge_optional(&mut d.national_id_front_url, &update.national_id_front_url);
                merge_optional(&mut d.national_id_back_url, &update.national_id_back_url);
                self.ctx.store.update_driver(&d).await?;
                driver_view(&user, &d)
            }
        };

        self.ctx.store.update_user(&user).await?;
        Ok(view)
    }

    /// Existing driver profile of the user, created on first use
    pub async fn ensure_driver_profile(&self, user_id: UserId) -> FreightResult<DriverProfile> {
        if let Some(existing) = self.ctx.store.driver_by_user(user_id).await? {
            return Ok(existing);
        }
        let user = self.user(user_id).await?;
        let profile = new_driver_profile(DriverId::new(), &user, self.ctx.clock.now());
        match self.ctx.store.insert_driver_profile(&profile).await {
            Ok(()) => {
                info!(user_id = %user_id, driver_id = %profile.id, "driver profile created");
                Ok(profile)
            }
            // Lost a race with a concurrent creator
            Err(FreightError::Conflict(_)) => self.resolver.driver(user_id).await,
            Err(e) => Err(e),
        }
    }
}

pub(crate) fn new_driver_profile(
    id: DriverId,
    user: &User,
    now: chrono::DateTime<chrono::Utc>,
) -> DriverProfile {
    DriverProfile {
        id,
        user_id: user.id,
        full_name: user.full_name.clone(),
        avatar_url: None,
        national_id_front_url: None,
        national_id_back_url: None,
        is_verified: false,
        created_at: now,
    }
}

fn merchant_view(user: &User, p: &MerchantProfile) -> ProfileView {
    ProfileView {
        user_id: user.id,
        profile_id: ProfileId::Merchant(p.id),
        full_name: user.full_name.clone(),
        phone_number: user.phone_number.clone(),
        email: user.email.clone(),
        avatar_url: p.avatar_url.clone(),
        is_verified: p.is_verified,
        has_national_id: None,
    }
}

fn carrier_view(user: &User, a: &TruckAccount) -> ProfileView {
    ProfileView {
        user_id: user.id,
        profile_id: ProfileId::TruckAccount(a.id),
        full_name: a.display_name.clone(),
        phone_number: user.phone_number.clone(),
        email: user.email.clone(),
        avatar_url: a.avatar_url.clone(),
        is_verified: a.is_verified,
        has_national_id: Some(a.has_national_id()),
    }
}

fn driver_view(user: &User, d: &DriverProfile) -> ProfileView {
    ProfileView {
        user_id: user.id,
        profile_id: ProfileId::Driver(d.id),
        full_name: d.full_name.clone(),
        phone_number: user.phone_number.clone(),
        email: user.email.clone(),
        avatar_url: d.avatar_url.clone(),
        is_verified: d.is_verified,
        has_national_id: Some(d.has_national_id()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{SeededEntropy, SystemClock};
    use crate::notify::mock::RecordingSink;

    fn service() -> ProfileService {
        let ctx = FreightContext::in_memory(
            Arc::new(RecordingSink::new()),
            Arc::new(SystemClock),
            Arc::new(SeededEntropy::new(1)),
        );
        ProfileService::new(Arc::new(ctx))
    }

    fn new_user(phone: &str) -> NewUser {
        NewUser {
            full_name: "Rana Haddad".into(),
            phone_number: phone.into(),
            email: Some("  ".into()),
        }
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let svc = service();
        let (user, pid) = svc.register(new_user("100"), Role::TruckAccount).await.unwrap();
        assert_eq!(user.email, None);

        let resolved = svc.resolver.resolve(user.id, Role::TruckAccount).await.unwrap();
        assert_eq!(resolved, pid);

        let err = svc.resolver.resolve(user.id, Role::Merchant).await.unwrap_err();
        assert!(matches!(err, FreightError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_phone_conflicts() {
        let svc = service();
        svc.register(new_user("200"), Role::Merchant).await.unwrap();
        let err = svc.register(new_user("200"), Role::Driver).await.unwrap_err();
        assert!(matches!(err, FreightError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_sets_and_clears() {
        let svc = service();
        let (user, _) = svc.register(new_user("300"), Role::Driver).await.unwrap();

        let view = svc
            .update_profile(
                user.id,
                Role::Driver,
                ProfileUpdate {
                    avatar_url: Some("a.png".into()),
                    national_id_front_url: Some("f.png".into()),
                    national_id_back_url: Some("b.png".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(view.has_national_id, Some(true));
        assert_eq!(view.avatar_url.as_deref(), Some("a.png"));

        let view = svc
            .update_profile(
                user.id,
                Role::Driver,
                ProfileUpdate {
                    national_id_back_url: Some("".into()),
                    full_name: Some("Rana H.".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(view.has_national_id, Some(false));
        assert_eq!(view.full_name, "Rana H.");
        assert_eq!(view.avatar_url.as_deref(), Some("a.png"));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let svc = service();
        let (user, _) = svc.register(new_user("400"), Role::Merchant).await.unwrap();
        let err = svc
            .update_profile(
                user.id,
                Role::Merchant,
                ProfileUpdate {
                    full_name: Some(" ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FreightError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_ensure_driver_profile_is_idempotent() {
        let svc = service();
        let (user, _) = svc.register(new_user("500"), Role::TruckAccount).await.unwrap();

        let first = svc.ensure_driver_profile(user.id).await.unwrap();
        let second = svc.ensure_driver_profile(user.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.full_name, "Rana Haddad");
    }
}
