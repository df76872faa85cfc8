//! Actor records: users and the three role profiles.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core_types::{CarrierId, DriverId, MerchantId, UserId};

/// Actor role carried in the auth token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Merchant,
    TruckAccount,
    Driver,
}

impl Role {
    #[inline]
    pub fn id(&self) -> i16 {
        match self {
            Role::Merchant => 1,
            Role::TruckAccount => 2,
            Role::Driver => 3,
        }
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Role::Merchant),
            2 => Some(Role::TruckAccount),
            3 => Some(Role::Driver),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Merchant => "merchant",
            Role::TruckAccount => "truck_account",
            Role::Driver => "driver",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merchant" => Ok(Role::Merchant),
            "truck_account" | "truckaccount" | "carrier" => Ok(Role::TruckAccount),
            "driver" => Ok(Role::Driver),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantProfile {
    pub id: MerchantId,
    pub user_id: UserId,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Carrier account owning a fleet of trucks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruckAccount {
    pub id: CarrierId,
    pub user_id: UserId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub national_id_front_url: Option<String>,
    pub national_id_back_url: Option<String>,
    pub is_available: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverProfile {
    pub id: DriverId,
    pub user_id: UserId,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub national_id_front_url: Option<String>,
    pub national_id_back_url: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl TruckAccount {
    pub fn has_national_id(&self) -> bool {
        has_both(&self.national_id_front_url, &self.national_id_back_url)
    }
}

impl DriverProfile {
    pub fn has_national_id(&self) -> bool {
        has_both(&self.national_id_front_url, &self.national_id_back_url)
    }
}

fn has_both(front: &Option<String>, back: &Option<String>) -> bool {
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    present(front) && present(back)
}

/// The role profile created together with a user
#[derive(Debug, Clone, PartialEq)]
pub enum RoleProfile {
    Merchant(MerchantProfile),
    Carrier(TruckAccount),
    Driver(DriverProfile),
}

impl RoleProfile {
    pub fn role(&self) -> Role {
        match self {
            RoleProfile::Merchant(_) => Role::Merchant,
            RoleProfile::Carrier(_) => Role::TruckAccount,
            RoleProfile::Driver(_) => Role::Driver,
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            RoleProfile::Merchant(p) => p.user_id,
            RoleProfile::Carrier(p) => p.user_id,
            RoleProfile::Driver(p) => p.user_id,
        }
    }
}

/// Result of resolving an authenticated user to a role profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", content = "profile_id", rename_all = "snake_case")]
pub enum ProfileId {
    Merchant(MerchantId),
    TruckAccount(CarrierId),
    Driver(DriverId),
}

/// Self-service registration fields
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewUser {
    pub full_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Partial profile update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub national_id_front_url: Option<String>,
    #[serde(default)]
    pub national_id_back_url: Option<String>,
}

/// Flattened profile read model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    pub user_id: UserId,
    #[serde(flatten)]
    pub profile_id: ProfileId,
    pub full_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
    /// Carrier and driver only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_national_id: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_id_roundtrip() {
        for role in [Role::Merchant, Role::TruckAccount, Role::Driver] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
    }

    #[test]
    fn test_role_parse_is_lenient() {
        assert_eq!("Carrier".parse::<Role>(), Ok(Role::TruckAccount));
        assert_eq!(" DRIVER ".parse::<Role>(), Ok(Role::Driver));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_has_national_id_requires_both_sides() {
        let mut driver = DriverProfile {
            id: DriverId::new(),
            user_id: UserId::new(),
            full_name: "Sam".into(),
            avatar_url: None,
            national_id_front_url: Some("front.png".into()),
            national_id_back_url: None,
            is_verified: false,
            created_at: Utc::now(),
        };
        assert!(!driver.has_national_id());
        driver.national_id_back_url = Some("  ".into());
        assert!(!driver.has_national_id());
        driver.national_id_back_url = Some("back.png".into());
        assert!(driver.has_national_id());
    }
}
