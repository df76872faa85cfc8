//! Core identifier and paging types shared by every component.
//!
//! All entity ids are UUID newtypes so that a `ShipmentId` can never be
//! passed where an `OfferId` is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random id
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            #[inline]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// Authenticated identity (owned by the external auth service)
    UserId
);
entity_id!(
    /// Merchant (shipper) profile id
    MerchantId
);
entity_id!(
    /// Truck account (carrier) id
    CarrierId
);
entity_id!(
    /// Driver profile id
    DriverId
);
entity_id!(TruckId);
entity_id!(
    /// Shipment request id
    RequestId
);
entity_id!(OfferId);
entity_id!(ShipmentId);
entity_id!(InvitationId);
entity_id!(NotificationId);

// ============================================================================
// Paging
// ============================================================================

fn default_page_number() -> u32 {
    1
}

fn default_page_size() -> u32 {
    PageRequest::DEFAULT_PAGE_SIZE
}

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page_number")]
    pub page_number: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Create a page request, clamping out-of-range values
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number: page_number.max(1),
            page_size: page_size.clamp(1, Self::MAX_PAGE_SIZE),
        }
    }

    /// Same request with values forced into range
    pub fn normalized(self) -> Self {
        Self::new(self.page_number, self.page_size)
    }

    #[inline]
    pub fn offset(&self) -> usize {
        (self.page_number.saturating_sub(1) as usize) * self.page_size as usize
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.page_size as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PAGE_SIZE)
    }
}

/// One page of results plus the total row count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_count: u64,
}

impl<T> Page<T> {
    /// Cut a page out of an already ordered list
    pub fn slice(all: Vec<T>, req: PageRequest) -> Self {
        let req = req.normalized();
        let total_count = all.len() as u64;
        let items = all
            .into_iter()
            .skip(req.offset())
            .take(req.limit())
            .collect();
        Self {
            items,
            page_number: req.page_number,
            page_size: req.page_size,
            total_count,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.page_size as u64)
    }
}
