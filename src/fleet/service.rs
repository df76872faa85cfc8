use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use super::models::{NewTruck, Truck, TruckType, pick_truck};
use crate::context::FreightContext;
use crate::core_types::{CarrierId, TruckId};
use crate::error::{FreightError, FreightResult};

#[derive(Clone)]
pub struct FleetService {
    ctx: Arc<FreightContext>,
}

impl FleetService {
    pub fn new(ctx: Arc<FreightContext>) -> Self {
        Self { ctx }
    }

    /// Register a truck; new trucks start active
    pub async fn add_truck(&self, carrier_id: CarrierId, input: NewTruck) -> FreightResult<Truck> {
        let truck_type = input
            .truck_type
            .parse::<TruckType>()
            .map_err(FreightError::validation)?;
        if input.max_weight_kg <= Decimal::ZERO {
            return Err(FreightError::validation(
                "max weight must be greater than zero",
            ));
        }
        let plate_number = input.plate_number.trim().to_ascii_uppercase();
        if plate_number.is_empty() {
            return Err(FreightError::validation("plate number is required"));
        }

        let truck = Truck {
            id: TruckId::new(),
            carrier_id,
            truck_type,
            max_weight_kg: input.max_weight_kg,
            plate_number,
            is_active: true,
            created_at: self.ctx.clock.now(),
        };
        self.ctx.store.insert_truck(&truck).await?;
        info!(carrier_id = %carrier_id, truck_id = %truck.id, truck_type = %truck_type, "truck added");
        Ok(truck)
    }

    pub async fn list_trucks(&self, carrier_id: CarrierId) -> FreightResult<Vec<Truck>> {
        self.ctx.store.list_trucks(carrier_id).await
    }

    /// Toggle a truck the carrier owns
    pub async fn set_truck_active(
        &self,
        carrier_id: CarrierId,
        truck_id: TruckId,
        active: bool,
    ) -> FreightResult<Truck> {
        let mut truck = self.owned_truck(carrier_id, truck_id).await?;
        if !self.ctx.store.set_truck_active(truck_id, active).await? {
            return Err(FreightError::not_found("truck"));
        }
        truck.is_active = active;
        info!(carrier_id = %carrier_id, truck_id = %truck_id, active, "truck availability changed");
        Ok(truck)
    }

    /// Truck owned by the carrier; someone else's truck is `NotFound`
    pub async fn owned_truck(&self, carrier_id: CarrierId, truck_id: TruckId) -> FreightResult<Truck> {
        match self.ctx.store.get_truck(truck_id).await? {
            Some(t) if t.carrier_id == carrier_id => Ok(t),
            _ => Err(FreightError::not_found("truck")),
        }
    }

    pub async fn active_truck_count(&self, carrier_id: CarrierId) -> FreightResult<u64> {
        Ok(self
            .list_trucks(carrier_id)
            .await?
            .iter()
            .filter(|t| t.is_active)
            .count() as u64)
    }

    /// Truck an accepted offer gets bound to, see [`pick_truck`]
    pub async fn first_active_truck(
        &self,
        carrier_id: CarrierId,
        preferred: Option<TruckType>,
    ) -> FreightResult<Option<Truck>> {
        let trucks = self.list_trucks(carrier_id).await?;
        Ok(pick_truck(&trucks, preferred).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{SeededEntropy, SystemClock};
    use crate::notify::mock::RecordingSink;

    fn fleet() -> FleetService {
        let ctx = FreightContext::in_memory(
            Arc::new(RecordingSink::new()),
            Arc::new(SystemClock),
            Arc::new(SeededEntropy::new(3)),
        );
        FleetService::new(Arc::new(ctx))
    }

    fn van(plate: &str) -> NewTruck {
        NewTruck {
            truck_type: "van".into(),
            max_weight_kg: Decimal::new(1200, 0),
            plate_number: plate.into(),
        }
    }

    #[tokio::test]
    async fn test_add_and_toggle() {
        let fleet = fleet();
        let carrier = CarrierId::new();
        let truck = fleet.add_truck(carrier, van(" ab-123 ")).await.unwrap();
        assert_eq!(truck.plate_number, "AB-123");
        assert!(truck.is_active);
        assert_eq!(fleet.active_truck_count(carrier).await.unwrap(), 1);

        fleet.set_truck_active(carrier, truck.id, false).await.unwrap();
        assert_eq!(fleet.active_truck_count(carrier).await.unwrap(), 0);
        assert!(fleet.first_active_truck(carrier, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let fleet = fleet();
        let carrier = CarrierId::new();

        let mut bad_type = van("X1");
        bad_type.truck_type = "zeppelin".into();
        assert!(matches!(
            fleet.add_truck(carrier, bad_type).await,
            Err(FreightError::ValidationFailed(_))
        ));

        let mut bad_weight = van("X2");
        bad_weight.max_weight_kg = Decimal::ZERO;
        assert!(matches!(
            fleet.add_truck(carrier, bad_weight).await,
            Err(FreightError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_plate_conflicts() {
        let fleet = fleet();
        fleet.add_truck(CarrierId::new(), van("dup-1")).await.unwrap();
        let err = fleet.add_truck(CarrierId::new(), van("DUP-1")).await.unwrap_err();
        assert!(matches!(err, FreightError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cannot_toggle_foreign_truck() {
        let fleet = fleet();
        let truck = fleet.add_truck(CarrierId::new(), van("own-1")).await.unwrap();
        let err = fleet
            .set_truck_active(CarrierId::new(), truck.id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, FreightError::NotFound(_)));
    }
}
