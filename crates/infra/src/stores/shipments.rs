use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use stocktrail_core::{ExpectedRevision, LocationCode, Revisioned, ShipmentId};
use stocktrail_shipping::{Shipment, ShipmentStatus};

use super::{StoreError, lock_poisoned};

/// Shipment table with a unique shipment-number index.
pub trait ShipmentStore: Send + Sync {
    /// Insert a new shipment; `Duplicate` if the id or number is taken.
    fn insert(&self, shipment: Shipment) -> Result<(), StoreError>;

    fn get(&self, id: ShipmentId) -> Result<Option<Shipment>, StoreError>;

    fn get_by_number(&self, number: &str) -> Result<Option<Shipment>, StoreError>;

    /// Filtered listing, ordered by shipment number.
    fn list(
        &self,
        status: Option<ShipmentStatus>,
        from_location: Option<&LocationCode>,
    ) -> Result<Vec<Shipment>, StoreError>;

    /// Replace a shipment row after a revision check against the stored row.
    fn update(&self, shipment: Shipment, expected: ExpectedRevision) -> Result<(), StoreError>;
}

impl<S> ShipmentStore for Arc<S>
where
    S: ShipmentStore + ?Sized,
{
    fn insert(&self, shipment: Shipment) -> Result<(), StoreError> {
        (**self).insert(shipment)
    }

    fn get(&self, id: ShipmentId) -> Result<Option<Shipment>, StoreError> {
        (**self).get(id)
    }

    fn get_by_number(&self, number: &str) -> Result<Option<Shipment>, StoreError> {
        (**self).get_by_number(number)
    }

    fn list(
        &self,
        status: Option<ShipmentStatus>,
        from_location: Option<&LocationCode>,
    ) -> Result<Vec<Shipment>, StoreError> {
        (**self).list(status, from_location)
    }

    fn update(&self, shipment: Shipment, expected: ExpectedRevision) -> Result<(), StoreError> {
        (**self).update(shipment, expected)
    }
}

#[derive(Default)]
struct Inner {
    by_id: HashMap<ShipmentId, Shipment>,
    by_number: HashMap<String, ShipmentId>,
}

/// In-memory shipment store.
#[derive(Default)]
pub struct InMemoryShipmentStore {
    inner: RwLock<Inner>,
}

impl InMemoryShipmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShipmentStore for InMemoryShipmentStore {
    fn insert(&self, shipment: Shipment) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        if inner.by_id.contains_key(&shipment.id()) {
            return Err(StoreError::Duplicate(format!("shipment {}", shipment.id())));
        }
        if inner.by_number.contains_key(shipment.shipment_number()) {
            return Err(StoreError::Duplicate(format!(
                "shipment number {}",
                shipment.shipment_number()
            )));
        }
        inner
            .by_number
            .insert(shipment.shipment_number().to_string(), shipment.id());
        inner.by_id.insert(shipment.id(), shipment);
        Ok(())
    }

    fn get(&self, id: ShipmentId) -> Result<Option<Shipment>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner.by_id.get(&id).cloned())
    }

    fn get_by_number(&self, number: &str) -> Result<Option<Shipment>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner
            .by_number
            .get(number)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    fn list(
        &self,
        status: Option<ShipmentStatus>,
        from_location: Option<&LocationCode>,
    ) -> Result<Vec<Shipment>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        let mut shipments: Vec<Shipment> = inner
            .by_id
            .values()
            .filter(|s| status.is_none_or(|st| s.status() == st))
            .filter(|s| from_location.is_none_or(|loc| s.from_location() == Some(loc)))
            .cloned()
            .collect();
        shipments.sort_by(|a, b| a.shipment_number().cmp(b.shipment_number()));
        Ok(shipments)
    }

    fn update(&self, shipment: Shipment, expected: ExpectedRevision) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        let stored = inner.by_id.get(&shipment.id()).ok_or_else(|| {
            StoreError::Storage(format!("shipment {} missing on update", shipment.id()))
        })?;
        if !expected.matches(stored.revision()) {
            return Err(StoreError::Conflict(format!(
                "shipment {} is at revision {}",
                shipment.id(),
                stored.revision()
            )));
        }
        inner.by_id.insert(shipment.id(), shipment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use stocktrail_core::{Lifecycle, ProductId};
    use stocktrail_shipping::{CreateShipment, NewShipmentLine, ShipmentCommand};

    fn shipment(number: &str) -> Shipment {
        let id = ShipmentId::new();
        let mut shipment = Shipment::empty(id);
        let events = shipment
            .handle(&ShipmentCommand::Create(CreateShipment {
                shipment_id: id,
                shipment_number: number.to_string(),
                from_location: LocationCode::new("WH-MAIN").unwrap(),
                to_location: LocationCode::new("CUSTOMER").unwrap(),
                planned_ship_date: None,
                carrier: None,
                tracking_number: None,
                notes: None,
                lines: vec![NewShipmentLine {
                    product_id: ProductId::new(),
                    quantity_planned: 5,
                    notes: None,
                }],
                occurred_at: Utc::now(),
            }))
            .unwrap();
        shipment.apply(&events[0]);
        shipment
    }

    #[test]
    fn duplicate_number_is_rejected() {
        let store = InMemoryShipmentStore::new();
        store.insert(shipment("SHP-0001")).unwrap();

        let err = store.insert(shipment("SHP-0001")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn list_filters_by_status_and_source() {
        let store = InMemoryShipmentStore::new();
        store.insert(shipment("SHP-0001")).unwrap();
        store.insert(shipment("SHP-0002")).unwrap();

        let drafts = store.list(Some(ShipmentStatus::Draft), None).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].shipment_number(), "SHP-0001");

        let main = LocationCode::new("WH-MAIN").unwrap();
        let other = LocationCode::new("WH-OTHER").unwrap();
        assert_eq!(store.list(None, Some(&main)).unwrap().len(), 2);
        assert!(store.list(None, Some(&other)).unwrap().is_empty());
        assert!(store
            .list(Some(ShipmentStatus::Shipped), None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn stale_update_is_rejected() {
        let store = InMemoryShipmentStore::new();
        let shipment = shipment("SHP-0003");
        store.insert(shipment.clone()).unwrap();

        let err = store
            .update(shipment, ExpectedRevision::Exact(42))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
