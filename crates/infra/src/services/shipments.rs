use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stocktrail_core::{
    DomainError, DomainResult, EntityId, ExpectedRevision, Lifecycle, LocationCode, Revisioned,
    ShipmentId, UserId,
};
use stocktrail_events::{EventRecord, EventRecorder, NewEvent};
use stocktrail_ledger::{Reference, TransactionKind, TransactionRequest};
use stocktrail_shipping::{
    ConfirmShipment, CreateShipment, NewShipmentLine, PackShipment, PickShipment, ShipShipment,
    Shipment, ShipmentCommand, ShipmentEvent, ShipmentStatus,
};

use crate::services::LedgerService;
use crate::stores::{LedgerStore, ProductStore, ShipmentStore, StoreError};

/// Input for shipment creation. The service assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShipment {
    pub shipment_number: String,
    pub from_location: LocationCode,
    pub to_location: LocationCode,
    pub planned_ship_date: Option<NaiveDate>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub lines: Vec<NewShipmentLine>,
}

/// Shipment fulfillment orchestration.
///
/// Transitions run the ledger side effects first, then persist the new
/// shipment state under an optimistic revision check, then record the
/// lifecycle event. A transition that loses the revision check is rejected
/// with `InvalidState`; if it had already applied ledger effects, those are
/// compensated with the inverse batch before the error surfaces.
pub struct ShipmentService<S, L, P, R> {
    shipments: S,
    products: P,
    ledger: LedgerService<L, P>,
    recorder: R,
}

impl<S, L, P, R> ShipmentService<S, L, P, R>
where
    S: ShipmentStore,
    L: LedgerStore,
    P: ProductStore,
    R: EventRecorder,
{
    pub fn new(shipments: S, products: P, ledger: LedgerService<L, P>, recorder: R) -> Self {
        Self {
            shipments,
            products,
            ledger,
            recorder,
        }
    }

    pub fn create_shipment(&self, actor: UserId, input: NewShipment) -> DomainResult<Shipment> {
        if self
            .shipments
            .get_by_number(input.shipment_number.trim())?
            .is_some()
        {
            return Err(DomainError::duplicate(format!(
                "shipment number {}",
                input.shipment_number.trim()
            )));
        }
        for line in &input.lines {
            if !self.products.exists(line.product_id)? {
                return Err(DomainError::not_found(format!(
                    "product {}",
                    line.product_id
                )));
            }
        }

        let shipment_id = ShipmentId::new();
        let mut shipment = Shipment::empty(shipment_id);
        let events = shipment.handle(&ShipmentCommand::Create(CreateShipment {
            shipment_id,
            shipment_number: input.shipment_number,
            from_location: input.from_location,
            to_location: input.to_location,
            planned_ship_date: input.planned_ship_date,
            carrier: input.carrier,
            tracking_number: input.tracking_number,
            notes: input.notes,
            lines: input.lines,
            occurred_at: Utc::now(),
        }))?;
        for event in &events {
            shipment.apply(event);
        }

        // The store re-checks number uniqueness under its write lock.
        self.shipments.insert(shipment.clone())?;
        self.record_events(shipment_id, actor, &events)?;

        tracing::info!(
            shipment_id = %shipment_id,
            number = %shipment.shipment_number(),
            lines = shipment.lines().len(),
            "shipment created"
        );
        Ok(shipment)
    }

    /// DRAFT → CONFIRMED: reserve the planned quantity of every line at the
    /// source location, as one atomic ledger batch.
    pub fn confirm_shipment(&self, actor: UserId, shipment_id: ShipmentId) -> DomainResult<Shipment> {
        let mut shipment = self.load(shipment_id)?;
        let read_revision = shipment.revision();

        let events = shipment.handle(&ShipmentCommand::Confirm(ConfirmShipment {
            shipment_id,
            occurred_at: Utc::now(),
        }))?;

        let reservations = self.line_requests(&shipment, |line| {
            Some((TransactionKind::Reservation, line.quantity_planned))
        })?;
        self.ledger.apply_batch(actor, &reservations)?;

        for event in &events {
            shipment.apply(event);
        }
        if !self.try_persist(&shipment, read_revision)? {
            // Lost the transition race after reserving; hand the stock back.
            let releases = self.line_requests(&shipment, |line| {
                Some((TransactionKind::ReleaseReservation, line.quantity_planned))
            })?;
            self.ledger.apply_batch(actor, &releases)?;
            return Err(DomainError::invalid_state(format!(
                "shipment {shipment_id} was modified concurrently; reservations rolled back"
            )));
        }

        self.record_events(shipment_id, actor, &events)?;
        tracing::info!(shipment_id = %shipment_id, "shipment confirmed");
        Ok(shipment)
    }

    /// CONFIRMED → PICKED: record picked quantities; no ledger effects.
    pub fn pick_shipment(
        &self,
        actor: UserId,
        shipment_id: ShipmentId,
        line_quantities: BTreeMap<u32, i64>,
    ) -> DomainResult<Shipment> {
        self.quantity_transition(
            actor,
            shipment_id,
            ShipmentCommand::Pick(PickShipment {
                shipment_id,
                line_quantities,
                occurred_at: Utc::now(),
            }),
            "shipment picked",
        )
    }

    /// PICKED → PACKED: record packed quantities; no ledger effects.
    pub fn pack_shipment(
        &self,
        actor: UserId,
        shipment_id: ShipmentId,
        line_quantities: BTreeMap<u32, i64>,
    ) -> DomainResult<Shipment> {
        self.quantity_transition(
            actor,
            shipment_id,
            ShipmentCommand::Pack(PackShipment {
                shipment_id,
                line_quantities,
                occurred_at: Utc::now(),
            }),
            "shipment packed",
        )
    }

    /// PACKED → SHIPPED: issue each line's packed quantity and release the
    /// full planned reservation of every line, as one atomic ledger batch.
    pub fn ship_shipment(
        &self,
        actor: UserId,
        shipment_id: ShipmentId,
        actual_ship_date: NaiveDate,
        carrier: Option<String>,
        tracking_number: Option<String>,
    ) -> DomainResult<Shipment> {
        let mut shipment = self.load(shipment_id)?;
        let read_revision = shipment.revision();

        let events = shipment.handle(&ShipmentCommand::Ship(ShipShipment {
            shipment_id,
            actual_ship_date,
            carrier,
            tracking_number,
            occurred_at: Utc::now(),
        }))?;

        let mut outbound = self.line_requests(&shipment, |line| {
            (line.quantity_packed > 0).then_some((TransactionKind::Issue, line.quantity_packed))
        })?;
        outbound.extend(self.line_requests(&shipment, |line| {
            Some((TransactionKind::ReleaseReservation, line.quantity_planned))
        })?);
        self.ledger.apply_batch(actor, &outbound)?;

        for event in &events {
            shipment.apply(event);
        }
        if !self.try_persist(&shipment, read_revision)? {
            // Undo the issue/release batch before surfacing the lost race.
            let mut inverse = self.line_requests(&shipment, |line| {
                (line.quantity_packed > 0)
                    .then_some((TransactionKind::Receipt, line.quantity_packed))
            })?;
            inverse.extend(self.line_requests(&shipment, |line| {
                Some((TransactionKind::Reservation, line.quantity_planned))
            })?);
            self.ledger.apply_batch(actor, &inverse)?;
            return Err(DomainError::invalid_state(format!(
                "shipment {shipment_id} was modified concurrently; stock movements rolled back"
            )));
        }

        self.record_events(shipment_id, actor, &events)?;
        tracing::info!(shipment_id = %shipment_id, ship_date = %actual_ship_date, "shipment shipped");
        Ok(shipment)
    }

    pub fn get_shipment(&self, shipment_id: ShipmentId) -> DomainResult<Shipment> {
        self.load(shipment_id)
    }

    pub fn get_shipment_by_number(&self, number: &str) -> DomainResult<Option<Shipment>> {
        Ok(self.shipments.get_by_number(number)?)
    }

    pub fn list_shipments(
        &self,
        status: Option<ShipmentStatus>,
        from_location: Option<&LocationCode>,
    ) -> DomainResult<Vec<Shipment>> {
        Ok(self.shipments.list(status, from_location)?)
    }

    /// Lifecycle audit history for one shipment.
    pub fn history(&self, shipment_id: ShipmentId) -> DomainResult<Vec<EventRecord>> {
        self.recorder
            .history(EntityId::from(shipment_id))
            .map_err(|e| DomainError::storage(e.to_string()))
    }

    fn quantity_transition(
        &self,
        actor: UserId,
        shipment_id: ShipmentId,
        command: ShipmentCommand,
        log_message: &'static str,
    ) -> DomainResult<Shipment> {
        let mut shipment = self.load(shipment_id)?;
        let read_revision = shipment.revision();

        let events = shipment.handle(&command)?;
        for event in &events {
            shipment.apply(event);
        }
        if !self.try_persist(&shipment, read_revision)? {
            return Err(DomainError::invalid_state(format!(
                "shipment {shipment_id} was modified concurrently"
            )));
        }

        self.record_events(shipment_id, actor, &events)?;
        tracing::info!(shipment_id = %shipment_id, "{log_message}");
        Ok(shipment)
    }

    fn load(&self, shipment_id: ShipmentId) -> DomainResult<Shipment> {
        self.shipments
            .get(shipment_id)?
            .ok_or_else(|| DomainError::not_found(format!("shipment {shipment_id}")))
    }

    /// Persist under the revision read at load time. `Ok(false)` means the
    /// row changed underneath us (another transition won).
    fn try_persist(&self, shipment: &Shipment, read_revision: u64) -> DomainResult<bool> {
        match self
            .shipments
            .update(shipment.clone(), ExpectedRevision::Exact(read_revision))
        {
            Ok(()) => Ok(true),
            Err(StoreError::Conflict(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Build one ledger request per line, at the shipment's source location,
    /// tagged with the shipment reference. Lines mapped to `None` are skipped.
    fn line_requests<F>(
        &self,
        shipment: &Shipment,
        mut to_movement: F,
    ) -> DomainResult<Vec<TransactionRequest>>
    where
        F: FnMut(&stocktrail_shipping::ShipmentLine) -> Option<(TransactionKind, i64)>,
    {
        let location = shipment
            .from_location()
            .cloned()
            .ok_or_else(|| DomainError::invalid_state("shipment has no source location"))?;

        Ok(shipment
            .lines()
            .iter()
            .filter_map(|line| {
                to_movement(line).map(|(kind, quantity)| TransactionRequest {
                    product_id: line.product_id,
                    location: location.clone(),
                    kind,
                    quantity,
                    reference: Some(Reference::shipment(shipment.id())),
                    notes: None,
                })
            })
            .collect())
    }

    fn record_events(
        &self,
        shipment_id: ShipmentId,
        actor: UserId,
        events: &[ShipmentEvent],
    ) -> DomainResult<()> {
        for event in events {
            let new_event = NewEvent::from_typed(
                "shipping.shipment",
                EntityId::from(shipment_id),
                Some(actor),
                event,
            )
            .map_err(|e| DomainError::storage(e.to_string()))?;
            self.recorder
                .record(new_event)
                .map_err(|e| DomainError::storage(e.to_string()))?;
        }
        Ok(())
    }
}
