use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stocktrail_core::{
    DomainError, DomainResult, Lifecycle, LocationCode, ProductId, Revisioned, ShipmentId,
};
use stocktrail_events::DomainEvent;

/// Shipment status lifecycle.
///
/// Strictly forward-moving; delivery and cancellation are out-of-scope
/// extensions to this chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentStatus {
    Draft,
    Confirmed,
    Picked,
    Packed,
    Shipped,
}

impl core::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ShipmentStatus::Draft => "draft",
            ShipmentStatus::Confirmed => "confirmed",
            ShipmentStatus::Picked => "picked",
            ShipmentStatus::Packed => "packed",
            ShipmentStatus::Shipped => "shipped",
        };
        f.write_str(s)
    }
}

/// One product position on a shipment.
///
/// Invariant: `quantity_packed <= quantity_picked <= quantity_planned`,
/// enforced at pick/pack time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity_planned: i64,
    pub quantity_picked: i64,
    pub quantity_packed: i64,
    pub notes: Option<String>,
}

/// Line input for shipment creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShipmentLine {
    pub product_id: ProductId,
    pub quantity_planned: i64,
    pub notes: Option<String>,
}

/// Shipment root entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shipment {
    id: ShipmentId,
    shipment_number: String,
    status: ShipmentStatus,
    from_location: Option<LocationCode>,
    to_location: Option<LocationCode>,
    planned_ship_date: Option<NaiveDate>,
    actual_ship_date: Option<NaiveDate>,
    carrier: Option<String>,
    tracking_number: Option<String>,
    notes: Option<String>,
    lines: Vec<ShipmentLine>,
    revision: u64,
    created: bool,
}

impl Shipment {
    /// Empty, not-yet-created instance (rehydration / creation target).
    pub fn empty(id: ShipmentId) -> Self {
        Self {
            id,
            shipment_number: String::new(),
            status: ShipmentStatus::Draft,
            from_location: None,
            to_location: None,
            planned_ship_date: None,
            actual_ship_date: None,
            carrier: None,
            tracking_number: None,
            notes: None,
            lines: Vec::new(),
            revision: 0,
            created: false,
        }
    }

    pub fn id(&self) -> ShipmentId {
        self.id
    }

    pub fn shipment_number(&self) -> &str {
        &self.shipment_number
    }

    pub fn status(&self) -> ShipmentStatus {
        self.status
    }

    /// Source location goods are reserved at and issued from.
    pub fn from_location(&self) -> Option<&LocationCode> {
        self.from_location.as_ref()
    }

    pub fn to_location(&self) -> Option<&LocationCode> {
        self.to_location.as_ref()
    }

    pub fn planned_ship_date(&self) -> Option<NaiveDate> {
        self.planned_ship_date
    }

    pub fn actual_ship_date(&self) -> Option<NaiveDate> {
        self.actual_ship_date
    }

    pub fn carrier(&self) -> Option<&str> {
        self.carrier.as_deref()
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn lines(&self) -> &[ShipmentLine] {
        &self.lines
    }

    pub fn line(&self, line_no: u32) -> Option<&ShipmentLine> {
        self.lines.iter().find(|l| l.line_no == line_no)
    }
}

impl Revisioned for Shipment {
    fn revision(&self) -> u64 {
        self.revision
    }
}

/// Command: CreateShipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateShipment {
    pub shipment_id: ShipmentId,
    pub shipment_number: String,
    pub from_location: LocationCode,
    pub to_location: LocationCode,
    pub planned_ship_date: Option<NaiveDate>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub lines: Vec<NewShipmentLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmShipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmShipment {
    pub shipment_id: ShipmentId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PickShipment (picked quantity per line number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickShipment {
    pub shipment_id: ShipmentId,
    pub line_quantities: BTreeMap<u32, i64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PackShipment (packed quantity per line number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackShipment {
    pub shipment_id: ShipmentId,
    pub line_quantities: BTreeMap<u32, i64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ShipShipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipShipment {
    pub shipment_id: ShipmentId,
    pub actual_ship_date: NaiveDate,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentCommand {
    Create(CreateShipment),
    Confirm(ConfirmShipment),
    Pick(PickShipment),
    Pack(PackShipment),
    Ship(ShipShipment),
}

/// Event: ShipmentCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentCreated {
    pub shipment_id: ShipmentId,
    pub shipment_number: String,
    pub from_location: LocationCode,
    pub to_location: LocationCode,
    pub planned_ship_date: Option<NaiveDate>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub lines: Vec<ShipmentLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ShipmentConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentConfirmed {
    pub shipment_id: ShipmentId,
    pub line_count: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ShipmentPicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentPicked {
    pub shipment_id: ShipmentId,
    pub line_quantities: BTreeMap<u32, i64>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ShipmentPacked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentPacked {
    pub shipment_id: ShipmentId,
    pub line_quantities: BTreeMap<u32, i64>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ShipmentShipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentShipped {
    pub shipment_id: ShipmentId,
    pub actual_ship_date: NaiveDate,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentEvent {
    Created(ShipmentCreated),
    Confirmed(ShipmentConfirmed),
    Picked(ShipmentPicked),
    Packed(ShipmentPacked),
    Shipped(ShipmentShipped),
}

impl DomainEvent for ShipmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShipmentEvent::Created(_) => "shipping.shipment.created",
            ShipmentEvent::Confirmed(_) => "shipping.shipment.confirmed",
            ShipmentEvent::Picked(_) => "shipping.shipment.picked",
            ShipmentEvent::Packed(_) => "shipping.shipment.packed",
            ShipmentEvent::Shipped(_) => "shipping.shipment.shipped",
        }
    }

    fn schema_version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ShipmentEvent::Created(e) => e.occurred_at,
            ShipmentEvent::Confirmed(e) => e.occurred_at,
            ShipmentEvent::Picked(e) => e.occurred_at,
            ShipmentEvent::Packed(e) => e.occurred_at,
            ShipmentEvent::Shipped(e) => e.occurred_at,
        }
    }
}

impl Lifecycle for Shipment {
    type Command = ShipmentCommand;
    type Event = ShipmentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ShipmentEvent::Created(e) => {
                self.id = e.shipment_id;
                self.shipment_number = e.shipment_number.clone();
                self.status = ShipmentStatus::Draft;
                self.from_location = Some(e.from_location.clone());
                self.to_location = Some(e.to_location.clone());
                self.planned_ship_date = e.planned_ship_date;
                self.carrier = e.carrier.clone();
                self.tracking_number = e.tracking_number.clone();
                self.notes = e.notes.clone();
                self.lines = e.lines.clone();
                self.created = true;
            }
            ShipmentEvent::Confirmed(_) => {
                self.status = ShipmentStatus::Confirmed;
            }
            ShipmentEvent::Picked(e) => {
                for line in &mut self.lines {
                    if let Some(qty) = e.line_quantities.get(&line.line_no) {
                        line.quantity_picked = *qty;
                    }
                }
                self.status = ShipmentStatus::Picked;
            }
            ShipmentEvent::Packed(e) => {
                for line in &mut self.lines {
                    if let Some(qty) = e.line_quantities.get(&line.line_no) {
                        line.quantity_packed = *qty;
                    }
                }
                self.status = ShipmentStatus::Packed;
            }
            ShipmentEvent::Shipped(e) => {
                self.status = ShipmentStatus::Shipped;
                self.actual_ship_date = Some(e.actual_ship_date);
                if e.carrier.is_some() {
                    self.carrier = e.carrier.clone();
                }
                if e.tracking_number.is_some() {
                    self.tracking_number = e.tracking_number.clone();
                }
            }
        }

        // Deterministic revision tracking: +1 per applied event.
        self.revision += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ShipmentCommand::Create(cmd) => self.handle_create(cmd),
            ShipmentCommand::Confirm(cmd) => self.handle_confirm(cmd),
            ShipmentCommand::Pick(cmd) => self.handle_pick(cmd),
            ShipmentCommand::Pack(cmd) => self.handle_pack(cmd),
            ShipmentCommand::Ship(cmd) => self.handle_ship(cmd),
        }
    }
}

impl Shipment {
    fn ensure_exists(&self) -> DomainResult<()> {
        if !self.created {
            return Err(DomainError::not_found(format!("shipment {}", self.id)));
        }
        Ok(())
    }

    fn ensure_status(&self, expected: ShipmentStatus, transition: &str) -> DomainResult<()> {
        if self.status != expected {
            return Err(DomainError::invalid_state(format!(
                "can only {transition} {expected} shipments (current status: {})",
                self.status
            )));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateShipment) -> DomainResult<Vec<ShipmentEvent>> {
        if self.created {
            return Err(DomainError::conflict("shipment already exists"));
        }

        let number = cmd.shipment_number.trim();
        if number.is_empty() {
            return Err(DomainError::validation("shipment number cannot be empty"));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::validation(
                "shipment requires at least one line",
            ));
        }

        let mut lines = Vec::with_capacity(cmd.lines.len());
        for (idx, line) in cmd.lines.iter().enumerate() {
            let line_no = (idx as u32) + 1;
            if line.quantity_planned <= 0 {
                return Err(DomainError::validation(format!(
                    "planned quantity must be positive (line {line_no})"
                )));
            }
            lines.push(ShipmentLine {
                line_no,
                product_id: line.product_id,
                quantity_planned: line.quantity_planned,
                quantity_picked: 0,
                quantity_packed: 0,
                notes: line.notes.clone(),
            });
        }

        Ok(vec![ShipmentEvent::Created(ShipmentCreated {
            shipment_id: cmd.shipment_id,
            shipment_number: number.to_string(),
            from_location: cmd.from_location.clone(),
            to_location: cmd.to_location.clone(),
            planned_ship_date: cmd.planned_ship_date,
            carrier: cmd.carrier.clone(),
            tracking_number: cmd.tracking_number.clone(),
            notes: cmd.notes.clone(),
            lines,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &ConfirmShipment) -> DomainResult<Vec<ShipmentEvent>> {
        self.ensure_exists()?;
        self.ensure_status(ShipmentStatus::Draft, "confirm")?;

        Ok(vec![ShipmentEvent::Confirmed(ShipmentConfirmed {
            shipment_id: cmd.shipment_id,
            line_count: self.lines.len() as u32,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_pick(&self, cmd: &PickShipment) -> DomainResult<Vec<ShipmentEvent>> {
        self.ensure_exists()?;
        self.ensure_status(ShipmentStatus::Confirmed, "pick")?;

        for (line_no, quantity) in &cmd.line_quantities {
            let line = self
                .line(*line_no)
                .ok_or_else(|| DomainError::not_found(format!("line {line_no} in shipment")))?;
            if *quantity < 0 {
                return Err(DomainError::validation(format!(
                    "picked quantity cannot be negative (line {line_no})"
                )));
            }
            if *quantity > line.quantity_planned {
                return Err(DomainError::validation(format!(
                    "cannot pick more than planned for line {line_no} (planned: {}, requested: {quantity})",
                    line.quantity_planned
                )));
            }
        }

        Ok(vec![ShipmentEvent::Picked(ShipmentPicked {
            shipment_id: cmd.shipment_id,
            line_quantities: cmd.line_quantities.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_pack(&self, cmd: &PackShipment) -> DomainResult<Vec<ShipmentEvent>> {
        self.ensure_exists()?;
        self.ensure_status(ShipmentStatus::Picked, "pack")?;

        for (line_no, quantity) in &cmd.line_quantities {
            let line = self
                .line(*line_no)
                .ok_or_else(|| DomainError::not_found(format!("line {line_no} in shipment")))?;
            if *quantity < 0 {
                return Err(DomainError::validation(format!(
                    "packed quantity cannot be negative (line {line_no})"
                )));
            }
            if *quantity > line.quantity_picked {
                return Err(DomainError::validation(format!(
                    "cannot pack more than picked for line {line_no} (picked: {}, requested: {quantity})",
                    line.quantity_picked
                )));
            }
        }

        Ok(vec![ShipmentEvent::Packed(ShipmentPacked {
            shipment_id: cmd.shipment_id,
            line_quantities: cmd.line_quantities.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_ship(&self, cmd: &ShipShipment) -> DomainResult<Vec<ShipmentEvent>> {
        self.ensure_exists()?;
        self.ensure_status(ShipmentStatus::Packed, "ship")?;

        Ok(vec![ShipmentEvent::Shipped(ShipmentShipped {
            shipment_id: cmd.shipment_id,
            actual_ship_date: cmd.actual_ship_date,
            carrier: cmd.carrier.clone(),
            tracking_number: cmd.tracking_number.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_location(code: &str) -> LocationCode {
        LocationCode::new(code).unwrap()
    }

    fn create_cmd(id: ShipmentId, planned: &[i64]) -> CreateShipment {
        CreateShipment {
            shipment_id: id,
            shipment_number: "SHP-0001".to_string(),
            from_location: test_location("WH-MAIN"),
            to_location: test_location("CUSTOMER"),
            planned_ship_date: None,
            carrier: None,
            tracking_number: None,
            notes: None,
            lines: planned
                .iter()
                .map(|qty| NewShipmentLine {
                    product_id: ProductId::new(),
                    quantity_planned: *qty,
                    notes: None,
                })
                .collect(),
            occurred_at: test_time(),
        }
    }

    fn created(planned: &[i64]) -> Shipment {
        let id = ShipmentId::new();
        let mut shipment = Shipment::empty(id);
        let events = shipment
            .handle(&ShipmentCommand::Create(create_cmd(id, planned)))
            .unwrap();
        shipment.apply(&events[0]);
        shipment
    }

    fn advance(shipment: &mut Shipment, command: ShipmentCommand) {
        let events = shipment.handle(&command).unwrap();
        for e in &events {
            shipment.apply(e);
        }
    }

    fn quantities(pairs: &[(u32, i64)]) -> BTreeMap<u32, i64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn create_numbers_lines_and_starts_in_draft() {
        let shipment = created(&[10, 5]);
        assert_eq!(shipment.status(), ShipmentStatus::Draft);
        assert_eq!(shipment.lines().len(), 2);
        assert_eq!(shipment.lines()[0].line_no, 1);
        assert_eq!(shipment.lines()[1].line_no, 2);
        assert_eq!(shipment.lines()[0].quantity_planned, 10);
        assert_eq!(shipment.lines()[0].quantity_picked, 0);
        assert_eq!(shipment.revision(), 1);
    }

    #[test]
    fn create_rejects_empty_number_and_empty_lines() {
        let id = ShipmentId::new();
        let shipment = Shipment::empty(id);

        let mut cmd = create_cmd(id, &[5]);
        cmd.shipment_number = "  ".to_string();
        assert!(matches!(
            shipment.handle(&ShipmentCommand::Create(cmd)),
            Err(DomainError::Validation(_))
        ));

        let cmd = create_cmd(id, &[]);
        assert!(matches!(
            shipment.handle(&ShipmentCommand::Create(cmd)),
            Err(DomainError::Validation(_))
        ));

        let cmd = create_cmd(id, &[0]);
        assert!(matches!(
            shipment.handle(&ShipmentCommand::Create(cmd)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn full_lifecycle_draft_to_shipped() {
        let mut shipment = created(&[10, 5]);
        let id = shipment.id();

        advance(
            &mut shipment,
            ShipmentCommand::Confirm(ConfirmShipment {
                shipment_id: id,
                occurred_at: test_time(),
            }),
        );
        assert_eq!(shipment.status(), ShipmentStatus::Confirmed);

        advance(
            &mut shipment,
            ShipmentCommand::Pick(PickShipment {
                shipment_id: id,
                line_quantities: quantities(&[(1, 8), (2, 5)]),
                occurred_at: test_time(),
            }),
        );
        assert_eq!(shipment.status(), ShipmentStatus::Picked);
        assert_eq!(shipment.line(1).unwrap().quantity_picked, 8);
        assert_eq!(shipment.line(2).unwrap().quantity_picked, 5);

        advance(
            &mut shipment,
            ShipmentCommand::Pack(PackShipment {
                shipment_id: id,
                line_quantities: quantities(&[(1, 8), (2, 5)]),
                occurred_at: test_time(),
            }),
        );
        assert_eq!(shipment.status(), ShipmentStatus::Packed);

        let ship_date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        advance(
            &mut shipment,
            ShipmentCommand::Ship(ShipShipment {
                shipment_id: id,
                actual_ship_date: ship_date,
                carrier: Some("DHL".to_string()),
                tracking_number: Some("JD0123456789".to_string()),
                occurred_at: test_time(),
            }),
        );
        assert_eq!(shipment.status(), ShipmentStatus::Shipped);
        assert_eq!(shipment.actual_ship_date(), Some(ship_date));
        assert_eq!(shipment.carrier(), Some("DHL"));
        assert_eq!(shipment.tracking_number(), Some("JD0123456789"));
    }

    #[test]
    fn out_of_order_transitions_are_rejected() {
        let mut shipment = created(&[10]);
        let id = shipment.id();

        // Pick before confirm.
        let err = shipment
            .handle(&ShipmentCommand::Pick(PickShipment {
                shipment_id: id,
                line_quantities: quantities(&[(1, 1)]),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));

        // Ship before anything.
        let err = shipment
            .handle(&ShipmentCommand::Ship(ShipShipment {
                shipment_id: id,
                actual_ship_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                carrier: None,
                tracking_number: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));

        // Confirm twice.
        advance(
            &mut shipment,
            ShipmentCommand::Confirm(ConfirmShipment {
                shipment_id: id,
                occurred_at: test_time(),
            }),
        );
        let err = shipment
            .handle(&ShipmentCommand::Confirm(ConfirmShipment {
                shipment_id: id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert_eq!(shipment.status(), ShipmentStatus::Confirmed);
    }

    #[test]
    fn pick_beyond_planned_is_rejected_without_mutation() {
        let mut shipment = created(&[10, 5]);
        let id = shipment.id();
        advance(
            &mut shipment,
            ShipmentCommand::Confirm(ConfirmShipment {
                shipment_id: id,
                occurred_at: test_time(),
            }),
        );

        let before = shipment.clone();
        let err = shipment
            .handle(&ShipmentCommand::Pick(PickShipment {
                shipment_id: id,
                // Line 1 is fine; line 2 exceeds its plan. Nothing may change.
                line_quantities: quantities(&[(1, 8), (2, 6)]),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(shipment, before);
    }

    #[test]
    fn pick_of_unknown_line_is_rejected() {
        let mut shipment = created(&[10]);
        let id = shipment.id();
        advance(
            &mut shipment,
            ShipmentCommand::Confirm(ConfirmShipment {
                shipment_id: id,
                occurred_at: test_time(),
            }),
        );

        let err = shipment
            .handle(&ShipmentCommand::Pick(PickShipment {
                shipment_id: id,
                line_quantities: quantities(&[(9, 1)]),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn pack_beyond_picked_is_rejected() {
        let mut shipment = created(&[10]);
        let id = shipment.id();
        advance(
            &mut shipment,
            ShipmentCommand::Confirm(ConfirmShipment {
                shipment_id: id,
                occurred_at: test_time(),
            }),
        );
        advance(
            &mut shipment,
            ShipmentCommand::Pick(PickShipment {
                shipment_id: id,
                line_quantities: quantities(&[(1, 6)]),
                occurred_at: test_time(),
            }),
        );

        let err = shipment
            .handle(&ShipmentCommand::Pack(PackShipment {
                shipment_id: id,
                line_quantities: quantities(&[(1, 7)]),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(shipment.line(1).unwrap().quantity_packed, 0);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let shipment = created(&[10]);
        let before = shipment.clone();

        let _ = shipment.handle(&ShipmentCommand::Confirm(ConfirmShipment {
            shipment_id: shipment.id(),
            occurred_at: test_time(),
        }));

        assert_eq!(shipment, before);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: any pick within the planned bounds succeeds and keeps
        /// `picked <= planned` per line; any pick exceeding a bound fails and
        /// leaves every line untouched.
        #[test]
        fn pick_bounds_hold_per_line(
            planned in prop::collection::vec(1i64..100, 1..6),
            overshoot in prop::option::of(0usize..6),
        ) {
            let mut shipment = created(&planned);
            let id = shipment.id();
            advance(&mut shipment, ShipmentCommand::Confirm(ConfirmShipment {
                shipment_id: id,
                occurred_at: test_time(),
            }));

            let mut picks: BTreeMap<u32, i64> = shipment
                .lines()
                .iter()
                .map(|l| (l.line_no, l.quantity_planned / 2))
                .collect();

            let overshoot_line = overshoot.map(|i| (i % planned.len()) as u32 + 1);
            if let Some(line_no) = overshoot_line {
                let line = shipment.line(line_no).unwrap();
                picks.insert(line_no, line.quantity_planned + 1);
            }

            let result = shipment.handle(&ShipmentCommand::Pick(PickShipment {
                shipment_id: id,
                line_quantities: picks,
                occurred_at: test_time(),
            }));

            match overshoot_line {
                Some(_) => {
                    prop_assert!(matches!(result, Err(DomainError::Validation(_))));
                    prop_assert!(shipment.lines().iter().all(|l| l.quantity_picked == 0));
                }
                None => {
                    let events = result.unwrap();
                    for e in &events {
                        shipment.apply(e);
                    }
                    prop_assert!(shipment
                        .lines()
                        .iter()
                        .all(|l| l.quantity_picked <= l.quantity_planned));
                }
            }
        }
    }
}
