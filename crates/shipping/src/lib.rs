//! `stocktrail-shipping`: shipment fulfillment state machine.
//!
//! A shipment advances strictly DRAFT → CONFIRMED → PICKED → PACKED →
//! SHIPPED. Transitions are pure decisions (`handle`) producing events that
//! both evolve state (`apply`) and feed the audit trail; inventory side
//! effects (reserve/issue/release) are orchestrated by the service layer.

pub mod shipment;

pub use shipment::{
    ConfirmShipment, CreateShipment, NewShipmentLine, PackShipment, PickShipment, ShipShipment,
    Shipment, ShipmentCommand, ShipmentConfirmed, ShipmentCreated, ShipmentEvent, ShipmentLine,
    ShipmentPacked, ShipmentPicked, ShipmentShipped, ShipmentStatus,
};
