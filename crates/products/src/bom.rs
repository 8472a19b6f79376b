use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrail_core::{DomainError, DomainResult, ProductId, Revisioned};
use stocktrail_events::DomainEvent;

/// One component position on a bill of materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomItem {
    pub component_id: ProductId,
    pub quantity: i64,
    pub position: Option<u32>,
    pub notes: Option<String>,
}

/// Input for adding a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBomItem {
    pub component_id: ProductId,
    pub quantity: i64,
    pub position: Option<u32>,
    pub notes: Option<String>,
}

/// Component-level change payload (ITEM_ADDED / ITEM_UPDATED / ITEM_REMOVED).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomItemChanged {
    pub product_id: ProductId,
    pub component_id: ProductId,
    pub quantity: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BomEvent {
    ItemAdded(BomItemChanged),
    ItemUpdated(BomItemChanged),
    ItemRemoved(BomItemChanged),
}

impl DomainEvent for BomEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BomEvent::ItemAdded(_) => "products.bom.item_added",
            BomEvent::ItemUpdated(_) => "products.bom.item_updated",
            BomEvent::ItemRemoved(_) => "products.bom.item_removed",
        }
    }

    fn schema_version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BomEvent::ItemAdded(e) | BomEvent::ItemUpdated(e) | BomEvent::ItemRemoved(e) => {
                e.occurred_at
            }
        }
    }
}

/// Bill of materials for one product. One entry per component; a product
/// cannot be its own component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bom {
    product_id: ProductId,
    items: Vec<BomItem>,
    revision: u64,
}

impl Bom {
    pub fn empty(product_id: ProductId) -> Self {
        Self {
            product_id,
            items: Vec::new(),
            revision: 0,
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn items(&self) -> &[BomItem] {
        &self.items
    }

    pub fn item(&self, component_id: ProductId) -> Option<&BomItem> {
        self.items.iter().find(|i| i.component_id == component_id)
    }

    pub fn add_item(
        &mut self,
        item: NewBomItem,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<BomEvent> {
        if item.quantity <= 0 {
            return Err(DomainError::validation(
                "component quantity must be positive",
            ));
        }
        if item.component_id == self.product_id {
            return Err(DomainError::validation(
                "a product cannot be a component of itself",
            ));
        }
        if self.item(item.component_id).is_some() {
            return Err(DomainError::duplicate(format!(
                "component {} already on bill of materials",
                item.component_id
            )));
        }

        let component_id = item.component_id;
        let quantity = item.quantity;
        self.items.push(BomItem {
            component_id,
            quantity,
            position: item.position,
            notes: item.notes,
        });
        self.revision += 1;

        Ok(BomEvent::ItemAdded(BomItemChanged {
            product_id: self.product_id,
            component_id,
            quantity: Some(quantity),
            occurred_at,
        }))
    }

    pub fn update_item(
        &mut self,
        component_id: ProductId,
        quantity: i64,
        position: Option<u32>,
        notes: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<BomEvent> {
        if quantity <= 0 {
            return Err(DomainError::validation(
                "component quantity must be positive",
            ));
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.component_id == component_id)
            .ok_or_else(|| {
                DomainError::not_found(format!("component {component_id} on bill of materials"))
            })?;

        item.quantity = quantity;
        item.position = position;
        item.notes = notes;
        self.revision += 1;

        Ok(BomEvent::ItemUpdated(BomItemChanged {
            product_id: self.product_id,
            component_id,
            quantity: Some(quantity),
            occurred_at,
        }))
    }

    pub fn remove_item(
        &mut self,
        component_id: ProductId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<BomEvent> {
        let idx = self
            .items
            .iter()
            .position(|i| i.component_id == component_id)
            .ok_or_else(|| {
                DomainError::not_found(format!("component {component_id} on bill of materials"))
            })?;

        self.items.remove(idx);
        self.revision += 1;

        Ok(BomEvent::ItemRemoved(BomItemChanged {
            product_id: self.product_id,
            component_id,
            quantity: None,
            occurred_at,
        }))
    }
}

impl Revisioned for Bom {
    fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_item(component_id: ProductId, quantity: i64) -> NewBomItem {
        NewBomItem {
            component_id,
            quantity,
            position: None,
            notes: None,
        }
    }

    #[test]
    fn add_update_remove_roundtrip() {
        let product_id = ProductId::new();
        let component = ProductId::new();
        let mut bom = Bom::empty(product_id);

        let event = bom.add_item(new_item(component, 4), Utc::now()).unwrap();
        assert!(matches!(event, BomEvent::ItemAdded(_)));
        assert_eq!(bom.item(component).unwrap().quantity, 4);

        let event = bom
            .update_item(component, 6, Some(10), None, Utc::now())
            .unwrap();
        assert!(matches!(event, BomEvent::ItemUpdated(_)));
        assert_eq!(bom.item(component).unwrap().quantity, 6);
        assert_eq!(bom.item(component).unwrap().position, Some(10));

        let event = bom.remove_item(component, Utc::now()).unwrap();
        assert!(matches!(event, BomEvent::ItemRemoved(_)));
        assert!(bom.items().is_empty());
        assert_eq!(bom.revision(), 3);
    }

    #[test]
    fn rejects_self_reference_and_duplicates() {
        let product_id = ProductId::new();
        let component = ProductId::new();
        let mut bom = Bom::empty(product_id);

        assert!(matches!(
            bom.add_item(new_item(product_id, 1), Utc::now()),
            Err(DomainError::Validation(_))
        ));

        bom.add_item(new_item(component, 2), Utc::now()).unwrap();
        assert!(matches!(
            bom.add_item(new_item(component, 3), Utc::now()),
            Err(DomainError::Duplicate(_))
        ));
    }

    #[test]
    fn rejects_non_positive_quantities() {
        let mut bom = Bom::empty(ProductId::new());
        let component = ProductId::new();

        assert!(matches!(
            bom.add_item(new_item(component, 0), Utc::now()),
            Err(DomainError::Validation(_))
        ));

        bom.add_item(new_item(component, 1), Utc::now()).unwrap();
        assert!(matches!(
            bom.update_item(component, -1, None, None, Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn missing_component_is_not_found() {
        let mut bom = Bom::empty(ProductId::new());
        let unknown = ProductId::new();

        assert!(matches!(
            bom.update_item(unknown, 1, None, None, Utc::now()),
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            bom.remove_item(unknown, Utc::now()),
            Err(DomainError::NotFound(_))
        ));
    }
}
