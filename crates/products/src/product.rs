use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrail_core::{DomainError, DomainResult, ProductId, Revisioned};
use stocktrail_events::DomainEvent;

/// Product catalog lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Active,
    Deprecated,
    Obsolete,
}

impl core::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Deprecated => "deprecated",
            ProductStatus::Obsolete => "obsolete",
        };
        f.write_str(s)
    }
}

/// Catalog entry. Code is unique across the catalog (enforced by the store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    code: String,
    name: String,
    description: Option<String>,
    status: ProductStatus,
    created_at: DateTime<Utc>,
    revision: u64,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProductStatus>,
}

/// Old/new pair in an update's change map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Option<String>,
    pub new: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdated {
    pub product_id: ProductId,
    pub changes: BTreeMap<String, FieldChange>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStatusChanged {
    pub product_id: ProductId,
    pub old_status: ProductStatus,
    pub new_status: ProductStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    Created(ProductCreated),
    Updated(ProductUpdated),
    StatusChanged(ProductStatusChanged),
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::Created(_) => "products.product.created",
            ProductEvent::Updated(_) => "products.product.updated",
            ProductEvent::StatusChanged(_) => "products.product.status_changed",
        }
    }

    fn schema_version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::Created(e) => e.occurred_at,
            ProductEvent::Updated(e) => e.occurred_at,
            ProductEvent::StatusChanged(e) => e.occurred_at,
        }
    }
}

impl Product {
    /// Validates and builds a new DRAFT product together with its creation
    /// event. Code uniqueness is the store's job.
    pub fn create(
        id: ProductId,
        code: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<(Self, ProductEvent)> {
        let code = code.into().trim().to_string();
        let name = name.into().trim().to_string();
        if code.is_empty() {
            return Err(DomainError::validation("product code cannot be empty"));
        }
        if name.is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }

        let product = Self {
            id,
            code: code.clone(),
            name: name.clone(),
            description,
            status: ProductStatus::Draft,
            created_at: occurred_at,
            revision: 1,
        };
        let event = ProductEvent::Created(ProductCreated {
            product_id: id,
            code,
            name,
            occurred_at,
        });
        Ok((product, event))
    }

    /// Applies a partial update and returns the audit events it produced.
    ///
    /// Field edits go into one UPDATED event with an old/new change map; a
    /// status change is its own STATUS_CHANGED event. A no-op update is a
    /// validation error rather than a silent success.
    pub fn update(
        &mut self,
        update: ProductUpdate,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<ProductEvent>> {
        let mut changes: BTreeMap<String, FieldChange> = BTreeMap::new();
        let mut status_change: Option<(ProductStatus, ProductStatus)> = None;

        if let Some(name) = &update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::validation("product name cannot be empty"));
            }
            if name != self.name {
                changes.insert(
                    "name".to_string(),
                    FieldChange {
                        old: Some(self.name.clone()),
                        new: Some(name.to_string()),
                    },
                );
            }
        }
        if let Some(description) = &update.description {
            if Some(description) != self.description.as_ref() {
                changes.insert(
                    "description".to_string(),
                    FieldChange {
                        old: self.description.clone(),
                        new: Some(description.clone()),
                    },
                );
            }
        }
        if let Some(status) = update.status {
            if status != self.status {
                status_change = Some((self.status, status));
            }
        }

        if changes.is_empty() && status_change.is_none() {
            return Err(DomainError::validation("update contains no changes"));
        }

        // Validation passed; mutate and emit.
        let mut events = Vec::new();

        if !changes.is_empty() {
            if let Some(change) = changes.get("name") {
                self.name = change.new.clone().unwrap_or_default();
            }
            if let Some(change) = changes.get("description") {
                self.description = change.new.clone();
            }
            events.push(ProductEvent::Updated(ProductUpdated {
                product_id: self.id,
                changes,
                occurred_at,
            }));
        }
        if let Some((old_status, new_status)) = status_change {
            self.status = new_status;
            events.push(ProductEvent::StatusChanged(ProductStatusChanged {
                product_id: self.id,
                old_status,
                new_status,
                occurred_at,
            }));
        }

        self.revision += 1;
        Ok(events)
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Revisioned for Product {
    fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Product {
        let (product, _) = Product::create(
            ProductId::new(),
            "WID-001",
            "Widget",
            Some("A widget".to_string()),
            Utc::now(),
        )
        .unwrap();
        product
    }

    #[test]
    fn create_trims_and_starts_in_draft() {
        let (product, event) = Product::create(
            ProductId::new(),
            "  WID-001  ",
            " Widget ",
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(product.code(), "WID-001");
        assert_eq!(product.name(), "Widget");
        assert_eq!(product.status(), ProductStatus::Draft);
        assert_eq!(product.revision(), 1);
        assert!(matches!(event, ProductEvent::Created(_)));
    }

    #[test]
    fn create_rejects_blank_code_or_name() {
        assert!(matches!(
            Product::create(ProductId::new(), " ", "Widget", None, Utc::now()),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            Product::create(ProductId::new(), "WID-001", "", None, Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn update_builds_change_map() {
        let mut product = sample();
        let events = product
            .update(
                ProductUpdate {
                    name: Some("Widget Mk2".to_string()),
                    description: None,
                    status: None,
                },
                Utc::now(),
            )
            .unwrap();

        assert_eq!(product.name(), "Widget Mk2");
        assert_eq!(events.len(), 1);
        match &events[0] {
            ProductEvent::Updated(e) => {
                let change = &e.changes["name"];
                assert_eq!(change.old.as_deref(), Some("Widget"));
                assert_eq!(change.new.as_deref(), Some("Widget Mk2"));
            }
            other => panic!("expected Updated, got {other:?}"),
        }
    }

    #[test]
    fn status_change_is_a_separate_event() {
        let mut product = sample();
        let events = product
            .update(
                ProductUpdate {
                    name: Some("Widget Mk2".to_string()),
                    description: None,
                    status: Some(ProductStatus::Active),
                },
                Utc::now(),
            )
            .unwrap();

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ProductEvent::Updated(_)));
        match &events[1] {
            ProductEvent::StatusChanged(e) => {
                assert_eq!(e.old_status, ProductStatus::Draft);
                assert_eq!(e.new_status, ProductStatus::Active);
            }
            other => panic!("expected StatusChanged, got {other:?}"),
        }
        assert_eq!(product.status(), ProductStatus::Active);
    }

    #[test]
    fn noop_update_is_rejected() {
        let mut product = sample();
        let before = product.clone();

        let err = product.update(ProductUpdate::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        // Same values are also a no-op.
        let err = product
            .update(
                ProductUpdate {
                    name: Some("Widget".to_string()),
                    description: None,
                    status: Some(ProductStatus::Draft),
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(product, before);
    }
}
