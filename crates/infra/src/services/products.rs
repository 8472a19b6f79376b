use chrono::Utc;
use serde::Serialize;

use stocktrail_core::{
    DomainError, DomainResult, EntityId, ExpectedRevision, ProductId, Revisioned, UserId,
};
use stocktrail_events::{DomainEvent, EventRecorder, NewEvent};
use stocktrail_products::{Bom, NewBomItem, Product, ProductUpdate};

use crate::stores::ProductStore;

/// Product catalog and bill-of-materials maintenance.
pub struct ProductService<P, R> {
    products: P,
    recorder: R,
}

impl<P, R> ProductService<P, R>
where
    P: ProductStore,
    R: EventRecorder,
{
    pub fn new(products: P, recorder: R) -> Self {
        Self { products, recorder }
    }

    pub fn create_product(
        &self,
        actor: UserId,
        code: &str,
        name: &str,
        description: Option<String>,
    ) -> DomainResult<Product> {
        let (product, event) =
            Product::create(ProductId::new(), code, name, description, Utc::now())?;

        if self.products.get_by_code(product.code())?.is_some() {
            return Err(DomainError::duplicate(format!(
                "product code {}",
                product.code()
            )));
        }
        // The store re-checks under its write lock; a concurrent create of
        // the same code fails there.
        self.products.insert(product.clone())?;
        self.record("products.product", product.id(), actor, &event)?;

        tracing::info!(product_id = %product.id(), code = %product.code(), "product created");
        Ok(product)
    }

    pub fn update_product(
        &self,
        actor: UserId,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> DomainResult<Product> {
        let mut product = self.require_product(product_id)?;
        let read_revision = product.revision();

        let events = product.update(update, Utc::now())?;
        self.products
            .update(product.clone(), ExpectedRevision::Exact(read_revision))?;
        for event in &events {
            self.record("products.product", product_id, actor, event)?;
        }

        tracing::info!(product_id = %product_id, "product updated");
        Ok(product)
    }

    pub fn get_product(&self, product_id: ProductId) -> DomainResult<Product> {
        self.require_product(product_id)
    }

    pub fn get_product_by_code(&self, code: &str) -> DomainResult<Option<Product>> {
        Ok(self.products.get_by_code(code)?)
    }

    pub fn list_products(&self) -> DomainResult<Vec<Product>> {
        Ok(self.products.list()?)
    }

    pub fn add_bom_item(
        &self,
        actor: UserId,
        product_id: ProductId,
        item: NewBomItem,
    ) -> DomainResult<Bom> {
        self.require_product(product_id)?;
        self.require_product(item.component_id)?;

        let mut bom = self
            .products
            .bom(product_id)?
            .unwrap_or_else(|| Bom::empty(product_id));
        let read_revision = bom.revision();

        let event = bom.add_item(item, Utc::now())?;
        self.products
            .upsert_bom(bom.clone(), ExpectedRevision::Exact(read_revision))?;
        self.record("products.bom", product_id, actor, &event)?;
        Ok(bom)
    }

    pub fn update_bom_item(
        &self,
        actor: UserId,
        product_id: ProductId,
        component_id: ProductId,
        quantity: i64,
        position: Option<u32>,
        notes: Option<String>,
    ) -> DomainResult<Bom> {
        let mut bom = self.require_bom(product_id)?;
        let read_revision = bom.revision();

        let event = bom.update_item(component_id, quantity, position, notes, Utc::now())?;
        self.products
            .upsert_bom(bom.clone(), ExpectedRevision::Exact(read_revision))?;
        self.record("products.bom", product_id, actor, &event)?;
        Ok(bom)
    }

    pub fn remove_bom_item(
        &self,
        actor: UserId,
        product_id: ProductId,
        component_id: ProductId,
    ) -> DomainResult<Bom> {
        let mut bom = self.require_bom(product_id)?;
        let read_revision = bom.revision();

        let event = bom.remove_item(component_id, Utc::now())?;
        self.products
            .upsert_bom(bom.clone(), ExpectedRevision::Exact(read_revision))?;
        self.record("products.bom", product_id, actor, &event)?;
        Ok(bom)
    }

    pub fn bom(&self, product_id: ProductId) -> DomainResult<Bom> {
        self.require_product(product_id)?;
        Ok(self
            .products
            .bom(product_id)?
            .unwrap_or_else(|| Bom::empty(product_id)))
    }

    /// Audit history for one product (catalog and BOM events share the
    /// product's stream).
    pub fn history(&self, product_id: ProductId) -> DomainResult<Vec<stocktrail_events::EventRecord>> {
        self.recorder
            .history(EntityId::from(product_id))
            .map_err(|e| DomainError::storage(e.to_string()))
    }

    fn require_product(&self, product_id: ProductId) -> DomainResult<Product> {
        self.products
            .get(product_id)?
            .ok_or_else(|| DomainError::not_found(format!("product {product_id}")))
    }

    fn require_bom(&self, product_id: ProductId) -> DomainResult<Bom> {
        self.require_product(product_id)?;
        self.products
            .bom(product_id)?
            .ok_or_else(|| {
                DomainError::not_found(format!("bill of materials for product {product_id}"))
            })
    }

    fn record<E>(
        &self,
        entity_type: &str,
        product_id: ProductId,
        actor: UserId,
        event: &E,
    ) -> DomainResult<()>
    where
        E: DomainEvent + Serialize,
    {
        let new_event =
            NewEvent::from_typed(entity_type, EntityId::from(product_id), Some(actor), event)
                .map_err(|e| DomainError::storage(e.to_string()))?;
        self.recorder
            .record(new_event)
            .map_err(|e| DomainError::storage(e.to_string()))?;
        Ok(())
    }
}
