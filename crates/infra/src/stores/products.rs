use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use stocktrail_core::{ExpectedRevision, ProductId, Revisioned};
use stocktrail_products::{Bom, Product};

use super::{StoreError, lock_poisoned};

/// Product catalog plus per-product bills of materials.
pub trait ProductStore: Send + Sync {
    /// Insert a new product; `Duplicate` if the id or code is taken.
    fn insert(&self, product: Product) -> Result<(), StoreError>;

    fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    fn get_by_code(&self, code: &str) -> Result<Option<Product>, StoreError>;

    fn exists(&self, id: ProductId) -> Result<bool, StoreError>;

    /// Full catalog, ordered by code.
    fn list(&self) -> Result<Vec<Product>, StoreError>;

    /// Replace a product row after a revision check against the stored row.
    fn update(&self, product: Product, expected: ExpectedRevision) -> Result<(), StoreError>;

    fn bom(&self, product_id: ProductId) -> Result<Option<Bom>, StoreError>;

    /// Write a bill of materials after a revision check (absent row counts
    /// as revision 0).
    fn upsert_bom(&self, bom: Bom, expected: ExpectedRevision) -> Result<(), StoreError>;
}

impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    fn insert(&self, product: Product) -> Result<(), StoreError> {
        (**self).insert(product)
    }

    fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).get(id)
    }

    fn get_by_code(&self, code: &str) -> Result<Option<Product>, StoreError> {
        (**self).get_by_code(code)
    }

    fn exists(&self, id: ProductId) -> Result<bool, StoreError> {
        (**self).exists(id)
    }

    fn list(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list()
    }

    fn update(&self, product: Product, expected: ExpectedRevision) -> Result<(), StoreError> {
        (**self).update(product, expected)
    }

    fn bom(&self, product_id: ProductId) -> Result<Option<Bom>, StoreError> {
        (**self).bom(product_id)
    }

    fn upsert_bom(&self, bom: Bom, expected: ExpectedRevision) -> Result<(), StoreError> {
        (**self).upsert_bom(bom, expected)
    }
}

#[derive(Default)]
struct Inner {
    by_id: HashMap<ProductId, Product>,
    by_code: HashMap<String, ProductId>,
    boms: HashMap<ProductId, Bom>,
}

/// In-memory product store.
#[derive(Default)]
pub struct InMemoryProductStore {
    inner: RwLock<Inner>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProductStore for InMemoryProductStore {
    fn insert(&self, product: Product) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        if inner.by_id.contains_key(&product.id()) {
            return Err(StoreError::Duplicate(format!("product {}", product.id())));
        }
        if inner.by_code.contains_key(product.code()) {
            return Err(StoreError::Duplicate(format!(
                "product code {}",
                product.code()
            )));
        }
        inner.by_code.insert(product.code().to_string(), product.id());
        inner.by_id.insert(product.id(), product);
        Ok(())
    }

    fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner.by_id.get(&id).cloned())
    }

    fn get_by_code(&self, code: &str) -> Result<Option<Product>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner
            .by_code
            .get(code)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    fn exists(&self, id: ProductId) -> Result<bool, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner.by_id.contains_key(&id))
    }

    fn list(&self) -> Result<Vec<Product>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        let mut products: Vec<Product> = inner.by_id.values().cloned().collect();
        products.sort_by(|a, b| a.code().cmp(b.code()));
        Ok(products)
    }

    fn update(&self, product: Product, expected: ExpectedRevision) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        let stored = inner.by_id.get(&product.id()).ok_or_else(|| {
            StoreError::Storage(format!("product {} missing on update", product.id()))
        })?;
        if !expected.matches(stored.revision()) {
            return Err(StoreError::Conflict(format!(
                "product {} is at revision {}",
                product.id(),
                stored.revision()
            )));
        }
        inner.by_id.insert(product.id(), product);
        Ok(())
    }

    fn bom(&self, product_id: ProductId) -> Result<Option<Bom>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner.boms.get(&product_id).cloned())
    }

    fn upsert_bom(&self, bom: Bom, expected: ExpectedRevision) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        let actual = inner
            .boms
            .get(&bom.product_id())
            .map(|b| b.revision())
            .unwrap_or(0);
        if !expected.matches(actual) {
            return Err(StoreError::Conflict(format!(
                "bill of materials for {} is at revision {actual}",
                bom.product_id()
            )));
        }
        inner.boms.insert(bom.product_id(), bom);
        Ok(())
    }
}
