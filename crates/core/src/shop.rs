//! Product catalogue

use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{NewProduct, Product, ProductPatch};
use crate::storage::{BranchStore, ProductStore};

pub struct ProductCatalog<'a> {
    conn: &'a Connection,
}

impl<'a> ProductCatalog<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn products(&self) -> ProductStore<'a> {
        ProductStore::new(self.conn)
    }

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn create_product(&self, new: NewProduct) -> Result<Product> {
        if new.name.trim().is_empty() {
            return Err(Error::validation("Name is required"));
        }
        if new.price < 0 {
            return Err(Error::validation("Price cannot be negative"));
        }
        if let Some(branch_id) = new.branch_id {
            BranchStore::new(self.conn)
                .find_by_id(branch_id)?
                .ok_or_else(|| Error::not_found(format!("Branch {}", branch_id)))?;
        }

        let product = Product {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            price: new.price,
            stock: new.stock,
            branch_id: new.branch_id,
            is_active: true,
            created_at: Utc::now(),
        };
        self.products().create(&product)?;
        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    pub fn get_product(&self, id: Uuid) -> Result<Product> {
        self.products()
            .find_by_id(id)?
            .ok_or_else(|| Error::not_found(format!("Product {}", id)))
    }

    /// Active products; a branch sees its own plus the global ones
    pub fn list_products(&self, branch_id: Option<Uuid>) -> Result<Vec<Product>> {
        self.products().list(branch_id)
    }

    #[instrument(skip(self, patch))]
    pub fn update_product(&self, id: Uuid, patch: ProductPatch) -> Result<Product> {
        let mut product = self.get_product(id)?;
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(Error::validation("Name is required"));
            }
            product.name = name;
        }
        if let Some(price) = patch.price {
            if price < 0 {
                return Err(Error::validation("Price cannot be negative"));
            }
            product.price = price;
        }
        if patch.description.is_some() {
            product.description = patch.description;
        }
        if let Some(stock) = patch.stock {
            product.stock = stock;
        }
        if let Some(active) = patch.is_active {
            product.is_active = active;
        }
        self.products().update(&product)?;
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::open_branch;
    use crate::models::Activity;
    use crate::storage::Database;

    fn kit(branch_id: Option<Uuid>) -> NewProduct {
        NewProduct {
            name: "Tufting yarn".into(),
            description: None,
            price: 600,
            stock: 40,
            branch_id,
        }
    }

    #[test]
    fn test_branch_sees_own_and_global() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ProductCatalog::new(db.conn());
        let here = open_branch(&db, &[Activity::Tufting]);
        let there = open_branch(&db, &[Activity::Tufting]);

        catalog.create_product(kit(None)).unwrap();
        catalog.create_product(kit(Some(here.id))).unwrap();
        catalog.create_product(kit(Some(there.id))).unwrap();

        assert_eq!(catalog.list_products(Some(here.id)).unwrap().len(), 2);
        assert_eq!(catalog.list_products(None).unwrap().len(), 3);
    }

    #[test]
    fn test_inactive_products_hidden() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ProductCatalog::new(db.conn());
        let product = catalog.create_product(kit(None)).unwrap();

        let patch = ProductPatch {
            is_active: Some(false),
            ..ProductPatch::default()
        };
        catalog.update_product(product.id, patch).unwrap();
        assert!(catalog.list_products(None).unwrap().is_empty());
    }

    #[test]
    fn test_negative_price_rejected() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ProductCatalog::new(db.conn());
        let mut new = kit(None);
        new.price = -1;

        assert!(matches!(catalog.create_product(new), Err(Error::Validation(_))));
    }
}
