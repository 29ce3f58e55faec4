//! Product storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, parse_uuid_opt, OptionalExt};
use crate::error::Result;
use crate::models::Product;

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, stock, branch_id, is_active, created_at";

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        stock: row.get(4)?,
        branch_id: parse_uuid_opt(row.get::<_, Option<String>>(5)?)?,
        is_active: row.get::<_, i32>(6)? != 0,
        created_at: parse_datetime(&row.get::<_, String>(7)?)?,
    })
}

pub struct ProductStore<'a> {
    conn: &'a Connection,
}

impl<'a> ProductStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(skip(self, product), fields(product_name = %product.name))]
    pub fn create(&self, product: &Product) -> Result<()> {
        self.conn.execute(
            "INSERT INTO products (id, name, description, price, stock, branch_id, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                product.id.to_string(),
                product.name,
                product.description,
                product.price,
                product.stock,
                product.branch_id.map(|id| id.to_string()),
                product.is_active as i32,
                product.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"))?;
        let product = stmt
            .query_row(params![id.to_string()], product_from_row)
            .optional()?;
        Ok(product)
    }

    pub fn update(&self, product: &Product) -> Result<()> {
        self.conn.execute(
            "UPDATE products SET name = ?1, description = ?2, price = ?3, stock = ?4, is_active = ?5
             WHERE id = ?6",
            params![
                product.name,
                product.description,
                product.price,
                product.stock,
                product.is_active as i32,
                product.id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Active products; with a branch, its own plus the global ones
    pub fn list(&self, branch_id: Option<Uuid>) -> Result<Vec<Product>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE is_active = 1 AND (?1 IS NULL OR branch_id IS NULL OR branch_id = ?1)
             ORDER BY name"
        ))?;
        let products = stmt
            .query_map(params![branch_id.map(|id| id.to_string())], product_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(products)
    }

    /// Subtract sold units, flooring stock at zero
    #[instrument(skip(self))]
    pub fn decrement_stock(&self, id: Uuid, quantity: u32) -> Result<()> {
        self.conn.execute(
            "UPDATE products SET stock = MAX(0, stock - ?1) WHERE id = ?2",
            params![quantity, id.to_string()],
        )?;
        Ok(())
    }
}
