//! Order storage operations
//!
//! Line items and tracking updates live in their own tables; an `Order` is
//! assembled from all three on read.

use rusqlite::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    parse_datetime, parse_order_status, parse_payment_status, parse_uuid, OptionalExt,
};
use crate::error::Result;
use crate::models::{Order, OrderItem, OrderStatus, TrackingUpdate};

pub struct OrderStore<'a> {
    conn: &'a Connection,
}

impl<'a> OrderStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert an order with its line items and any tracking history
    #[instrument(skip(self, order), fields(order_id = %order.id, items = order.items.len()))]
    pub fn create(&self, order: &Order) -> Result<()> {
        self.conn.execute(
            "INSERT INTO orders (id, customer_id, branch_id, total_amount, payment_status, order_status, tracking_number, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                order.id.to_string(),
                order.customer_id.to_string(),
                order.branch_id.to_string(),
                order.total_amount,
                order.payment_status.as_str(),
                order.order_status.as_str(),
                order.tracking_number,
                order.created_at.to_rfc3339(),
            ],
        )?;

        let mut item_stmt = self.conn.prepare(
            "INSERT INTO order_items (order_id, position, product_id, name, quantity, price)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (position, item) in order.items.iter().enumerate() {
            item_stmt.execute(params![
                order.id.to_string(),
                position as i64,
                item.product_id.to_string(),
                item.name,
                item.quantity,
                item.price,
            ])?;
        }

        for update in &order.tracking_updates {
            self.append_tracking_update(order.id, update)?;
        }
        Ok(())
    }

    /// Find order by ID, with items and history
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        let header = self
            .conn
            .query_row(
                "SELECT id, customer_id, branch_id, total_amount, payment_status, order_status, tracking_number, created_at
                 FROM orders WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok(Order {
                        id: parse_uuid(&row.get::<_, String>(0)?)?,
                        customer_id: parse_uuid(&row.get::<_, String>(1)?)?,
                        branch_id: parse_uuid(&row.get::<_, String>(2)?)?,
                        items: Vec::new(),
                        total_amount: row.get(3)?,
                        payment_status: parse_payment_status(&row.get::<_, String>(4)?)?,
                        order_status: parse_order_status(&row.get::<_, String>(5)?)?,
                        tracking_number: row.get(6)?,
                        tracking_updates: Vec::new(),
                        created_at: parse_datetime(&row.get::<_, String>(7)?)?,
                    })
                },
            )
            .optional()?;

        let Some(mut order) = header else {
            return Ok(None);
        };
        order.items = self.items_for(id)?;
        order.tracking_updates = self.tracking_updates_for(id)?;
        Ok(Some(order))
    }

    /// Orders for a customer, newest first
    pub fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Order>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM orders WHERE customer_id = ?1 ORDER BY created_at DESC",
        )?;
        let ids = stmt
            .query_map(params![customer_id.to_string()], |row| {
                parse_uuid(&row.get::<_, String>(0)?)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut orders = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(order) = self.find_by_id(id)? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    /// Append one history entry. Existing entries cannot be changed; the
    /// schema aborts UPDATE and DELETE on this table.
    #[instrument(skip(self, update), fields(status = %update.status))]
    pub fn append_tracking_update(&self, order_id: Uuid, update: &TrackingUpdate) -> Result<()> {
        self.conn.execute(
            "INSERT INTO tracking_updates (order_id, status, location, description, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                order_id.to_string(),
                update.status.as_str(),
                update.location,
                update.description,
                update.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn set_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
        self.conn.execute(
            "UPDATE orders SET order_status = ?1 WHERE id = ?2",
            params![status.as_str(), order_id.to_string()],
        )?;
        Ok(())
    }

    fn items_for(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT product_id, name, quantity, price FROM order_items
             WHERE order_id = ?1 ORDER BY position",
        )?;
        let items = stmt
            .query_map(params![order_id.to_string()], |row| {
                Ok(OrderItem {
                    product_id: parse_uuid(&row.get::<_, String>(0)?)?,
                    name: row.get(1)?,
                    quantity: row.get(2)?,
                    price: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// History in insertion order
    fn tracking_updates_for(&self, order_id: Uuid) -> Result<Vec<TrackingUpdate>> {
        let mut stmt = self.conn.prepare(
            "SELECT status, location, description, timestamp FROM tracking_updates
             WHERE order_id = ?1 ORDER BY seq",
        )?;
        let updates = stmt
            .query_map(params![order_id.to_string()], |row| {
                Ok(TrackingUpdate {
                    status: parse_order_status(&row.get::<_, String>(0)?)?,
                    location: row.get(1)?,
                    description: row.get(2)?,
                    timestamp: parse_datetime(&row.get::<_, String>(3)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(updates)
    }
}
