//! Order fulfillment tracking
//!
//! Checkout snapshots prices and draws down stock; afterwards an order only
//! moves by appending tracking updates, each of which becomes the order's
//! current status.

use chrono::Utc;
use rand::Rng;
use rusqlite::Connection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::invariants::assert_order_invariants;
use crate::models::{NewOrder, Order, OrderItem, OrderStatus, TrackingUpdate};
use crate::policy::FulfillmentPolicy;
use crate::storage::{BranchStore, Database, OrderStore, ProductStore};

const TRACKING_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const TRACKING_SUFFIX_LEN: usize = 12;
const MAX_TRACKING_ATTEMPTS: usize = 3;

/// `TRK` followed by 12 uppercase letters and digits
pub fn generate_tracking_number() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..TRACKING_SUFFIX_LEN)
        .map(|_| TRACKING_CHARSET[rng.gen_range(0..TRACKING_CHARSET.len())] as char)
        .collect();
    format!("TRK{}", suffix)
}

pub struct FulfillmentTracker<'a> {
    db: &'a Database,
    policy: &'a FulfillmentPolicy,
}

impl<'a> FulfillmentTracker<'a> {
    pub fn new(db: &'a Database, policy: &'a FulfillmentPolicy) -> Self {
        Self { db, policy }
    }

    /// Check out a basket at a branch
    #[instrument(skip(self, new), fields(customer_id = %new.customer_id, branch_id = %new.branch_id))]
    pub fn place_order(&self, new: NewOrder) -> Result<Order> {
        if new.items.is_empty() {
            return Err(Error::validation("Order must contain at least one item"));
        }
        if let Some(line) = new.items.iter().find(|l| l.quantity < 1) {
            return Err(Error::validation(format!(
                "Quantity for product {} must be at least 1",
                line.product_id
            )));
        }

        let order = self.db.transaction(|tx| {
            let branch = BranchStore::new(tx)
                .find_by_id(new.branch_id)?
                .ok_or_else(|| Error::not_found(format!("Branch {}", new.branch_id)))?;
            if !branch.is_active {
                return Err(Error::validation("Branch is not active"));
            }

            let products = ProductStore::new(tx);
            let mut items = Vec::with_capacity(new.items.len());
            for line in &new.items {
                let product = products
                    .find_by_id(line.product_id)?
                    .ok_or_else(|| Error::not_found(format!("Product {}", line.product_id)))?;
                if !product.is_active {
                    return Err(Error::validation(format!("{} is no longer sold", product.name)));
                }
                if !product.available_at(branch.id) {
                    return Err(Error::validation(format!(
                        "{} is not sold at {}",
                        product.name, branch.name
                    )));
                }
                if product.stock < line.quantity {
                    warn!(product_id = %product.id, stock = product.stock, requested = line.quantity, "Selling past recorded stock");
                }
                products.decrement_stock(product.id, line.quantity)?;
                items.push(OrderItem {
                    product_id: product.id,
                    name: product.name,
                    quantity: line.quantity,
                    price: product.price,
                });
            }

            let total_amount: i64 = items.iter().map(|i| i.price * i.quantity as i64).sum();
            let mut order = Order {
                id: Uuid::new_v4(),
                customer_id: new.customer_id,
                branch_id: branch.id,
                items,
                total_amount,
                payment_status: new.payment_status,
                order_status: OrderStatus::Pending,
                tracking_number: String::new(),
                tracking_updates: Vec::new(),
                created_at: Utc::now(),
            };
            insert_with_tracking_number(tx, &mut order)?;
            Ok(order)
        })?;

        assert_order_invariants(&order);
        info!(order_id = %order.id, tracking_number = %order.tracking_number, total = order.total_amount, "Order placed");
        Ok(order)
    }

    /// Append a status entry and make it the order's current status
    #[instrument(skip(self, location, description))]
    pub fn add_tracking_update(
        &self,
        order_id: Uuid,
        status: &str,
        location: &str,
        description: &str,
    ) -> Result<Order> {
        let status = OrderStatus::from_str(status.trim())
            .ok_or_else(|| Error::validation(format!("Unknown order status '{}'", status)))?;

        let order = self.db.transaction(|tx| {
            let orders = OrderStore::new(tx);
            let current = orders
                .find_by_id(order_id)?
                .ok_or_else(|| Error::not_found(format!("Order {}", order_id)))?;

            if self.policy.strict_transitions && !status.can_follow(current.order_status) {
                warn!(%order_id, from = %current.order_status, to = %status, "Rejected status transition");
                return Err(Error::conflict(format!(
                    "Order cannot move from {} to {}",
                    current.order_status, status
                )));
            }

            let update = TrackingUpdate {
                status,
                location: location.to_string(),
                description: description.to_string(),
                timestamp: Utc::now(),
            };
            orders.append_tracking_update(order_id, &update)?;
            orders.set_order_status(order_id, status)?;
            orders
                .find_by_id(order_id)?
                .ok_or_else(|| Error::not_found(format!("Order {}", order_id)))
        })?;

        assert_order_invariants(&order);
        info!(%order_id, status = %order.order_status, "Tracking updated");
        Ok(order)
    }

    pub fn get_order(&self, id: Uuid) -> Result<Order> {
        self.db
            .orders()
            .find_by_id(id)?
            .ok_or_else(|| Error::not_found(format!("Order {}", id)))
    }

    pub fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Order>> {
        self.db.orders().list_for_customer(customer_id)
    }
}

fn insert_with_tracking_number(conn: &Connection, order: &mut Order) -> Result<()> {
    let orders = OrderStore::new(conn);
    for attempt in 1..=MAX_TRACKING_ATTEMPTS {
        order.tracking_number = generate_tracking_number();
        match orders.create(order) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_unique_violation() => {
                warn!(attempt, "Tracking number collision");
            }
            Err(e) => return Err(e),
        }
    }
    Err(Error::conflict("Could not allocate a tracking number, please retry"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{customer, open_branch};
    use crate::models::{Activity, OrderLine, PaymentStatus, Product};

    fn stocked_product(db: &Database, stock: u32, branch_id: Option<Uuid>) -> Product {
        let product = Product {
            id: Uuid::new_v4(),
            name: "Glitter kit".into(),
            description: None,
            price: 1250,
            stock,
            branch_id,
            is_active: true,
            created_at: Utc::now(),
        };
        db.products().create(&product).unwrap();
        product
    }

    fn order_of(customer_id: Uuid, branch_id: Uuid, product_id: Uuid, quantity: u32) -> NewOrder {
        NewOrder {
            customer_id,
            branch_id,
            items: vec![OrderLine { product_id, quantity }],
            payment_status: PaymentStatus::Completed,
        }
    }

    #[test]
    fn test_tracking_number_shape() {
        let number = generate_tracking_number();
        assert_eq!(number.len(), 15);
        assert!(number.starts_with("TRK"));
        assert!(number[3..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_place_order_snapshots_and_draws_stock() {
        let db = Database::open_in_memory().unwrap();
        let policy = FulfillmentPolicy::default();
        let branch = open_branch(&db, &[Activity::Slime]);
        let customer = customer(&db);
        let product = stocked_product(&db, 10, None);

        let order = FulfillmentTracker::new(&db, &policy)
            .place_order(order_of(customer.id, branch.id, product.id, 3))
            .unwrap();

        assert_eq!(order.order_status, OrderStatus::Pending);
        assert_eq!(order.total_amount, 3750);
        assert_eq!(order.items[0].name, "Glitter kit");
        assert!(order.tracking_updates.is_empty());
        assert_eq!(db.products().find_by_id(product.id).unwrap().unwrap().stock, 7);
    }

    #[test]
    fn test_stock_floors_at_zero() {
        let db = Database::open_in_memory().unwrap();
        let policy = FulfillmentPolicy::default();
        let branch = open_branch(&db, &[Activity::Slime]);
        let customer = customer(&db);
        let product = stocked_product(&db, 2, Some(branch.id));

        FulfillmentTracker::new(&db, &policy)
            .place_order(order_of(customer.id, branch.id, product.id, 5))
            .unwrap();
        assert_eq!(db.products().find_by_id(product.id).unwrap().unwrap().stock, 0);
    }

    #[test]
    fn test_product_from_other_branch_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        let policy = FulfillmentPolicy::default();
        let branch = open_branch(&db, &[Activity::Slime]);
        let other = open_branch(&db, &[Activity::Tufting]);
        let customer = customer(&db);
        let global = stocked_product(&db, 5, None);
        let elsewhere = stocked_product(&db, 5, Some(other.id));

        let err = FulfillmentTracker::new(&db, &policy)
            .place_order(NewOrder {
                customer_id: customer.id,
                branch_id: branch.id,
                items: vec![
                    OrderLine { product_id: global.id, quantity: 1 },
                    OrderLine { product_id: elsewhere.id, quantity: 1 },
                ],
                payment_status: PaymentStatus::Completed,
            })
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(db.products().find_by_id(global.id).unwrap().unwrap().stock, 5);
        assert!(db.orders().list_for_customer(customer.id).unwrap().is_empty());
    }

    #[test]
    fn test_latest_update_sets_status() {
        let db = Database::open_in_memory().unwrap();
        let policy = FulfillmentPolicy::default();
        let branch = open_branch(&db, &[Activity::Slime]);
        let customer = customer(&db);
        let product = stocked_product(&db, 5, None);
        let tracker = FulfillmentTracker::new(&db, &policy);
        let order = tracker
            .place_order(order_of(customer.id, branch.id, product.id, 1))
            .unwrap();

        tracker
            .add_tracking_update(order.id, "shipped", "Warehouse", "Handed to courier")
            .unwrap();
        let order = tracker
            .add_tracking_update(order.id, "delivered", "Front door", "Signed for")
            .unwrap();

        assert_eq!(order.order_status, OrderStatus::Delivered);
        let statuses: Vec<_> = order.tracking_updates.iter().map(|u| u.status).collect();
        assert_eq!(statuses, vec![OrderStatus::Shipped, OrderStatus::Delivered]);

        // Free-form by default: moving backwards is recorded as-is
        let order = tracker
            .add_tracking_update(order.id, "processing", "Returns desk", "Sent back")
            .unwrap();
        assert_eq!(order.order_status, OrderStatus::Processing);
        assert_eq!(order.tracking_updates.len(), 3);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let db = Database::open_in_memory().unwrap();
        let policy = FulfillmentPolicy::default();
        let tracker = FulfillmentTracker::new(&db, &policy);

        let err = tracker
            .add_tracking_update(Uuid::new_v4(), "lost_at_sea", "", "")
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_strict_transitions() {
        let db = Database::open_in_memory().unwrap();
        let policy = FulfillmentPolicy {
            strict_transitions: true,
        };
        let branch = open_branch(&db, &[Activity::Slime]);
        let customer = customer(&db);
        let product = stocked_product(&db, 5, None);
        let tracker = FulfillmentTracker::new(&db, &policy);
        let order = tracker
            .place_order(order_of(customer.id, branch.id, product.id, 1))
            .unwrap();

        tracker
            .add_tracking_update(order.id, "shipped", "Hub", "Dispatched")
            .unwrap();
        let err = tracker
            .add_tracking_update(order.id, "processing", "Hub", "Oops")
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        tracker
            .add_tracking_update(order.id, "cancelled", "Hub", "Customer cancelled")
            .unwrap();
        assert!(tracker
            .add_tracking_update(order.id, "delivered", "Door", "Late")
            .is_err());
        assert_eq!(tracker.get_order(order.id).unwrap().tracking_updates.len(), 2);
    }

    #[test]
    fn test_history_cannot_be_rewritten() {
        let db = Database::open_in_memory().unwrap();
        let policy = FulfillmentPolicy::default();
        let branch = open_branch(&db, &[Activity::Slime]);
        let customer = customer(&db);
        let product = stocked_product(&db, 5, None);
        let tracker = FulfillmentTracker::new(&db, &policy);
        let order = tracker
            .place_order(order_of(customer.id, branch.id, product.id, 1))
            .unwrap();
        tracker
            .add_tracking_update(order.id, "shipped", "Hub", "Dispatched")
            .unwrap();

        assert!(db
            .conn()
            .execute("UPDATE tracking_updates SET status = 'delivered'", [])
            .is_err());
        assert!(db.conn().execute("DELETE FROM tracking_updates", []).is_err());
        assert_eq!(
            tracker.get_order(order.id).unwrap().order_status,
            OrderStatus::Shipped
        );
    }
}
