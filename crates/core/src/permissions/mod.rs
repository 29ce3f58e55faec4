//! Permission system for studio operations

use crate::error::{Error, Result};
use crate::models::Role;

/// Actions that can be performed against the studio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudioAction {
    // Studio administration
    ManageBranches,
    ManageStaff,

    // Scheduling
    ManageRestrictions,
    ManageSessions,
    ManageEvents,
    ReleaseSeats,

    // Front desk
    VerifyBookings,
    UpdatePayments,
    ViewAllBookings,

    // Shop
    ManageProducts,
    UpdateTracking,
    ViewAllOrders,

    // Customers
    ViewCatalog,
    CreateBooking,
    PlaceOrder,
}

impl StudioAction {
    fn describe(&self) -> &'static str {
        match self {
            StudioAction::ManageBranches => "manage branches",
            StudioAction::ManageStaff => "manage staff accounts",
            StudioAction::ManageRestrictions => "manage day restrictions",
            StudioAction::ManageSessions => "manage sessions",
            StudioAction::ManageEvents => "manage events",
            StudioAction::ReleaseSeats => "release seats",
            StudioAction::VerifyBookings => "verify bookings",
            StudioAction::UpdatePayments => "update payments",
            StudioAction::ViewAllBookings => "view all bookings",
            StudioAction::ManageProducts => "manage products",
            StudioAction::UpdateTracking => "update order tracking",
            StudioAction::ViewAllOrders => "view all orders",
            StudioAction::ViewCatalog => "view the catalog",
            StudioAction::CreateBooking => "create bookings",
            StudioAction::PlaceOrder => "place orders",
        }
    }
}

/// Permission matrix for account roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role has permission to perform an action
    pub fn can_perform(role: Role, action: StudioAction) -> bool {
        match action {
            // Studio administration - Admin only
            StudioAction::ManageBranches => role == Role::Admin,
            StudioAction::ManageStaff => role == Role::Admin,

            // Scheduling and front desk - staff
            StudioAction::ManageRestrictions
            | StudioAction::ManageSessions
            | StudioAction::ManageEvents
            | StudioAction::ReleaseSeats
            | StudioAction::VerifyBookings
            | StudioAction::UpdatePayments
            | StudioAction::ViewAllBookings => role >= Role::Manager,

            // Shop back office - staff
            StudioAction::ManageProducts
            | StudioAction::UpdateTracking
            | StudioAction::ViewAllOrders => role >= Role::Manager,

            // Everyone signed in
            StudioAction::ViewCatalog | StudioAction::CreateBooking | StudioAction::PlaceOrder => {
                role >= Role::Customer
            }
        }
    }

    /// Like `can_perform`, as a `PermissionDenied` error
    pub fn require(role: Role, action: StudioAction) -> Result<()> {
        if Self::can_perform(role, action) {
            Ok(())
        } else {
            Err(Error::PermissionDenied(format!(
                "{} accounts cannot {}",
                role,
                action.describe()
            )))
        }
    }

    /// Check if a role can create an account with another role
    pub fn can_assign_role(actor_role: Role, new_role: Role) -> bool {
        match new_role {
            Role::Customer => true,
            Role::Manager | Role::Admin => actor_role == Role::Admin,
        }
    }
}
