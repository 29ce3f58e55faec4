//! Data models for Atelier

mod booking;
mod branch;
mod event;
mod order;
mod product;
mod session;
mod user;

pub use booking::*;
pub use branch::*;
pub use event::*;
pub use order::*;
pub use product::*;
pub use session::*;
pub use user::*;
