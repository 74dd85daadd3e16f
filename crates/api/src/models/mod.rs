//! Domain models for the API.
//!
//! Row types derive `sqlx::FromRow` and serialize to the camelCase wire
//! format directly, except [`User`], which carries fields that must never
//! leave the server and is exposed through [`UserResponse`].

pub mod catalog;
pub mod discount;
pub mod manager;
pub mod order;
pub mod store;
pub mod user;

pub use catalog::{Category, NewProduct, Product, ProductUpdate};
pub use discount::{DiscountCode, DiscountUpdate, NewDiscount};
pub use manager::{Invitation, StoreManager};
pub use order::{NewOrder, Order, OrderItem, PlaceOrder};
pub use store::{NewStore, OwnedStore, PublicStore, Store, StoreUpdate};
pub use user::{User, UserResponse, UserWithPassword};

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for the logged-in user's id. Nothing else is kept in the session;
    /// the user row is re-read on every request.
    pub const USER_ID: &str = "user_id";
}
