//! Business logic services for the API.
//!
//! # Services
//!
//! - `access` - Store authorization from fresh rows on every request
//! - `auth` - Email/password registration and login
//! - `discounts` - Discount code management and storefront previews
//! - `email` - Transactional email via SMTP
//! - `managers` - Store manager invitations under the plan cap
//! - `orders` - Storefront checkout with the commission split
//! - `products` - Catalog writes under the active product cap
//! - `razorpay` - Razorpay REST client and signature checks
//! - `stores` - Store lifecycle under the store cap
//! - `subscriptions` - Subscription lifecycle and webhooks

pub mod access;
pub mod auth;
pub mod discounts;
pub mod email;
pub mod managers;
pub mod orders;
pub mod products;
pub mod razorpay;
pub mod stores;
pub mod subscriptions;

pub use access::{StoreAccess, authorize_store};
pub use auth::{AuthError, AuthService};
pub use discounts::DiscountService;
pub use email::{EmailError, EmailService, Notification};
pub use managers::ManagerService;
pub use orders::{OrderService, PlacedOrder};
pub use products::ProductService;
pub use razorpay::{RazorpayClient, RazorpayError};
pub use stores::{StoreList, StoreService};
pub use subscriptions::SubscriptionService;
