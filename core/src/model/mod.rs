// kab-orders/src/model/mod.rs

//! Records persisted by the store and the read models assembled from them.

pub mod cart;
pub mod order;
pub mod page;
pub mod product;
pub mod user;

pub use cart::{Cart, CartLine, CartStatus, CartView, LineItem};
pub use order::{Confirmation, Order, OrderDetails, OrderLine, ProductSales};
pub use page::{OrderFilter, Page};
pub use product::{NewProduct, Product, ProductPatch};
pub use user::{NewUser, User, UserPatch, UserRole};
