// kab-server/src/web/handlers/mod.rs

pub mod analytics_handlers;
pub mod cart_handlers;
pub mod order_handlers;
pub mod product_handlers;
pub mod user_handlers;
