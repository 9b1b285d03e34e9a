// kab-server/src/web/mod.rs

pub mod extractors;
pub mod handlers;
pub mod routes;

#[cfg(test)]
pub(crate) mod test_support;

pub use routes::configure_app_routes;
