// kab-server/src/state.rs
use kab_orders::Engine;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub engine: Arc<Engine>,
}
