// src/lib.rs

//! kab-orders: order confirmation and inventory consistency for the kab-phone storefront.
//!
//! The crate turns a user's mutable shopping cart into an immutable order while keeping
//! these guarantees:
//!  - Stock never goes negative, even under concurrent confirmations of the same product.
//!  - Every user has exactly one PENDING cart at all times.
//!  - Every order carries a unique tracking code.
//!  - A confirmation commits completely or leaves no trace.
//!  - Sales analytics read only committed orders at the prices they were sold for.
//!
//! Confirmation runs as a [`ConfirmationPipeline`] of named steps inside one
//! [`UnitOfWork`] handed out by a [`Store`]. [`PgStore`] backs production; [`MemoryStore`]
//! backs tests and benchmarks. [`Engine`] is the entry point for everything else.

pub mod analytics;
pub mod carts;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod model;
pub mod orders;
pub mod pipeline;
pub mod store;

// --- Re-exports for the Public API ---

pub use crate::analytics::{SalesExtremes, TimeRange, Window, WindowReport};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::EngineConfig;
pub use crate::engine::{Engine, EngineBuilder};
pub use crate::error::{EngineError, EngineResult};
pub use crate::orders::{OrderFactory, RandomTrackingCodes, TrackingCodeSource};
pub use crate::pipeline::{ConfirmCtx, ConfirmStage, ConfirmStep, ConfirmationPipeline, PipelineOutcome, StepControl};
pub use crate::store::{MemoryStore, PgStore, Store, UnitOfWork};
