//! # Wagerlog API
//!
//! HTTP request layer: routes raw records to per-partition segment writers
//! and streams partition scans back as JSON.
//!
//! ```ignore
//! let state = Arc::new(AppState::new(&config.storage)?);
//! let app = create_router(state.clone());
//! axum::serve(listener, app).await?;
//! state.registry.close_all()?;
//! ```

pub mod registry;
pub mod server;
pub mod telemetry;

pub use registry::WriterRegistry;
pub use server::{create_router, ApiRecord, AppState};
pub use telemetry::init_tracing;
