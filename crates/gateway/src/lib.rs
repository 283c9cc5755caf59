pub mod annotate;
pub mod arbiter;
pub mod codec;
pub mod config;
pub mod config_store;
pub mod error;
pub mod mapper;
pub mod metrics;
pub mod server;
pub mod state;
pub mod status;

pub use server::build_router;
pub use state::AppState;
