pub mod api;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod state;

pub use api::create_router;
pub use config::AppConfig;
pub use error::ApiError;
pub use state::AppState;
