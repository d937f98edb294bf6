pub mod config;
pub mod error;
pub mod security;
pub mod storage;
pub mod identity;
pub mod routes;
pub mod navigation;
pub mod gate;

pub use config::AuthConfig;
pub use error::{AppError, AppResult, AuthFailure, StoreError};
pub use gate::{GateOutcome, RequestGate};
