pub mod ai;
pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod models;
pub mod store;
pub mod telemetry;
pub mod util;

pub use engine::Engine;
pub use error::DomainError;
pub use error::ErrorKind;
