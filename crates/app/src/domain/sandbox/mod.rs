//! Payment sandbox

pub mod errors;
pub mod service;
pub mod smoke;

pub use errors::SandboxServiceError;
pub use service::*;
pub use smoke::*;
