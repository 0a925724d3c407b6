//! Authentication and the client session

mod credentials;
mod errors;
mod models;
mod service;
mod session;
mod token;

pub use credentials::*;
pub use errors::*;
pub use models::*;
pub use service::*;
pub use session::*;
pub use token::*;
