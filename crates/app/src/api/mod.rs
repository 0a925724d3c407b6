//! Backend API

mod client;
mod errors;
mod http;
mod transport;
mod wire;

pub use client::*;
pub use errors::*;
pub use http::*;
pub use transport::*;
pub use wire::*;
