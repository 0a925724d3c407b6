//! Bookshop client: API transport, session handling and the cart and checkout services.

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod domain;
pub mod observability;
pub mod offline;

#[cfg(test)]
mod test;
