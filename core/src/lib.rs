pub mod catalog;
pub mod codec;
pub mod error;
pub mod generator;
pub mod models;
pub mod service;
pub mod store;

pub use error::{Error, Result};
