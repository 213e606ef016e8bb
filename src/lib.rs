//! Text-to-image relay
//!
//! A single-route proxy that keeps the Cloudflare Workers AI credential on the
//! server and relays generated images, plus the client component that drives
//! it (or the provider directly) on behalf of a presentation layer.

pub mod client;
pub mod error;
pub mod mime;
pub mod models;
pub mod provider;
pub mod proxy;

pub use error::{Error, Result};
