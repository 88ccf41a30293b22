//! HTTP API for remote controllers

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{router, serve};
