#![warn(rust_2018_idioms)]

pub mod adapter;
pub mod app;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod healthcheck;
pub mod otlp;
pub mod port;

#[doc(hidden)]
pub mod test_support;

pub use healthcheck::healthcheck_with_port;
