#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

pub use self::application::{AppService, EnvConfig};
pub use self::context::RequestContext;

pub mod application;
pub mod cache;
pub mod context;
pub mod db;
pub mod repository;

#[cfg(any(test, feature = "test-util"))]
pub mod test_util;
