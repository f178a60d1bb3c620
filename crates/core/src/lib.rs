#![forbid(unsafe_code)]

pub mod error;
pub mod ledger;
pub mod model;
pub mod navigation;
pub mod quiz_engine;
pub mod time;

pub use error::Error;
pub use time::Clock;
