#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod scorer;
pub mod time;

pub use time::Clock;
