pub mod api;
pub mod bus;
pub mod cache;
pub mod config;
pub mod console;
pub mod error;
pub mod host;
pub mod metrics;
pub mod monitor;
pub mod runtime;
pub mod sampler;
pub mod source;
pub mod storage;

pub use error::SamplingError;
