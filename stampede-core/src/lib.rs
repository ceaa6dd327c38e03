mod config;
mod constants;
mod error;
mod record;
mod sample;
mod stats;
mod workload;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use record::*;
pub use sample::*;
pub use stats::*;
pub use workload::*;
