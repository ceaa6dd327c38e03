#![cfg_attr(docsrs, feature(doc_cfg))]
//! Open-loop HTTP load generation.
//!
//! A [`Driver`] splits a target request rate across worker threads. Every [`Worker`] runs its
//! own single-threaded runtime, launches requests against a [`Target`] at a fixed cadence
//! without waiting for them to finish, and drains everything still in flight once the run's
//! deadline passes. The merged samples are aggregated with [`aggregate`] and rendered across
//! runs by a [`Report`].
//!
//! ```no_run
//! use stampede::prelude::*;
//! use std::num::NonZeroU32;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RunConfig::new(Duration::from_secs(30), NonZeroU32::new(200).unwrap());
//! let run = Driver::new(config, || ShortenerTarget::new("http://localhost:8080")).run()?;
//! println!("{}", aggregate(&run)?);
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod measure;
pub mod rate_limiter;
pub mod report;
pub mod target;
pub mod targets;
pub mod worker;

pub use stampede_core as core;

pub use driver::{partition, Driver, DriverError};
pub use rate_limiter::RateLimiter;
pub use report::{Report, ReportError};
pub use stampede_core::{aggregate, RunConfig, RunSamples, RunStatistics, Sample};
pub use target::{RequestError, Target, TargetError};
pub use worker::{Worker, WorkerError};

pub mod prelude {
    pub use crate::driver::Driver;
    pub use crate::report::{JsonRenderer, Renderer, Report, TableRenderer};
    pub use crate::target::{RequestError, Target, TargetError};
    #[cfg(feature = "http")]
    pub use crate::targets::ShortenerTarget;
    pub use stampede_core::{
        aggregate, load_runs, RequestKind, RunConfig, RunSamples, RunStatistics, Sample,
    };
}
