//! Retry execution for remote calls.
//!
//! - [`classifier`] - mapping an error to [`ErrorClass`] (`Transient`, `Precondition`,
//!   `Fatal`), plus the configurable [`HttpClassifier`]
//! - [`policy`] - [`RetryPolicy`] and the named per-call-site policies
//! - [`executor`] - the [`RetryExecutor`] loop
//! - [`recovery`] - the one-time recovery path built on top of the executor
//! - [`sleeper`] - the sleep seam used between attempts
//!
//! The executor assumes every operation it wraps is safe to invoke more than once
//! (GETs, or submits keyed by a caller-supplied idempotency id).

pub mod classifier;
pub mod executor;
pub mod policy;
pub mod recovery;
pub mod sleeper;


pub use classifier::{Classify, ErrorClass, HttpClassifier, RemoteFailure};
pub use executor::RetryExecutor;
pub use policy::RetryPolicy;
pub use sleeper::{Sleeper, TokioSleeper};
