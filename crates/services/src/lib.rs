//! Terra Services - clients for the platform's control-plane services.
//!
//! Every call goes through the `terra-core` retry executor with the classifier preset
//! of its call site; asynchronous workspace manager jobs are driven by the job poller.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use terra_core::{RetryExecutor, StaticTokenProvider};
//! use terra_services::{build_http_client, SamService, ServiceClient, DEFAULT_TIMEOUT};
//!
//! let http = build_http_client(DEFAULT_TIMEOUT)?;
//! let credentials = Arc::new(StaticTokenProvider::new(token));
//! let sam = SamService::new(
//!     ServiceClient::new(http, "https://sam.example.org", credentials),
//!     RetryExecutor::new(),
//! );
//! let me = sam.get_user_info_or_register_user().await?;
//! ```

pub mod classifiers;
mod client;
mod error;
mod sam;
mod types;
mod wsm;

pub use client::{build_http_client, ServiceClient, DEFAULT_TIMEOUT};
pub use error::{ApiError, Error, Result};
pub use sam::SamService;
pub use types::*;
pub use wsm::WsmService;
