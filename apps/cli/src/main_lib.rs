use std::sync::Arc;

use terra_core::{CancellationToken, RetryExecutor, StaticTokenProvider};
use terra_services::{build_http_client, SamService, ServiceClient, WsmService};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, LogFormat};

pub struct Services {
    pub sam: SamService,
    pub wsm: WsmService,
}

/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

/// Wires the service clients: one HTTP client, one credential provider and one retry
/// executor whose sleeps end when `cancel` fires.
pub fn build_services(config: &Config, cancel: CancellationToken) -> anyhow::Result<Services> {
    let http = build_http_client(config.request_timeout)?;
    let credentials = Arc::new(StaticTokenProvider::new(config.access_token.clone()));
    let executor = RetryExecutor::new().with_cancellation(cancel);

    let sam = SamService::new(
        ServiceClient::new(http.clone(), &config.sam_url, credentials.clone()),
        executor.clone(),
    )
    .with_invite_requires_admin(config.invite_requires_admin);
    let wsm = WsmService::new(
        ServiceClient::new(http, &config.wsm_url, credentials),
        executor,
        sam.clone(),
    )
    .with_spend_profile(config.spend_profile.clone());

    tracing::debug!(
        "Services configured: sam={}, wsm={}",
        config.sam_url,
        config.wsm_url
    );
    Ok(Services { sam, wsm })
}
