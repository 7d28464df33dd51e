pub mod auth;
pub mod completion;
pub mod config;
pub mod export;
pub mod link;
pub mod new;
pub mod present;
pub mod records;
pub mod serve;
pub mod slides;

use std::path::PathBuf;
use std::rc::Rc;

use crate::api::{ApiClient, ApiError};
use crate::config::Config;
use crate::http::{HttpTransport, UreqTransport};
use crate::nav::SiteLocation;
use crate::session::{FileSessionStore, SessionContext};

/// Shared blocking transport for one command.
fn transport() -> Rc<dyn HttpTransport> {
    Rc::new(UreqTransport::new())
}

/// Client for the configured backend, restoring the saved session. Without a
/// config directory the session lives only for this run.
fn api_client(config: &Config, transport: Rc<dyn HttpTransport>) -> ApiClient {
    let session = match FileSessionStore::in_config_dir() {
        Ok(store) => SessionContext::new(Box::new(store)),
        Err(e) => {
            tracing::warn!("Session will not be saved: {e:#}");
            SessionContext::in_memory()
        }
    };
    ApiClient::new(transport, config.api_base_url(), Rc::new(session))
}

fn site(config: &Config) -> SiteLocation {
    SiteLocation::new(&config.site_url(), &config.site_base_path())
}

fn project_root(root: Option<PathBuf>, config: &Config) -> PathBuf {
    root.unwrap_or_else(|| config.server_root())
}

/// The message shown for a failed API call, with a next step when there is
/// an obvious one.
fn user_error(e: ApiError) -> anyhow::Error {
    tracing::debug!("API error: {e:?}");
    match hint(&e) {
        Some(hint) => anyhow::anyhow!("{}\n{hint}", e.user_message()),
        None => anyhow::anyhow!(e.user_message()),
    }
}

fn hint(e: &ApiError) -> Option<&'static str> {
    if e.is_network() {
        Some("Is the backend running? Check api.base_url with `pptdeck config show`.")
    } else if e.is_auth() {
        Some("Run `pptdeck auth login` to sign in again.")
    } else if e.is_validation() {
        Some("Check the arguments with --help.")
    } else {
        None
    }
}
