use std::rc::Rc;

use thiserror::Error;

use crate::api::{ApiClient, PptsApi};
use crate::http::{HttpRequest, HttpTransport, TransportError};
use crate::model::{DEFAULT_GROUP, PresentationConfig};
use crate::nav::SiteLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Confirmed through a backend record owned by the signed-in user.
    Record,
    /// Fetched directly as a static asset.
    Static,
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub source: LoadSource,
    pub config: PresentationConfig,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} is not a valid presentation config: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Resolves a group's config: first through the record API when signed in,
/// then as a static file.
pub struct ConfigLoader {
    transport: Rc<dyn HttpTransport>,
    site: SiteLocation,
    records: Option<ApiClient>,
}

impl ConfigLoader {
    pub fn new(transport: Rc<dyn HttpTransport>, site: SiteLocation) -> Self {
        Self {
            transport,
            site,
            records: None,
        }
    }

    /// Enables the record lookup tier.
    pub fn with_records(mut self, client: ApiClient) -> Self {
        self.records = Some(client);
        self
    }

    pub fn site(&self) -> &SiteLocation {
        &self.site
    }

    pub fn load(&self, group: &str) -> Result<LoadOutcome, LoadError> {
        if let Some(record_group) = self.lookup_record(group) {
            match self.fetch(&self.site.config_url(&record_group)) {
                Ok(config) => {
                    return Ok(LoadOutcome {
                        source: LoadSource::Record,
                        config,
                    });
                }
                Err(e) => {
                    tracing::warn!("Record-backed config for {group} failed, falling back: {e}");
                }
            }
        }

        let config = self.fetch(&self.site.config_url(group))?;
        Ok(LoadOutcome {
            source: LoadSource::Static,
            config,
        })
    }

    /// Fetches and decodes one config URL. Only 2xx with a parseable body
    /// counts as success.
    pub fn fetch(&self, url: &str) -> Result<PresentationConfig, LoadError> {
        let response = self.transport.execute(&HttpRequest::get(url))?;
        if !response.is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        serde_json::from_str(&response.body).map_err(|source| LoadError::Parse {
            url: url.to_string(),
            source,
        })
    }

    /// Fetches the raw HTML of one slide.
    pub fn fetch_slide_html(&self, group: &str, file: &str) -> Result<String, LoadError> {
        let url = self.site.slide_url(group, file);
        let response = self.transport.execute(&HttpRequest::get(&url))?;
        if !response.is_success() {
            return Err(LoadError::Status {
                url,
                status: response.status,
            });
        }
        Ok(response.body)
    }

    /// Group folder of the matching record, or `None` when the tier does not
    /// apply or fails for any reason.
    fn lookup_record(&self, group: &str) -> Option<String> {
        let client = self.records.as_ref()?;
        if group == DEFAULT_GROUP || !client.session().is_authenticated() {
            return None;
        }
        match PptsApi::new(client).find_by_name(group) {
            Ok(Some(record)) => {
                tracing::debug!(group, record = record.id, "found record for group");
                if record.group_name.is_empty() {
                    Some(group.to_string())
                } else {
                    Some(record.group_name)
                }
            }
            Ok(None) => {
                tracing::debug!(group, "no record for group, using static config");
                None
            }
            Err(e) => {
                tracing::warn!("Record lookup for {group} failed, using static config: {e}");
                None
            }
        }
    }
}
