//! Record sources consumed by the feed loader.

use crate::error::FetchError;
use futures_util::future::BoxFuture;
use pulse_types::Record;
use url::Url;

/// External collaborator that lists the current recent records.
///
/// The loader passes no pagination or filter state; a source returns its
/// records in the order they should be shown.
pub trait RecordSource: Send + Sync {
    fn list_records(&self) -> BoxFuture<'_, Result<Vec<Record>, FetchError>>;
}

/// Fixed in-memory record list.
#[derive(Debug, Clone, Default)]
pub struct StaticRecordSource {
    records: Vec<Record>,
}

impl StaticRecordSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl RecordSource for StaticRecordSource {
    fn list_records(&self) -> BoxFuture<'_, Result<Vec<Record>, FetchError>> {
        let records = self.records.clone();
        Box::pin(async move { Ok(records) })
    }
}

/// Lists records with `GET {endpoint}`, expecting a JSON array of records.
#[derive(Debug, Clone)]
pub struct HttpRecordSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpRecordSource {
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidEndpoint`] if `endpoint` is not an http(s)
    /// URL and [`FetchError::Transport`] if the client cannot be built.
    pub fn new(endpoint: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().build()?;
        Self::with_client(client, endpoint)
    }

    /// Uses a caller-provided client, e.g. one shared with other services.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidEndpoint`] if `endpoint` is not an http(s)
    /// URL.
    pub fn with_client(client: reqwest::Client, endpoint: &str) -> Result<Self, FetchError> {
        let endpoint = Url::parse(endpoint.trim())
            .map_err(|e| FetchError::InvalidEndpoint(format!("{endpoint:?}: {e}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(FetchError::InvalidEndpoint(format!(
                "unsupported scheme {}",
                endpoint.scheme()
            )));
        }
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl RecordSource for HttpRecordSource {
    fn list_records(&self) -> BoxFuture<'_, Result<Vec<Record>, FetchError>> {
        Box::pin(async move {
            let response = self.client.get(self.endpoint.clone()).send().await?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }

            Ok(response.json::<Vec<Record>>().await?)
        })
    }
}
