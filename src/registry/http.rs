use std::time::Duration;

use log::debug;
use serde::de::DeserializeOwned;

use super::{Manifest, RegistryClient, RegistryCredentials};
use crate::common::{Catalog, TagList, PAGE_SIZE};
use crate::Result;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A Docker Registry v2 client over HTTP.
pub struct HttpRegistry {
    url: String,
    credentials: RegistryCredentials,
    client: reqwest::Client,
}

impl HttpRegistry {
    /// Creates a client for the registry at `url`.
    ///
    /// With `strict_ssl` off, invalid TLS certificates are accepted.
    pub fn new(
        url: impl Into<String>,
        credentials: RegistryCredentials,
        strict_ssl: bool,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(!strict_ssl)
            .build()?;
        Ok(HttpRegistry {
            url: url.into().trim_end_matches('/').to_owned(),
            credentials,
            client,
        })
    }

    fn endpoint(&self, relative: &str) -> String {
        format!("{}/{}", self.url, relative)
    }

    async fn request<T: DeserializeOwned>(&self, relative: &str) -> Result<T> {
        let url = self.endpoint(relative);
        debug!("GET {url}");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.credentials.bearer {
            request = request.bearer_auth(token);
        } else if let Some(username) = &self.credentials.username {
            request = request.basic_auth(username, self.credentials.password.as_ref());
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

impl RegistryClient for HttpRegistry {
    async fn catalog(&self) -> Result<Vec<String>> {
        let catalog: Catalog = self.request("v2/_catalog").await?;
        Ok(catalog.repositories)
    }

    async fn tags(&self, repository: &str) -> Result<Vec<String>> {
        let relative = format!("v2/{repository}/tags/list?page_size={PAGE_SIZE}&page=1");
        let list: TagList = self.request(&relative).await?;
        Ok(list.tags.unwrap_or_default())
    }

    async fn manifest(&self, repository: &str, tag: &str) -> Result<Manifest> {
        self.request(&format!("v2/{repository}/manifests/{tag}"))
            .await
    }
}
