use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use crate::task_pool::TaskPool;
use crate::{PoolError, Result};

mod http;

pub use self::http::HttpRegistry;
pub use crate::common::{Manifest, ManifestHistory};

/// Credentials sent with every registry request.
///
/// A bearer token takes precedence over a username/password pair.
#[derive(Clone, Default)]
pub struct RegistryCredentials {
    /// OAuth bearer token.
    pub bearer: Option<String>,
    /// Basic auth user name.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A tag and the time its image was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagInfo {
    /// Repository the tag belongs to.
    pub repository: String,
    /// Tag name.
    pub tag: String,
    /// Build time from the image manifest.
    pub created: DateTime<Utc>,
}

/// The tags of one repository in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryTags {
    /// Repository name.
    pub repository: String,
    /// Tag names as listed by the registry.
    pub tags: Vec<String>,
}

/// The registry calls the fan-out helpers are built on.
///
/// Implementations are shared across pool workers, so they must be
/// thread safe and every returned future must be `Send`.
pub trait RegistryClient: Send + Sync + 'static {
    /// Lists repository names.
    fn catalog(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Lists tag names of a repository.
    fn tags(&self, repository: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Fetches the manifest of one tag.
    fn manifest(&self, repository: &str, tag: &str)
        -> impl Future<Output = Result<Manifest>> + Send;
}

/// Lists a repository's tags with their build times, newest first.
///
/// Manifests are fetched through a [`TaskPool`] with at most `limit`
/// requests in flight. A tag whose manifest cannot be fetched or read is
/// logged and left out; only failing to list the tags is an error.
pub async fn tag_infos<C: RegistryClient>(
    client: Arc<C>,
    repository: &str,
    limit: u32,
) -> Result<Vec<TagInfo>> {
    let tags = client.tags(repository).await?;
    debug!("Fetching {} manifests of {}", tags.len(), repository);

    let mut pool: TaskPool<Option<TagInfo>, PoolError> = TaskPool::new(limit)?;
    for tag in tags {
        let client = Arc::clone(&client);
        let repository = repository.to_owned();
        pool.add_task(move || async move {
            match fetch_tag_info(&*client, repository, tag).await {
                Ok(info) => Ok(Some(info)),
                Err((tag, e)) => {
                    warn!("Skipping tag {tag}: {e}");
                    Ok(None)
                }
            }
        });
    }

    let mut infos: Vec<TagInfo> = pool.collect().await?.into_iter().flatten().collect();
    infos.sort_by(|a, b| b.created.cmp(&a.created));
    Ok(infos)
}

async fn fetch_tag_info<C: RegistryClient>(
    client: &C,
    repository: String,
    tag: String,
) -> std::result::Result<TagInfo, (String, PoolError)> {
    let created = match client.manifest(&repository, &tag).await {
        Ok(manifest) => manifest.created(),
        Err(e) => Err(e),
    };
    match created {
        Ok(created) => Ok(TagInfo {
            repository,
            tag,
            created,
        }),
        Err(e) => Err((tag, e)),
    }
}

/// Lists the tags of every repository in the catalog, sorted by
/// repository name.
///
/// Tag lists are fetched through a [`TaskPool`] with at most `limit`
/// requests in flight. If any listing fails, the others still run and the
/// first failure is returned.
pub async fn repository_tags<C: RegistryClient>(
    client: Arc<C>,
    limit: u32,
) -> Result<Vec<RepositoryTags>> {
    let repositories = client.catalog().await?;
    debug!("Listing tags of {} repositories", repositories.len());

    let mut pool: TaskPool<RepositoryTags, PoolError> = TaskPool::new(limit)?;
    for repository in repositories {
        let client = Arc::clone(&client);
        pool.add_task(move || async move {
            let tags = client.tags(&repository).await?;
            Ok::<_, PoolError>(RepositoryTags { repository, tags })
        });
    }

    let mut listed = pool.collect().await?;
    listed.sort_by(|a, b| a.repository.cmp(&b.repository));
    Ok(listed)
}
