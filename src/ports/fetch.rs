use crate::error::FetchError;
use async_trait::async_trait;
use std::path::Path;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Download `url` to `local_path`, returning the number of bytes written.
    async fn fetch(&self, url: &str, local_path: &Path) -> Result<u64, FetchError>;
}
