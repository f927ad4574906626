//! Value source used by prefetch

use std::future::Future;

use async_trait::async_trait;

use crate::cache::traits::CacheOperationError;
use crate::cache::types::CacheValue;

/// Produces the value for a key that is not cached yet
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, key: &str) -> Result<CacheValue, CacheOperationError>;
}

#[async_trait]
impl<F, Fut> Loader for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CacheValue, CacheOperationError>> + Send,
{
    async fn load(&self, key: &str) -> Result<CacheValue, CacheOperationError> {
        (self)(key.to_string()).await
    }
}
