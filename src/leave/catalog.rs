use super::repository::LeaveTypeCatalog;
use crate::error::{LeaveError, LeaveResult};
use crate::model::leave_type::LeaveType;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

const CATALOG_KEY: &str = "leave_types";

/// Leave types change rarely; the whole list is cached and lookups filter it.
pub struct CachedLeaveTypeCatalog {
    inner: Arc<dyn LeaveTypeCatalog>,
    cache: Cache<&'static str, Arc<Vec<LeaveType>>>,
}

impl CachedLeaveTypeCatalog {
    pub fn new(inner: Arc<dyn LeaveTypeCatalog>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(ttl)
                .build(),
        }
    }

    async fn load(&self) -> LeaveResult<Arc<Vec<LeaveType>>> {
        let inner = Arc::clone(&self.inner);
        self.cache
            .try_get_with(CATALOG_KEY, async move { inner.all().await.map(Arc::new) })
            .await
            .map_err(|e: Arc<LeaveError>| LeaveError::Storage(e.to_string()))
    }
}

#[async_trait]
impl LeaveTypeCatalog for CachedLeaveTypeCatalog {
    async fn find_by_code(&self, code: &str) -> LeaveResult<Option<LeaveType>> {
        Ok(self.load().await?.iter().find(|t| t.has_code(code)).cloned())
    }

    async fn all(&self) -> LeaveResult<Vec<LeaveType>> {
        Ok(self.load().await?.as_ref().clone())
    }
}
