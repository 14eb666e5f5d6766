use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Serializes create and approve per employee within this process, so the
/// overlap and quota checks see a stable set of rows until the write lands.
///
/// Entries are never evicted; one small mutex per employee that ever filed a request.
#[derive(Default)]
pub struct EmployeeLocks {
    locks: Mutex<HashMap<u64, Arc<AsyncMutex<()>>>>,
}

impl EmployeeLocks {
    pub async fn lock(&self, employee_id: u64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(employee_id).or_default())
        };
        lock.lock_owned().await
    }
}
