//! Per-user cycle locks

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

type UserLock = Arc<tokio::sync::Mutex<()>>;

/// Hands out one async mutex per user name
///
/// Entries only live while some cycle holds or waits on them.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, UserLock>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `user`'s store. Same `Arc` for the same user.
    pub fn lock_for(&self, user: &str) -> UserLock {
        self.locks
            .lock()
            .entry(user.to_string())
            .or_default()
            .clone()
    }

    /// Like `lock_for`, but the entry is pruned when the handle is dropped
    /// and nobody else holds it
    pub fn handle_for(&self, user: &str) -> LockHandle<'_> {
        LockHandle {
            locks: self,
            user: user.to_string(),
            lock: self.lock_for(user),
        }
    }

    /// Drop `user`'s entry unless references beyond `held` are alive
    fn prune(&self, user: &str, held: usize) {
        let mut locks = self.locks.lock();
        if locks.get(user).is_some_and(|lock| Arc::strong_count(lock) <= held) {
            locks.remove(user);
        }
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

/// A user's lock that releases its registry entry on drop
pub struct LockHandle<'a> {
    locks: &'a UserLocks,
    user: String,
    lock: UserLock,
}

impl LockHandle<'_> {
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for LockHandle<'_> {
    fn drop(&mut self) {
        // The map's reference plus this handle's
        self.locks.prune(&self.user, 2);
    }
}
