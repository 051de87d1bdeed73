//! In-Flight Write Tracker
//!
//! Ensures at most one store insert per order id is in flight. A second
//! writer for the same id waits until the first one finishes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

// == In-Flight Set ==
/// Ids with a write currently in progress.
#[derive(Debug, Default)]
pub struct InFlight {
    /// Id -> notifier fired when the slot is released
    slots: Mutex<HashMap<String, Arc<Notify>>>,
}

impl InFlight {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Arc<Notify>>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // == Acquire ==
    /// Claims the slot for `id`, waiting while another writer holds it.
    ///
    /// The slot is released when the returned guard is dropped.
    pub async fn acquire(&self, id: &str) -> InFlightGuard<'_> {
        loop {
            let holder = {
                let mut slots = self.slots();
                match slots.get(id) {
                    Some(notify) => notify.clone(),
                    None => {
                        slots.insert(id.to_string(), Arc::new(Notify::new()));
                        return InFlightGuard {
                            owner: self,
                            id: id.to_string(),
                        };
                    }
                }
            };

            let notified = holder.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            // released between the lookup and `enable`: retry right away
            if !self.is_held_by(id, &holder) {
                continue;
            }
            notified.await;
        }
    }

    fn is_held_by(&self, id: &str, holder: &Arc<Notify>) -> bool {
        self.slots()
            .get(id)
            .map(|current| Arc::ptr_eq(current, holder))
            .unwrap_or(false)
    }

    fn release(&self, id: &str) {
        if let Some(notify) = self.slots().remove(id) {
            notify.notify_waiters();
        }
    }

    /// Number of ids currently being written.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    /// True if no write is in flight.
    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }
}

// == Guard ==
/// Exclusive claim on one id; releases on drop.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.release(&self.id);
    }
}
