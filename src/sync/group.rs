//! Coalescing Group
//!
//! Runs at most one fetch per key at a time and hands its result to every
//! caller that asked for the same key while it was in flight.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

/// In-flight fetch: a generation id plus the channel its result lands on.
struct Call<T> {
    id: u64,
    result: watch::Receiver<Option<T>>,
}

struct Calls<T> {
    next_id: u64,
    in_flight: HashMap<String, Call<T>>,
}

enum Role<T> {
    Leader(u64, watch::Sender<Option<T>>),
    Waiter(watch::Receiver<Option<T>>),
}

// == Group ==
/// Single-flight de-duplication keyed by string.
///
/// The first caller for a key becomes the leader and runs the fetch; callers
/// arriving while it runs wait for and clone the leader's result. Once the
/// result is published the key is cleared, so the next call fetches afresh.
/// If the leader is dropped before finishing, its waiters retry and one of
/// them takes over.
pub struct Group<T> {
    calls: Mutex<Calls<T>>,
}

impl<T> Default for Group<T> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Calls {
                next_id: 0,
                in_flight: HashMap::new(),
            }),
        }
    }
}

impl<T> fmt::Debug for Group<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("in_flight", &self.calls.lock().in_flight.len())
            .finish()
    }
}

impl<T> Group<T>
where
    T: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `fetch` for `key` unless a fetch for it is already in flight, in
    /// which case the in-flight result is awaited and returned instead.
    ///
    /// Waiting never times out; `fetch` owns its own deadlines.
    pub async fn run<F, Fut>(&self, key: &str, fetch: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let (id, sender) = loop {
            match self.join(key) {
                Role::Leader(id, sender) => break (id, sender),
                Role::Waiter(mut receiver) => {
                    debug!(key, "joining in-flight fetch");
                    let published = match receiver.wait_for(Option::is_some).await {
                        Ok(value) => (*value).clone(),
                        Err(_) => None,
                    };
                    if let Some(result) = published {
                        return result;
                    }
                    debug!(key, "in-flight fetch abandoned, retrying");
                }
            }
        };

        let guard = InFlightGuard {
            group: self,
            key,
            id,
        };
        let result = fetch().await;
        guard.finish(sender, result.clone());
        result
    }

    /// Number of keys with a fetch in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().in_flight.len()
    }

    fn join(&self, key: &str) -> Role<T> {
        let mut calls = self.calls.lock();
        if let Some(call) = calls.in_flight.get(key) {
            return Role::Waiter(call.result.clone());
        }

        calls.next_id += 1;
        let id = calls.next_id;
        let (sender, receiver) = watch::channel(None);
        calls.in_flight.insert(
            key.to_string(),
            Call {
                id,
                result: receiver,
            },
        );
        Role::Leader(id, sender)
    }

    fn forget(&self, key: &str, id: u64) {
        let mut calls = self.calls.lock();
        if calls.in_flight.get(key).map_or(false, |call| call.id == id) {
            calls.in_flight.remove(key);
        }
    }
}

/// Clears the leader's in-flight slot even if the leader future is dropped
/// mid-fetch.
struct InFlightGuard<'a, T: Clone + Send + Sync> {
    group: &'a Group<T>,
    key: &'a str,
    id: u64,
}

impl<T: Clone + Send + Sync> InFlightGuard<'_, T> {
    fn finish(self, sender: watch::Sender<Option<T>>, result: T) {
        self.group.forget(self.key, self.id);
        sender.send_replace(Some(result));
    }
}

impl<T: Clone + Send + Sync> Drop for InFlightGuard<'_, T> {
    fn drop(&mut self) {
        self.group.forget(self.key, self.id);
    }
}
