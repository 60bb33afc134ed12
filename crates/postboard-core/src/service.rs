//! The cache service task. It is the only owner of the [`ListCache`]; readers
//! and the mutation coordinator reach it through a cloneable [`CacheHandle`]
//! that sends commands over a channel and waits for the acknowledgement.

use std::time::Instant;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, trace};

use crate::{
    cache::{CacheRead, CacheValue, FetchTicket, ListCache, QueryKey},
    constant::CACHE_CHANNEL_SIZE,
    ApiError, PostboardError, PostboardResult, Responder,
};

/// Computes the new value of a key from its current value.
pub type Updater = Box<dyn FnOnce(Option<&CacheValue>) -> Option<CacheValue> + Send>;

pub enum CacheCommand {
    Read {
        key: QueryKey,
        resp: Responder<CacheRead>,
    },
    BeginFetch {
        key: QueryKey,
        resp: Responder<FetchTicket>,
    },
    CompleteFetch {
        ticket: FetchTicket,
        result: Result<CacheValue, ApiError>,
        resp: Responder<bool>,
    },
    Update {
        key: QueryKey,
        updater: Updater,
        resp: Responder<Option<CacheValue>>,
    },
    Restore {
        key: QueryKey,
        snapshot: Option<CacheValue>,
        resp: Responder<()>,
    },
    Invalidate {
        key: QueryKey,
        resp: Responder<bool>,
    },
}

/// Start the cache service. The task ends, handing the cache back, once
/// every handle is dropped.
pub fn spawn_cache_service(cache: ListCache) -> (CacheHandle, JoinHandle<ListCache>) {
    let (tx, rx) = mpsc::channel(CACHE_CHANNEL_SIZE);
    let handle = tokio::spawn(run(cache, rx));
    (CacheHandle { tx }, handle)
}

async fn run(mut cache: ListCache, mut rx: mpsc::Receiver<CacheCommand>) -> ListCache {
    debug!("Cache service running...");
    // Sending on a oneshot only fails when the requester stopped waiting,
    // so the acknowledgements below are fire and forget.
    while let Some(cmd) = rx.recv().await {
        let now = Instant::now();
        match cmd {
            CacheCommand::Read { key, resp } => {
                let _ = resp.send(cache.read(key, now));
            }
            CacheCommand::BeginFetch { key, resp } => {
                trace!(%key, "Fetch started");
                let _ = resp.send(cache.begin_fetch(key));
            }
            CacheCommand::CompleteFetch {
                ticket,
                result,
                resp,
            } => {
                let _ = resp.send(cache.complete_fetch(ticket, result, now));
            }
            CacheCommand::Update { key, updater, resp } => {
                let _ = resp.send(cache.update(key, updater, now));
            }
            CacheCommand::Restore {
                key,
                snapshot,
                resp,
            } => {
                cache.restore(key, snapshot, now);
                let _ = resp.send(());
            }
            CacheCommand::Invalidate { key, resp } => {
                debug!(%key, "Invalidating");
                let _ = resp.send(cache.invalidate(&key));
            }
        }
    }
    debug!("Cache service stopped");
    cache
}

#[derive(Clone, Debug)]
pub struct CacheHandle {
    tx: mpsc::Sender<CacheCommand>,
}

impl CacheHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(Responder<T>) -> CacheCommand,
    ) -> PostboardResult<T> {
        let (responder, receiver) = oneshot::channel();
        self.tx
            .send(build(responder))
            .await
            .map_err(|_| PostboardError::CacheClosed)?;
        Ok(receiver.await.map_err(|_| PostboardError::CacheClosed)?)
    }

    pub async fn read(&self, key: QueryKey) -> PostboardResult<CacheRead> {
        self.request(|resp| CacheCommand::Read { key, resp }).await
    }

    pub async fn begin_fetch(&self, key: QueryKey) -> PostboardResult<FetchTicket> {
        self.request(|resp| CacheCommand::BeginFetch { key, resp })
            .await
    }

    pub async fn complete_fetch(
        &self,
        ticket: FetchTicket,
        result: Result<CacheValue, ApiError>,
    ) -> PostboardResult<bool> {
        self.request(|resp| CacheCommand::CompleteFetch {
            ticket,
            result,
            resp,
        })
        .await
    }

    /// Apply `updater` to the value of `key`; returns the replaced value.
    pub async fn update<F>(&self, key: QueryKey, updater: F) -> PostboardResult<Option<CacheValue>>
    where
        F: FnOnce(Option<&CacheValue>) -> Option<CacheValue> + Send + 'static,
    {
        self.request(|resp| CacheCommand::Update {
            key,
            updater: Box::new(updater),
            resp,
        })
        .await
    }

    pub async fn restore(&self, key: QueryKey, snapshot: Option<CacheValue>) -> PostboardResult<()> {
        self.request(|resp| CacheCommand::Restore {
            key,
            snapshot,
            resp,
        })
        .await
    }

    pub async fn invalidate(&self, key: QueryKey) -> PostboardResult<bool> {
        self.request(|resp| CacheCommand::Invalidate { key, resp })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::post;

    #[tokio::test]
    async fn commands_reach_the_single_owner() {
        let (handle, task) = spawn_cache_service(ListCache::default());
        let key = QueryKey::posts(1);

        let ticket = handle.begin_fetch(key).await.unwrap();
        assert!(handle.read(key).await.unwrap().is_fetching);
        let applied = handle
            .complete_fetch(ticket, Ok(CacheValue::Posts(vec![post(1, 1), post(2, 1)])))
            .await
            .unwrap();
        assert!(applied);

        let snapshot = handle
            .update(key, |_| Some(CacheValue::Posts(vec![])))
            .await
            .unwrap();
        assert_eq!(
            snapshot,
            Some(CacheValue::Posts(vec![post(1, 1), post(2, 1)]))
        );
        handle.restore(key, snapshot.clone()).await.unwrap();
        assert!(handle.invalidate(key).await.unwrap());

        drop(handle);
        let cache = task.await.unwrap();
        let entry = cache.entry(&key).unwrap();
        assert_eq!(Some(entry.value.clone()), snapshot);
        assert!(entry.invalidated);
    }

    #[tokio::test]
    async fn stopped_service_reports_closed() {
        let (handle, task) = spawn_cache_service(ListCache::default());
        task.abort();
        let _ = task.await;
        let err = handle.read(QueryKey::UserCount).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PostboardError>(),
            Some(PostboardError::CacheClosed)
        ));
    }
}
