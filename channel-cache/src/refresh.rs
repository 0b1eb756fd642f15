//! Background task that periodically reloads the cache from the record store.
//!
//! A failed fetch never clears the cache: the last good snapshot keeps being
//! served and the next tick tries again.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::{
    select,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    cache::{Cache, Snapshot},
    store::{RecordStore, StoreError},
};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

pub struct Refresher {
    store: Arc<dyn RecordStore>,
    cache: Arc<Cache>,
}

impl Refresher {
    pub fn new(store: Arc<dyn RecordStore>, cache: Arc<Cache>) -> Self {
        Self { store, cache }
    }

    /// Fetches every record and installs them as the new snapshot.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, StoreError> {
        debug!("updating channels");
        let records = self.store.fetch_all().await?;
        let snapshot = self.cache.load(records);
        info!(
            generation = snapshot.generation(),
            records = snapshot.len(),
            "cache refreshed"
        );
        Ok(snapshot)
    }

    /// Refreshes every `period` until `shutdown` resolves. The first refresh
    /// happens one full period after the call, since startup loads the cache
    /// itself.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub async fn run_until<F>(self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            debug!(?period, "waiting before next refresh");
            select! {
                _ = &mut shutdown => {
                    debug!("refresh loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.refresh().await {
                        warn!(
                            error = %err,
                            generation = self.cache.snapshot().generation(),
                            "refresh failed; serving last good snapshot"
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{record::Record, store::MemoryStore};

    #[tokio::test]
    async fn refresh_installs_store_contents() {
        let store = Arc::new(MemoryStore::new(vec![Record::new(1, "a"), Record::new(2, "b")]));
        let cache = Arc::new(Cache::new());
        let refresher = Refresher::new(store, Arc::clone(&cache));

        let snapshot = refresher.refresh().await.unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(cache.snapshot().generation(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_last_snapshot() {
        let store = Arc::new(MemoryStore::new(vec![Record::new(1, "a")]));
        let cache = Arc::new(Cache::new());
        let refresher = Refresher::new(store.clone(), Arc::clone(&cache));
        refresher.refresh().await.unwrap();

        store.set_unavailable(true);
        assert!(refresher.refresh().await.is_err());

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.generation(), 1);
        assert_eq!(snapshot.records(), &[Record::new(1, "a")]);
    }
}
