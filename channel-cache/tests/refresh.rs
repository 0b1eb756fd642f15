use std::{sync::Arc, time::Duration};

use anyhow::Result;
use channel_cache::{cache::Cache, record::Record, refresh::Refresher, store::MemoryStore};
use tokio::{sync::oneshot, time::timeout};

const PERIOD: Duration = Duration::from_millis(20);

async fn wait_for_generation(cache: &Cache, generation: u64) -> Result<()> {
    timeout(Duration::from_secs(3), async {
        while cache.snapshot().generation() < generation {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}

#[tokio::test]
async fn loop_reloads_cache_every_period() -> Result<()> {
    let store = Arc::new(MemoryStore::new(vec![Record::new(1, "UCa")]));
    let cache = Arc::new(Cache::new());
    let refresher = Refresher::new(store.clone(), Arc::clone(&cache));
    refresher.refresh().await?;

    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(refresher.run_until(PERIOD, async move {
        let _ = stopped.await;
    }));

    store.set_records(vec![Record::new(1, "UCa"), Record::new(2, "UCb")]);
    wait_for_generation(&cache, 2).await?;
    assert_eq!(cache.snapshot().len(), 2);

    let _ = stop.send(());
    timeout(Duration::from_secs(3), task).await??;
    Ok(())
}

#[tokio::test]
async fn loop_survives_store_outage() -> Result<()> {
    let store = Arc::new(MemoryStore::new(vec![Record::new(1, "UCa")]));
    let cache = Arc::new(Cache::new());
    let refresher = Refresher::new(store.clone(), Arc::clone(&cache));
    refresher.refresh().await?;
    store.set_unavailable(true);

    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(refresher.run_until(PERIOD, async move {
        let _ = stopped.await;
    }));

    // Several ticks fail while the store is down; the first snapshot stays.
    tokio::time::sleep(PERIOD * 4).await;
    let snapshot = cache.snapshot();
    assert_eq!(snapshot.generation(), 1);
    assert_eq!(snapshot.records(), &[Record::new(1, "UCa")]);

    store.set_records(vec![Record::new(7, "UCz")]);
    store.set_unavailable(false);
    wait_for_generation(&cache, 2).await?;
    assert_eq!(cache.snapshot().records(), &[Record::new(7, "UCz")]);

    let _ = stop.send(());
    timeout(Duration::from_secs(3), task).await??;
    Ok(())
}
