use async_resource::mock::Recorder;
use async_resource::scheduler::{Scheduler, TokioScheduler};
use async_resource::storage::{MemoryStorage, Storage};
use async_resource::{
    source_fn, BoxError, CacheOptions, ConsumeOptions, Producer, Resource, ResourceStore,
    SourceRequest, StoreConfig,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const TTL: Duration = Duration::from_millis(1000);

/// Returns `{"name": "Bob", "count": n}` where `n` counts the calls.
fn counting_producer(calls: &Arc<AtomicUsize>) -> Producer<Value, Value> {
    let calls = Arc::clone(calls);
    Producer::new(source_fn(move |_req: SourceRequest<Value, Value>| {
        let count = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move { Ok::<_, BoxError>(json!({ "name": "Bob", "count": count })) }
    }))
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[tokio::test(start_paused = true)]
async fn cached_resource_is_refreshed_on_ttl() {
    let storage = Arc::new(MemoryStorage::new());
    let cached_user = json!({ "name": "Bob", "surname": "Sponge" });
    storage
        .set(
            "userResource",
            json!({ "data": cached_user, "timestamp": chrono::Utc::now().timestamp_millis() }),
        )
        .await
        .unwrap();
    let store: ResourceStore<Value> = ResourceStore::with_config(StoreConfig::new().storage(storage));

    let recorder = Recorder::new();
    let _subscription = store.subscribe("user", recorder.callback());

    let calls = Arc::new(AtomicUsize::new(0));
    store
        .register("user", counting_producer(&calls).cache(CacheOptions::new()).ttl(TTL))
        .await;
    let handle = store.consume("user", ConsumeOptions::new()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    sleep(ms(1050)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    sleep(ms(1000)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let first = json!({ "name": "Bob", "count": 1 });
    let second = json!({ "name": "Bob", "count": 2 });
    assert_eq!(
        recorder.snapshots(),
        vec![
            Resource {
                loading: true,
                cache: true,
                ..Resource::default()
            },
            Resource::cached(cached_user.clone()),
            Resource::cached(cached_user).with_loading(true),
            Resource::loaded(first.clone()),
            Resource::loaded(first).with_loading(true),
            Resource::loaded(second),
        ]
    );
    handle.stop();
}

#[tokio::test(start_paused = true)]
async fn refresh_stops_when_every_consumer_stopped() {
    let store: ResourceStore<Value> = ResourceStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    store.register("user", counting_producer(&calls).ttl(TTL)).await;

    let mut handles = futures::future::join_all(
        (0..5).map(|_| store.consume("user", ConsumeOptions::new())),
    )
    .await
    .into_iter()
    .collect::<Result<Vec<_>, _>>()
    .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.usage("user"), 5);

    sleep(ms(1050)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    handles.push(
        store
            .consume("user", ConsumeOptions::new().reload())
            .await
            .unwrap(),
    );
    handles.push(store.consume("user", ConsumeOptions::new()).await.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.usage("user"), 7);

    for handle in handles {
        handle.stop();
    }
    assert_eq!(store.usage("user"), 0);

    sleep(ms(1000)).await;
    sleep(ms(5000)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn refresh_keeps_polling_while_one_consumer_remains() {
    let store: ResourceStore<Value> = ResourceStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    store.register("user", counting_producer(&calls).ttl(TTL)).await;

    let staying = store.consume("user", ConsumeOptions::new()).await.unwrap();
    let leaving = store.consume("user", ConsumeOptions::new()).await.unwrap();
    leaving.stop();

    sleep(ms(3050)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    staying.stop();
    sleep(ms(3000)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn refresh_replays_remembered_props() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let store: ResourceStore<Value, String> = ResourceStore::new();
    store
        .register(
            "user",
            Producer::new(source_fn(move |req: SourceRequest<Value, String>| {
                sink.lock().unwrap().push(req.props.clone());
                async move { Ok::<_, BoxError>(json!(null)) }
            }))
            .ttl(TTL),
        )
        .await;

    let handle = store
        .consume("user", ConsumeOptions::new().props("bob".to_string()))
        .await
        .unwrap();
    sleep(ms(1050)).await;
    handle.stop();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![Some("bob".to_string()), Some("bob".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn purge_cancels_pending_refreshes() {
    let scheduler = Arc::new(TokioScheduler::new());
    let store: ResourceStore<Value> =
        ResourceStore::with_scheduler(StoreConfig::default(), scheduler.clone());
    let calls = Arc::new(AtomicUsize::new(0));
    store.register("user", counting_producer(&calls).ttl(TTL)).await;

    let handle = store.consume("user", ConsumeOptions::new()).await.unwrap();
    assert!(scheduler.is_scheduled("user"));

    store.purge().await;
    assert!(!scheduler.is_scheduled("user"));

    sleep(ms(2050)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    handle.stop();
}

#[tokio::test(start_paused = true)]
async fn one_timer_per_identifier() {
    let store: ResourceStore<Value> = ResourceStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    store.register("user", counting_producer(&calls).ttl(TTL)).await;

    let first = store.consume("user", ConsumeOptions::new()).await.unwrap();
    sleep(ms(500)).await;
    let second = store.consume("user", ConsumeOptions::new()).await.unwrap();

    // the tick is anchored on the first consume
    sleep(ms(550)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    sleep(ms(500)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    first.stop();
    second.stop();
}

#[tokio::test(start_paused = true)]
async fn unbounded_ttl_registers_and_never_fires() {
    let store: ResourceStore<Value> = ResourceStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    store.register("user", counting_producer(&calls).ttl(Duration::MAX)).await;

    let handle = store.consume("user", ConsumeOptions::new()).await.unwrap();
    sleep(ms(60_000)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    handle.stop();
}
