use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use proptest::prelude::*;

use mousedeck_client::{
    ApiError, CatalogApi, ClientError, EngineState, LocalStorage, MemoryStorage, OfflineClient,
    OperationKind, StorageError, SyncEvent, MAX_RETRIES,
};
use mousedeck_core::{EntityId, Mouse, MouseId, MousePatch, NewMouse};

#[derive(Default)]
struct FakeState {
    mice: BTreeMap<MouseId, Mouse>,
    next_id: i64,
    transient_failures: usize,
    calls: Vec<String>,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-process stand-in for the catalog API.
struct FakeApi {
    state: Mutex<FakeState>,
    up: AtomicBool,
    latency: Duration,
}

impl FakeApi {
    fn new() -> Arc<Self> {
        Self::with_latency(Duration::ZERO)
    }

    fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState::default()),
            up: AtomicBool::new(true),
            latency,
        })
    }

    fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    fn fail_next(&self, n: usize) {
        self.state.lock().unwrap().transient_failures = n;
    }

    fn seed(&self, name: &str, price: f64) -> MouseId {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = MouseId::new(state.next_id);
        state.mice.insert(id, NewMouse::new(name, price).into_mouse(id));
        id
    }

    fn remove(&self, id: MouseId) {
        self.state.lock().unwrap().mice.remove(&id);
    }

    fn mice(&self) -> Vec<Mouse> {
        self.state.lock().unwrap().mice.values().cloned().collect()
    }

    fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    async fn call<T>(
        &self,
        label: String,
        f: impl FnOnce(&mut FakeState) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        if !self.up.load(Ordering::SeqCst) {
            return Err(ApiError::Transient("connection refused".into()));
        }
        {
            let mut state = self.state.lock().unwrap();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut state = self.state.lock().unwrap();
        state.in_flight -= 1;
        state.calls.push(label);
        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(ApiError::Transient("503 Service Unavailable".into()));
        }
        f(&mut state)
    }
}

fn rejected(err: mousedeck_core::DomainError) -> ApiError {
    ApiError::Rejected { status: 400, errors: err.messages() }
}

#[async_trait]
impl CatalogApi for FakeApi {
    async fn probe(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }

    async fn list_mice(&self) -> Result<Vec<Mouse>, ApiError> {
        self.call("GET /mice".into(), |s| Ok(s.mice.values().cloned().collect()))
            .await
    }

    async fn create_mouse(&self, new: &NewMouse) -> Result<Mouse, ApiError> {
        let new = new.clone();
        self.call("POST /mice".into(), move |s| {
            new.validate().map_err(rejected)?;
            s.next_id += 1;
            let id = MouseId::new(s.next_id);
            let mouse = new.into_mouse(id);
            s.mice.insert(id, mouse.clone());
            Ok(mouse)
        })
        .await
    }

    async fn update_mouse(&self, id: MouseId, patch: &MousePatch) -> Result<Mouse, ApiError> {
        let patch = patch.clone();
        self.call(format!("PATCH /mice/{id}"), move |s| {
            let mouse = s.mice.get_mut(&id).ok_or(ApiError::NotFound)?;
            patch.validate().map_err(rejected)?;
            patch.apply_to(mouse);
            Ok(mouse.clone())
        })
        .await
    }

    async fn delete_mouse(&self, id: MouseId) -> Result<(), ApiError> {
        self.call(format!("DELETE /mice/{id}"), move |s| {
            s.mice.remove(&id).map(|_| ()).ok_or(ApiError::NotFound)
        })
        .await
    }
}

async fn open_client(api: Arc<FakeApi>, storage: Arc<MemoryStorage>) -> OfflineClient {
    OfflineClient::open(api, storage, Duration::from_millis(50), Duration::from_millis(50))
        .await
        .unwrap()
}

async fn go_online(client: &OfflineClient, api: &FakeApi) {
    api.set_up(true);
    let state = client.monitor().probe_once().await.unwrap();
    assert!(!state.is_offline_mode());
}

async fn go_offline(client: &OfflineClient, api: &FakeApi) {
    api.set_up(false);
    let state = client.monitor().probe_once().await.unwrap();
    assert!(state.is_offline_mode());
}

fn server(id: MouseId) -> EntityId {
    EntityId::Server(id)
}

fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn offline_add_is_visible_then_synced() {
    let api = FakeApi::new();
    let client = open_client(api.clone(), Arc::new(MemoryStorage::new())).await;
    go_offline(&client, &api).await;
    let mut events = client.subscribe();

    let local = client
        .add_mouse(NewMouse::new("Offline Mouse", 15.0))
        .await
        .unwrap();
    assert!(local.id.is_temporary());
    assert_eq!(client.mice().await.len(), 1);
    assert_eq!(client.pending_count().await, 1);

    // Offline passes do nothing.
    assert!(client.engine().drain().await.unwrap().skipped);
    assert!(api.calls().is_empty());

    go_online(&client, &api).await;
    let report = client.engine().drain().await.unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(client.pending_count().await, 0);
    assert_eq!(client.engine().state(), EngineState::Idle);

    let mice = client.mice().await;
    assert_eq!(mice.len(), 1);
    assert!(mice[0].is_confirmed());
    assert_eq!(api.mice().len(), 1);
    assert_eq!(api.mice()[0].name, "Offline Mouse");

    let applied = drain_events(&mut events)
        .into_iter()
        .find_map(|e| match e {
            SyncEvent::Applied { kind: OperationKind::Add, id, previous_id, .. } => Some((id, previous_id)),
            _ => None,
        })
        .expect("ADD was not reported");
    assert_eq!(applied.0, mice[0].id);
    assert_eq!(applied.1, Some(local.id.clone()));
    // The temp id still resolves for callers holding it.
    assert_eq!(client.mouse(&local.id).await.unwrap().id, mice[0].id);
}

#[tokio::test]
async fn offline_updates_coalesce_into_one_request() {
    let api = FakeApi::new();
    let id = api.seed("Viper V3 Pro", 159.99);
    let client = open_client(api.clone(), Arc::new(MemoryStorage::new())).await;
    go_online(&client, &api).await;
    client.refresh().await.unwrap();
    go_offline(&client, &api).await;

    client.update_mouse(&server(id), MousePatch::price(20.0)).await.unwrap();
    client.update_mouse(&server(id), MousePatch::name("Viper")).await.unwrap();
    let local = client.update_mouse(&server(id), MousePatch::price(25.0)).await.unwrap();
    assert_eq!(local.price, 25.0);
    assert_eq!(client.pending_count().await, 1);

    go_online(&client, &api).await;
    client.engine().drain().await.unwrap();

    let patches: Vec<String> = api
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("PATCH"))
        .collect();
    assert_eq!(patches, vec![format!("PATCH /mice/{id}")]);
    let confirmed = &api.mice()[0];
    assert_eq!(confirmed.price, 25.0);
    assert_eq!(confirmed.name, "Viper");
}

#[tokio::test]
async fn deleting_an_unsynced_record_sends_nothing() {
    let api = FakeApi::new();
    let client = open_client(api.clone(), Arc::new(MemoryStorage::new())).await;
    go_offline(&client, &api).await;

    let local = client.add_mouse(NewMouse::new("Draft", 10.0)).await.unwrap();
    client.update_mouse(&local.id, MousePatch::price(12.0)).await.unwrap();
    client.delete_mouse(&local.id).await.unwrap();
    assert_eq!(client.pending_count().await, 0);
    assert!(client.mice().await.is_empty());

    go_online(&client, &api).await;
    client.engine().drain().await.unwrap();
    assert!(api.calls().is_empty());
    assert!(api.mice().is_empty());
}

#[tokio::test]
async fn follow_up_operations_use_the_confirmed_id() {
    let api = FakeApi::new();
    let client = open_client(api.clone(), Arc::new(MemoryStorage::new())).await;
    go_offline(&client, &api).await;

    let local = client.add_mouse(NewMouse::new("Draft", 10.0)).await.unwrap();
    client.update_mouse(&local.id, MousePatch::price(30.0)).await.unwrap();

    go_online(&client, &api).await;
    let report = client.engine().drain().await.unwrap();
    assert_eq!(report.applied, 2);

    let server_id = api.mice()[0].id;
    assert_eq!(
        api.calls(),
        vec!["POST /mice".to_string(), format!("PATCH /mice/{server_id}")]
    );
    assert_eq!(api.mice()[0].price, 30.0);
    assert_eq!(client.mice().await[0].price, 30.0);
    assert_eq!(client.mice().await[0].id, server(server_id));
}

/// Memory storage that parks the first write of a queue whose UPDATEs all
/// carry server ids, which is the rewrite done when an ADD is confirmed.
struct GatedStorage {
    inner: MemoryStorage,
    armed: AtomicBool,
    paused: tokio::sync::watch::Sender<bool>,
    release: tokio::sync::Notify,
}

impl GatedStorage {
    fn new() -> Self {
        Self {
            inner: MemoryStorage::new(),
            armed: AtomicBool::new(false),
            paused: tokio::sync::watch::channel(false).0,
            release: tokio::sync::Notify::new(),
        }
    }

    async fn wait_until_paused(&self) {
        self.paused.subscribe().wait_for(|p| *p).await.unwrap();
    }
}

#[async_trait]
impl LocalStorage for GatedStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let remapped =
            key == "pendingOperations" && value.contains("UPDATE") && !value.contains("temp_");
        if remapped && self.armed.swap(false, Ordering::SeqCst) {
            self.paused.send_replace(true);
            self.release.notified().await;
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}

/// An offline ADD with a queued UPDATE, about to be synced with the gate armed.
async fn add_awaiting_confirmation() -> (Arc<FakeApi>, Arc<GatedStorage>, OfflineClient, EntityId) {
    let api = FakeApi::new();
    let storage = Arc::new(GatedStorage::new());
    let client = OfflineClient::open(
        api.clone(),
        storage.clone(),
        Duration::from_millis(50),
        Duration::from_millis(50),
    )
    .await
    .unwrap();
    go_offline(&client, &api).await;

    let local = client.add_mouse(NewMouse::new("Draft", 10.0)).await.unwrap();
    client.update_mouse(&local.id, MousePatch::price(12.0)).await.unwrap();

    go_online(&client, &api).await;
    storage.armed.store(true, Ordering::SeqCst);
    (api, storage, client, local.id)
}

fn terminal_failures(events: Vec<SyncEvent>) -> Vec<OperationKind> {
    events
        .into_iter()
        .filter_map(|e| match e {
            SyncEvent::TerminalFailure { operation, .. } => Some(operation.kind()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn edits_made_while_an_add_is_confirmed_reach_the_server() {
    let (api, storage, client, temp_id) = add_awaiting_confirmation().await;
    let mut events = client.subscribe();

    let edit = async {
        storage.wait_until_paused().await;
        client.update_mouse(&temp_id, MousePatch::name("Edited")).await
    };
    let release = async {
        storage.wait_until_paused().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        storage.release.notify_one();
    };
    let (report, edited, ()) = tokio::join!(client.engine().drain(), edit, release);
    report.unwrap();
    edited.unwrap();
    client.engine().drain().await.unwrap();

    assert!(terminal_failures(drain_events(&mut events)).is_empty());
    assert_eq!(client.pending_count().await, 0);
    let remote = api.mice();
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].name, "Edited");
    assert_eq!(remote[0].price, 12.0);

    let local = client.mice().await;
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].id, server(remote[0].id));
    assert_eq!(local[0].name, "Edited");
}

#[tokio::test]
async fn deletes_made_while_an_add_is_confirmed_reach_the_server() {
    let (api, storage, client, temp_id) = add_awaiting_confirmation().await;
    let mut events = client.subscribe();

    let delete = async {
        storage.wait_until_paused().await;
        client.delete_mouse(&temp_id).await
    };
    let release = async {
        storage.wait_until_paused().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        storage.release.notify_one();
    };
    let (report, deleted, ()) = tokio::join!(client.engine().drain(), delete, release);
    report.unwrap();
    deleted.unwrap();
    client.engine().drain().await.unwrap();

    assert!(terminal_failures(drain_events(&mut events)).is_empty());
    assert_eq!(client.pending_count().await, 0);
    assert!(api.mice().is_empty());
    assert!(client.mice().await.is_empty());
}

#[tokio::test]
async fn transient_failure_defers_and_stops_the_pass() {
    let api = FakeApi::new();
    let client = open_client(api.clone(), Arc::new(MemoryStorage::new())).await;
    go_online(&client, &api).await;
    api.fail_next(1);
    let mut events = client.subscribe();

    client.add_mouse(NewMouse::new("First", 10.0)).await.unwrap();
    client.add_mouse(NewMouse::new("Second", 11.0)).await.unwrap();

    let report = client.engine().drain().await.unwrap();
    assert_eq!(report.deferred, 1);
    assert_eq!(report.applied, 0);
    assert_eq!(api.calls().len(), 1);
    assert_eq!(client.engine().state(), EngineState::BackoffWait);

    let pending = client.pending_operations().await;
    assert_eq!(pending.len(), 2);
    // The failed op moved behind the other one.
    assert_eq!(pending[1].retry_count, 1);
    assert!(drain_events(&mut events)
        .iter()
        .any(|e| matches!(e, SyncEvent::Deferred { retry_count: 1, .. })));

    let report = client.engine().drain().await.unwrap();
    assert_eq!(report.applied, 2);
    let mut names: Vec<String> = api.mice().into_iter().map(|m| m.name).collect();
    names.sort();
    assert_eq!(names, vec!["First", "Second"]);
}

#[tokio::test]
async fn operations_are_dropped_after_the_retry_ceiling() {
    let api = FakeApi::new();
    let client = open_client(api.clone(), Arc::new(MemoryStorage::new())).await;
    go_online(&client, &api).await;
    api.fail_next(100);
    let mut events = client.subscribe();

    let local = client.add_mouse(NewMouse::new("Doomed", 10.0)).await.unwrap();
    client.update_mouse(&local.id, MousePatch::price(12.0)).await.unwrap();

    for _ in 0..5 {
        client.engine().drain().await.unwrap();
    }

    assert_eq!(api.calls().len(), MAX_RETRIES as usize);
    assert_eq!(client.pending_count().await, 0);
    assert!(client.mice().await.is_empty());

    let failures: Vec<SyncEvent> = drain_events(&mut events)
        .into_iter()
        .filter(|e| matches!(e, SyncEvent::TerminalFailure { .. }))
        .collect();
    // The ADD and the UPDATE that depended on it.
    assert_eq!(failures.len(), 2);
}

#[tokio::test]
async fn permanent_failures_are_dropped_without_blocking_later_work() {
    let api = FakeApi::new();
    let gone = api.seed("Gone", 50.0);
    let client = open_client(api.clone(), Arc::new(MemoryStorage::new())).await;
    go_online(&client, &api).await;
    client.refresh().await.unwrap();
    go_offline(&client, &api).await;

    client.update_mouse(&server(gone), MousePatch::price(55.0)).await.unwrap();
    client.add_mouse(NewMouse::new("Fresh", 20.0)).await.unwrap();
    // Someone else removed the record meanwhile.
    api.remove(gone);

    go_online(&client, &api).await;
    let report = client.engine().drain().await.unwrap();
    assert_eq!(report.dropped, 1);
    assert_eq!(report.applied, 1);
    assert_eq!(client.pending_count().await, 0);

    let names: Vec<String> = client.mice().await.into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["Fresh"]);
}

#[tokio::test]
async fn invalid_changes_are_refused_locally() {
    let api = FakeApi::new();
    let client = open_client(api.clone(), Arc::new(MemoryStorage::new())).await;

    let err = client.add_mouse(NewMouse::new("", -1.0)).await.unwrap_err();
    match err {
        ClientError::Domain(e) => assert_eq!(e.messages().len(), 2),
        other => panic!("expected validation failure, got {other:?}"),
    }

    let missing = server(MouseId::new(404));
    assert!(matches!(
        client.update_mouse(&missing, MousePatch::price(1.0)).await,
        Err(ClientError::NotFound(_))
    ));
    assert!(matches!(
        client.delete_mouse(&missing).await,
        Err(ClientError::NotFound(_))
    ));
    assert_eq!(client.pending_count().await, 0);
}

#[tokio::test]
async fn drain_passes_never_overlap() {
    let api = FakeApi::with_latency(Duration::from_millis(30));
    let client = Arc::new(open_client(api.clone(), Arc::new(MemoryStorage::new())).await);
    go_online(&client, &api).await;
    for n in 0..4 {
        client
            .add_mouse(NewMouse::new(format!("Mouse {n}"), 10.0 + f64::from(n)))
            .await
            .unwrap();
    }

    let a = tokio::spawn({
        let client = client.clone();
        async move { client.engine().drain().await.unwrap() }
    });
    tokio::time::sleep(Duration::from_millis(5)).await;
    let b = client.engine().drain().await.unwrap();
    let a = a.await.unwrap();

    assert!(b.skipped);
    assert_eq!(a.applied, 4);
    assert_eq!(api.max_in_flight(), 1);
}

#[tokio::test]
async fn queued_work_survives_a_restart() {
    let api = FakeApi::new();
    let storage = Arc::new(MemoryStorage::new());
    let client = open_client(api.clone(), storage.clone()).await;
    go_offline(&client, &api).await;
    let local = client.add_mouse(NewMouse::new("Persisted", 33.0)).await.unwrap();
    drop(client);

    let client = open_client(api.clone(), storage.clone()).await;
    assert_eq!(client.pending_count().await, 1);
    assert_eq!(client.mouse(&local.id).await.unwrap().name, "Persisted");
    assert!(client.connectivity().is_offline_mode());

    go_online(&client, &api).await;
    client.engine().drain().await.unwrap();
    assert_eq!(api.mice().len(), 1);
    assert!(storage.get("pendingOperations").await.unwrap().unwrap().contains("[]"));
}

#[tokio::test]
async fn cart_lines_follow_confirmed_ids() {
    let api = FakeApi::new();
    let client = open_client(api.clone(), Arc::new(MemoryStorage::new())).await;
    go_offline(&client, &api).await;

    let local = client.add_mouse(NewMouse::new("Draft", 10.0)).await.unwrap();
    client.add_to_cart(&local.id).await.unwrap();
    let cart = client.add_to_cart(&local.id).await.unwrap();
    assert_eq!(cart.item_count(), 2);
    assert_eq!(cart.total(), 20.0);

    go_online(&client, &api).await;
    client.engine().drain().await.unwrap();

    let cart = client.cart().await;
    let server_id = api.mice()[0].id;
    assert_eq!(cart.lines()[0].id, server(server_id));

    // Old temp ids keep working for cart edits.
    let cart = client.set_cart_quantity(&local.id, 5).await.unwrap();
    assert_eq!(cart.item_count(), 5);
    assert!(client.remove_from_cart(&local.id).await.is_empty());
}

#[tokio::test]
async fn background_engine_drains_when_connectivity_returns() {
    let api = FakeApi::new();
    let client = open_client(api.clone(), Arc::new(MemoryStorage::new())).await;
    go_offline(&client, &api).await;
    client.add_mouse(NewMouse::new("Queued", 10.0)).await.unwrap();

    let handle = client.start(None);
    api.set_up(true);

    let mut synced = false;
    for _ in 0..100 {
        if client.pending_count().await == 0 {
            synced = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    handle.shutdown().await;

    assert!(synced, "queue was not drained after reconnect");
    assert_eq!(api.mice().len(), 1);
}

#[derive(Debug, Clone)]
enum Action {
    Add(u8, u16),
    Reprice(usize, u16),
    Rename(usize, u8),
    Delete(usize),
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (any::<u8>(), 1u16..20_000).prop_map(|(n, p)| Action::Add(n, p)),
        (any::<usize>(), 1u16..20_000).prop_map(|(i, p)| Action::Reprice(i, p)),
        (any::<usize>(), any::<u8>()).prop_map(|(i, n)| Action::Rename(i, n)),
        any::<usize>().prop_map(Action::Delete),
    ]
}

fn catalog(mice: &[Mouse]) -> Vec<(String, u64)> {
    let mut rows: Vec<(String, u64)> = mice
        .iter()
        .map(|m| (m.name.clone(), (m.price * 100.0).round() as u64))
        .collect();
    rows.sort();
    rows
}

async fn replay_matches_direct(actions: Vec<Action>) {
    let synced = FakeApi::new();
    let direct = FakeApi::new();
    for api in [&synced, &direct] {
        api.seed("Seed A", 10.0);
        api.seed("Seed B", 20.0);
    }

    let client = open_client(synced.clone(), Arc::new(MemoryStorage::new())).await;
    go_online(&client, &synced).await;
    client.refresh().await.unwrap();
    go_offline(&client, &synced).await;

    // (client-side id, id on the directly-driven server)
    let mut entries: Vec<(EntityId, MouseId)> = vec![
        (server(MouseId::new(1)), MouseId::new(1)),
        (server(MouseId::new(2)), MouseId::new(2)),
    ];

    for action in actions {
        match action {
            Action::Add(n, cents) => {
                let new = NewMouse::new(format!("Mouse {n}"), f64::from(cents) / 100.0);
                let local = client.add_mouse(new.clone()).await.unwrap();
                let remote = direct.create_mouse(&new).await.unwrap();
                entries.push((local.id, remote.id));
            }
            Action::Reprice(i, cents) if !entries.is_empty() => {
                let (local, remote) = entries[i % entries.len()].clone();
                let patch = MousePatch::price(f64::from(cents) / 100.0);
                client.update_mouse(&local, patch.clone()).await.unwrap();
                direct.update_mouse(remote, &patch).await.unwrap();
            }
            Action::Rename(i, n) if !entries.is_empty() => {
                let (local, remote) = entries[i % entries.len()].clone();
                let patch = MousePatch::name(format!("Renamed {n}"));
                client.update_mouse(&local, patch.clone()).await.unwrap();
                direct.update_mouse(remote, &patch).await.unwrap();
            }
            Action::Delete(i) if !entries.is_empty() => {
                let (local, remote) = entries.remove(i % entries.len());
                client.delete_mouse(&local).await.unwrap();
                direct.delete_mouse(remote).await.unwrap();
            }
            _ => {}
        }
    }

    go_online(&client, &synced).await;
    client.engine().drain().await.unwrap();
    assert_eq!(client.pending_count().await, 0);

    let expected = catalog(&direct.mice());
    assert_eq!(catalog(&synced.mice()), expected);

    let local: Vec<Mouse> = client
        .mice()
        .await
        .into_iter()
        .map(|m| {
            let id = m.id.server_id().expect("unconfirmed record after drain");
            Mouse {
                id,
                name: m.name,
                price: m.price,
                details: m.details,
                image: m.image,
                is_generated: m.is_generated,
                category_ids: m.category_ids,
            }
        })
        .collect();
    assert_eq!(catalog(&local), expected);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn offline_replay_matches_direct_application(actions in prop::collection::vec(action(), 1..24)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(replay_matches_direct(actions));
    }
}
