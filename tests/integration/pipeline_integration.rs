use crate::support::{network, path_key, Call, RecordingNetwork, Workspace};
use cabinet::concurrency::ShutdownSignal;
use cabinet::error::CabinetError;
use cabinet::store::{HashStore, PartitionImage};
use cabinet::sync::DirectorySynchronizer;
use cabinet::types::{ContentHash, Handle, NodeId, StoreKey};
use cabinet::watch::{
    DirectoryWatcher, Outcome, PublishPipeline, SkipReason, WatchConfig, WatchEvent, WatchSignal,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

fn config(ws: &Workspace) -> WatchConfig {
    WatchConfig {
        root: ws.root.clone(),
        handle: Handle::new("jack"),
        store_path: ws.store_path.clone(),
        publish_key: None,
        recursive: false,
        poll_interval_ms: 10,
    }
}

fn pipeline(ws: &Workspace, net: &Arc<RecordingNetwork>) -> PublishPipeline {
    PublishPipeline::new(config(ws), ws.store(), network(net), NodeId::new("X"))
}

fn written(path: &Path) -> WatchSignal {
    WatchSignal::Event(WatchEvent::Written(path.to_path_buf()))
}

fn created(path: &Path) -> WatchSignal {
    WatchSignal::Event(WatchEvent::Created(path.to_path_buf()))
}

fn synced(ws: &Workspace, net: &Arc<RecordingNetwork>) {
    DirectorySynchronizer::new(ws.store(), network(net))
        .sync(&Handle::new("jack"), &ws.root)
        .unwrap();
    net.clear_calls();
}

fn published_image(net: &RecordingNetwork, digest: &ContentHash) -> PartitionImage {
    serde_json::from_slice(&net.blob(digest).unwrap()).unwrap()
}

#[derive(Clone, Default)]
struct RecordingDirectories {
    watched: Arc<Mutex<Vec<PathBuf>>>,
}

impl DirectoryWatcher for RecordingDirectories {
    fn watch_directory(&mut self, dir: &Path) -> Result<(), CabinetError> {
        self.watched.lock().push(dir.to_path_buf());
        Ok(())
    }
}

#[test]
fn unchanged_write_is_suppressed() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");
    let a = ws.write("a.txt", "alpha");
    synced(&ws, &net);

    let outcome = pipeline(&ws, &net).handle_signal(written(&a)).unwrap();

    let hash = RecordingNetwork::hash_of(b"alpha");
    assert_eq!(
        outcome,
        Outcome::Unchanged {
            path: a.clone(),
            hash: hash.clone()
        }
    );
    assert_eq!(net.calls(), vec![Call::Add(hash)]);
    assert_eq!(ws.store.get(&Handle::new("jack"), &StoreKey::STORE_DIGEST).unwrap(), None);
}

#[test]
fn changed_write_records_pins_and_publishes_in_order() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");
    let a = ws.write("a.txt", "hello");
    synced(&ws, &net);
    ws.write("a.txt", "hello!");

    let outcome = pipeline(&ws, &net).handle_signal(written(&a)).unwrap();

    let hash = RecordingNetwork::hash_of(b"hello!");
    let Outcome::Published {
        path,
        hash: recorded,
        digest,
    } = outcome
    else {
        panic!("expected a publish");
    };
    assert_eq!(path, a);
    assert_eq!(recorded, hash);
    assert_eq!(
        net.calls(),
        vec![
            Call::Add(hash.clone()),
            Call::Pin(hash.clone()),
            Call::Add(digest.clone()),
            Call::Publish {
                key: None,
                hash: digest.clone()
            },
            Call::Resolve(NodeId::new("X")),
        ]
    );

    let handle = Handle::new("jack");
    assert_eq!(
        ws.store.get(&handle, &path_key(&a)).unwrap(),
        Some(hash.to_string())
    );
    assert_eq!(
        ws.store.get(&handle, &StoreKey::STORE_DIGEST).unwrap(),
        Some(digest.to_string())
    );
}

#[test]
fn published_digest_covers_the_new_record() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");
    let a = ws.write("a.txt", "alpha");
    let b = ws.write("b.txt", "beta");
    synced(&ws, &net);
    ws.write("b.txt", "beta, revised");

    let Outcome::Published { digest, .. } =
        pipeline(&ws, &net).handle_signal(written(&b)).unwrap()
    else {
        panic!("expected a publish");
    };

    let image = published_image(&net, &digest);
    assert_eq!(
        image.paths[&a.display().to_string()],
        RecordingNetwork::hash_of(b"alpha").to_string()
    );
    assert_eq!(
        image.paths[&b.display().to_string()],
        RecordingNetwork::hash_of(b"beta, revised").to_string()
    );
    assert!(!image.reserved.contains_key("STORE_DIGEST"));
}

#[test]
fn repeated_write_publishes_once() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");
    let a = ws.write("a.txt", "alpha");
    synced(&ws, &net);
    ws.write("a.txt", "alpha, revised");
    let mut pipeline = pipeline(&ws, &net);

    let first = pipeline.handle_signal(written(&a)).unwrap();
    let second = pipeline.handle_signal(written(&a)).unwrap();

    assert!(matches!(first, Outcome::Published { .. }));
    assert!(matches!(second, Outcome::Unchanged { .. }));
    let publishes = net
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::Publish { .. }))
        .count();
    assert_eq!(publishes, 1);
}

#[test]
fn create_publishes_unconditionally() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");
    let a = ws.write("a.txt", "alpha");
    synced(&ws, &net);

    let outcome = pipeline(&ws, &net).handle_signal(created(&a)).unwrap();

    assert!(matches!(outcome, Outcome::Published { .. }));
    assert!(net
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Publish { .. })));
}

#[test]
fn new_file_is_recorded_on_create() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");
    let c = ws.write("c.txt", "gamma");

    pipeline(&ws, &net).handle_signal(created(&c)).unwrap();

    assert_eq!(
        ws.store.get(&Handle::new("jack"), &path_key(&c)).unwrap(),
        Some(RecordingNetwork::hash_of(b"gamma").to_string())
    );
}

#[test]
fn publish_key_is_passed_through() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");
    let a = ws.write("a.txt", "alpha");
    let config = WatchConfig {
        publish_key: Some("cabinet".to_string()),
        ..config(&ws)
    };
    let mut pipeline = PublishPipeline::new(config, ws.store(), network(&net), NodeId::new("X"));

    pipeline.handle_signal(created(&a)).unwrap();

    assert!(net.calls().iter().any(|c| matches!(
        c,
        Call::Publish { key: Some(k), .. } if k == "cabinet"
    )));
}

#[test]
fn store_paths_are_ignored_for_create_and_write() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");
    let inner = ws.store_path.join("conf");
    let mut pipeline = pipeline(&ws, &net);

    for signal in [
        written(&ws.store_path),
        written(&inner),
        created(&ws.store_path),
        created(&inner),
    ] {
        let outcome = pipeline.handle_signal(signal).unwrap();
        assert!(matches!(
            outcome,
            Outcome::Skipped {
                reason: SkipReason::StorePath,
                ..
            }
        ));
    }
    assert!(net.calls().is_empty());
}

#[test]
fn created_directory_is_skipped_and_watched() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");
    let dir = ws.root.join("sub");
    std::fs::create_dir(&dir).unwrap();
    let directories = RecordingDirectories::default();
    let mut pipeline = pipeline(&ws, &net).with_directory_watcher(Box::new(directories.clone()));

    let outcome = pipeline.handle_signal(created(&dir)).unwrap();

    assert_eq!(
        outcome,
        Outcome::Skipped {
            path: dir.clone(),
            reason: SkipReason::Directory
        }
    );
    assert_eq!(*directories.watched.lock(), vec![dir.clone()]);
    assert!(net.calls().is_empty());
    assert_eq!(ws.store.get(&Handle::new("jack"), &path_key(&dir)).unwrap(), None);
}

#[test]
fn written_directory_is_skipped() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");

    let outcome = pipeline(&ws, &net)
        .handle_signal(written(&ws.root))
        .unwrap();

    assert!(matches!(
        outcome,
        Outcome::Skipped {
            reason: SkipReason::Directory,
            ..
        }
    ));
}

#[test]
fn watcher_error_is_reported_not_fatal() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");

    let outcome = pipeline(&ws, &net)
        .handle_signal(WatchSignal::Error("inotify queue overflow".to_string()))
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::NotifyFailure("inotify queue overflow".to_string())
    );
    assert!(net.calls().is_empty());
}

#[test]
fn vanished_file_is_an_io_error() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");

    let result = pipeline(&ws, &net).handle_signal(written(&ws.root.join("gone.txt")));

    assert!(matches!(result, Err(CabinetError::Io { .. })));
}

#[test]
fn pin_failure_restores_previous_hash_and_skips_publish() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");
    let a = ws.write("a.txt", "alpha");
    synced(&ws, &net);
    ws.write("a.txt", "alpha, revised");
    net.fail_pins_after(0);

    let result = pipeline(&ws, &net).handle_signal(written(&a));

    assert!(matches!(result, Err(CabinetError::Network(_))));
    assert_eq!(
        ws.store.get(&Handle::new("jack"), &path_key(&a)).unwrap(),
        Some(RecordingNetwork::hash_of(b"alpha").to_string())
    );
    assert!(!net
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Publish { .. })));
}

#[test]
fn publish_failure_keeps_record_and_digest() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");
    let a = ws.write("a.txt", "alpha");
    net.fail_publish();

    let result = pipeline(&ws, &net).handle_signal(created(&a));

    assert!(matches!(result, Err(CabinetError::Network(_))));
    let handle = Handle::new("jack");
    assert!(ws.store.get(&handle, &path_key(&a)).unwrap().is_some());
    assert!(ws.store.get(&handle, &StoreKey::STORE_DIGEST).unwrap().is_some());
    assert!(!net.calls().iter().any(|c| matches!(c, Call::Resolve(_))));
}

#[test]
fn resolve_failure_does_not_fail_the_event() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");
    let a = ws.write("a.txt", "alpha");
    net.fail_resolve();

    let outcome = pipeline(&ws, &net).handle_signal(created(&a)).unwrap();

    assert!(matches!(outcome, Outcome::Published { .. }));
}

#[test]
fn run_drains_queue_until_sender_disconnects() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");
    let a = ws.write("a.txt", "alpha");
    synced(&ws, &net);
    ws.write("a.txt", "alpha, revised");

    let (tx, rx) = mpsc::channel();
    tx.send(written(&a)).unwrap();
    tx.send(written(&a)).unwrap();
    tx.send(written(&ws.root.join("gone.txt"))).unwrap();
    tx.send(WatchSignal::Error("overflow".to_string())).unwrap();
    drop(tx);

    let summary = pipeline(&ws, &net).run(&rx, &ShutdownSignal::new());

    assert_eq!(summary.published, 1);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.notify_errors, 1);
    assert_eq!(summary.processed(), 4);
}

#[test]
fn run_stops_once_cancelled() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");
    let a = ws.write("a.txt", "alpha");
    let (tx, rx) = mpsc::channel();
    tx.send(created(&a)).unwrap();
    let shutdown = ShutdownSignal::new();
    shutdown.cancel();

    let summary = pipeline(&ws, &net).run(&rx, &shutdown);

    assert_eq!(summary.processed(), 0);
    assert!(net.calls().is_empty());
    drop(tx);
}

#[test]
fn run_notices_cancellation_while_idle() {
    let ws = Workspace::new();
    let net = RecordingNetwork::new("X");
    let (tx, rx) = mpsc::channel::<WatchSignal>();
    let shutdown = ShutdownSignal::new();
    let mut pipeline = pipeline(&ws, &net);

    let loop_shutdown = shutdown.clone();
    let worker = std::thread::spawn(move || pipeline.run(&rx, &loop_shutdown));
    std::thread::sleep(std::time::Duration::from_millis(50));
    shutdown.cancel();

    let summary = worker.join().unwrap();
    assert_eq!(summary.processed(), 0);
    drop(tx);
}

#[test]
fn store_inside_root_is_ignored_for_create_and_write() {
    let ws = Workspace::with_store_in_root();
    let net = RecordingNetwork::new("X");
    let a = ws.write("a.txt", "hello");
    DirectorySynchronizer::new(ws.store(), network(&net))
        .excluding_store(&ws.store_path)
        .sync(&Handle::new("jack"), &ws.root)
        .unwrap();
    net.clear_calls();
    let mut pipeline = pipeline(&ws, &net);

    let mut store_files: Vec<PathBuf> = std::fs::read_dir(&ws.store_path)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    store_files.push(ws.store_path.clone());
    for path in &store_files {
        for signal in [created(path), written(path)] {
            let outcome = pipeline.handle_signal(signal).unwrap();
            assert!(matches!(
                outcome,
                Outcome::Skipped {
                    reason: SkipReason::StorePath,
                    ..
                }
            ));
        }
    }
    assert!(net.calls().is_empty());

    // A real file beside the store still publishes, and the digest image
    // carries no store internals.
    ws.write("a.txt", "hello!");
    let Outcome::Published { digest, .. } = pipeline.handle_signal(written(&a)).unwrap() else {
        panic!("expected a publish");
    };
    let image = published_image(&net, &digest);
    let store_prefix = ws.store_path.display().to_string();
    assert!(image.paths.keys().all(|k| !k.starts_with(&store_prefix)));
    assert_eq!(image.paths.len(), 1);
}
