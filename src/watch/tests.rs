use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use super::debouncer::Debouncer;
use super::types::ChangeKind;
use super::{ChangeCallback, ChangeEvent, WatchError, WatchRegistry};
use crate::utils::path::normalize_path;

const WINDOW: Duration = Duration::from_millis(50);
const WAIT: Duration = Duration::from_secs(5);

fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().map(PathBuf::from).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn metadata_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
        notify::event::MetadataKind::WriteTime,
    ))
}

fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::File)
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn channel_callback() -> (ChangeCallback, mpsc::Receiver<ChangeEvent>) {
    let (tx, rx) = mpsc::channel();
    let callback: ChangeCallback = Arc::new(move |event| {
        let _ = tx.send(event);
    });
    (callback, rx)
}

fn root_dir(temp: &TempDir, name: &str) -> PathBuf {
    let dir = normalize_path(temp.path()).join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Wait for an event on `path`, skipping anything else.
fn recv_for(rx: &mpsc::Receiver<ChangeEvent>, path: &Path) -> Option<ChangeEvent> {
    let deadline = Instant::now() + WAIT;
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(left) {
            Ok(event) if event.path == path => return Some(event),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
    None
}

// ============================================================================
// debouncer
// ============================================================================

#[test]
fn test_debouncer_empty() {
    let debouncer = Debouncer::new(WINDOW);
    assert!(!debouncer.is_ready());
}

#[test]
fn test_event_routing_by_kind() {
    let mut debouncer = Debouncer::new(WINDOW);

    debouncer.add_event(&make_event(vec!["/tmp/a.java"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/b.conf"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/c.class"], remove_kind()));

    assert_eq!(debouncer.changes.len(), 3);
    assert_eq!(
        debouncer.changes[&PathBuf::from("/tmp/a.java")],
        ChangeKind::Created
    );
    assert_eq!(
        debouncer.changes[&PathBuf::from("/tmp/b.conf")],
        ChangeKind::Modified
    );
    assert_eq!(
        debouncer.changes[&PathBuf::from("/tmp/c.class")],
        ChangeKind::Removed
    );
}

#[test]
fn test_temp_and_metadata_ignored() {
    let mut debouncer = Debouncer::new(WINDOW);

    debouncer.add_event(&make_event(vec!["/tmp/.App.java.swp"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/App.java~"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/app.conf"], metadata_kind()));

    assert!(debouncer.changes.is_empty());
    assert!(debouncer.last_event.is_none());
}

#[test]
fn test_dedup_rules() {
    let mut debouncer = Debouncer::new(WINDOW);

    // create then modify: first wins
    debouncer.add_event(&make_event(vec!["/tmp/a.java"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.java"], modify_kind()));
    // removed then restored
    debouncer.add_event(&make_event(vec!["/tmp/b.conf"], remove_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/b.conf"], create_kind()));
    // modified then removed
    debouncer.add_event(&make_event(vec!["/tmp/c.conf"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/c.conf"], remove_kind()));
    // created then removed: gone
    debouncer.add_event(&make_event(vec!["/tmp/d.conf"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/d.conf"], remove_kind()));

    assert_eq!(debouncer.changes.len(), 3);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/a.java")], ChangeKind::Created);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/b.conf")], ChangeKind::Created);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/c.conf")], ChangeKind::Removed);
    assert!(!debouncer.order.contains(&PathBuf::from("/tmp/d.conf")));
}

#[test]
fn test_take_preserves_first_seen_order() {
    let mut debouncer = Debouncer::new(Duration::ZERO);

    for name in ["/tmp/c.conf", "/tmp/a.conf", "/tmp/b.conf", "/tmp/a.conf"] {
        debouncer.add_event(&make_event(vec![name], modify_kind()));
    }

    let taken = debouncer.take_if_ready().unwrap();
    let paths: Vec<_> = taken.iter().map(|(p, _)| p.to_str().unwrap()).collect();
    assert_eq!(paths, ["/tmp/c.conf", "/tmp/a.conf", "/tmp/b.conf"]);
    assert!(debouncer.take_if_ready().is_none());
}

#[test]
fn test_not_ready_within_window() {
    let mut debouncer = Debouncer::new(Duration::from_secs(60));
    debouncer.add_event(&make_event(vec!["/tmp/a.conf"], modify_kind()));

    assert!(!debouncer.is_ready());
    assert!(debouncer.take_if_ready().is_none());
    assert!(debouncer.sleep_duration() > Duration::from_secs(1));
}

// ============================================================================
// registry
// ============================================================================

#[test]
fn test_add_root_rejected_while_active() {
    let rt = runtime();
    let temp = TempDir::new().unwrap();
    let (callback, _rx) = channel_callback();

    let mut registry = WatchRegistry::new(WINDOW);
    registry.add_root(root_dir(&temp, "conf"), callback.clone()).unwrap();
    registry.start(rt.handle()).unwrap();

    assert!(matches!(
        registry.add_root(temp.path().join("other"), callback),
        Err(WatchError::AlreadyActive)
    ));
    assert!(matches!(registry.start(rt.handle()), Err(WatchError::AlreadyActive)));

    registry.stop();
    registry.stop();
    assert!(!registry.is_active());
}

#[test]
fn test_events_delivered_in_order_per_root() {
    let rt = runtime();
    let temp = TempDir::new().unwrap();
    let conf = root_dir(&temp, "conf");
    let (callback, rx) = channel_callback();

    let mut registry = WatchRegistry::new(WINDOW);
    registry.add_root(&conf, callback).unwrap();
    registry.start(rt.handle()).unwrap();
    std::thread::sleep(Duration::from_millis(100));

    let first = conf.join("first.conf");
    let second = conf.join("second.conf");
    std::fs::write(&first, "a = 1").unwrap();
    std::fs::write(&second, "b = 2").unwrap();

    let mut seen = Vec::new();
    let deadline = Instant::now() + WAIT;
    while seen.len() < 2 && Instant::now() < deadline {
        if let Ok(event) = rx.recv_timeout(Duration::from_millis(100))
            && !seen.contains(&event.path)
        {
            seen.push(event.path);
        }
    }

    assert_eq!(seen, [first, second]);
    registry.stop();
}

#[test]
fn test_roots_are_independent() {
    let rt = runtime();
    let temp = TempDir::new().unwrap();
    let conf = root_dir(&temp, "conf");
    let resources = root_dir(&temp, "resources");
    let (conf_cb, conf_rx) = channel_callback();
    let (res_cb, res_rx) = channel_callback();

    let mut registry = WatchRegistry::new(WINDOW);
    registry.add_root(&conf, conf_cb).unwrap();
    registry.add_root(&resources, res_cb).unwrap();
    registry.start(rt.handle()).unwrap();
    std::thread::sleep(Duration::from_millis(100));

    let file = resources.join("messages.properties");
    std::fs::write(&file, "hello=world").unwrap();

    assert!(recv_for(&res_rx, &file).is_some());
    assert!(conf_rx.recv_timeout(Duration::from_millis(300)).is_err());
    registry.stop();
}

#[test]
fn test_no_callback_after_stop() {
    let rt = runtime();
    let temp = TempDir::new().unwrap();
    let conf = root_dir(&temp, "conf");
    let (callback, rx) = channel_callback();

    let mut registry = WatchRegistry::new(WINDOW);
    registry.add_root(&conf, callback).unwrap();
    registry.start(rt.handle()).unwrap();
    std::thread::sleep(Duration::from_millis(100));
    registry.stop();

    std::fs::write(conf.join("late.conf"), "x").unwrap();
    assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
}

#[test]
fn test_missing_root_attached_when_it_appears() {
    let rt = runtime();
    let temp = TempDir::new().unwrap();
    let conf = normalize_path(temp.path()).join("conf");
    let (callback, rx) = channel_callback();

    let mut registry = WatchRegistry::new(WINDOW);
    registry.add_root(&conf, callback).unwrap();
    registry.start(rt.handle()).unwrap();

    std::fs::create_dir_all(&conf).unwrap();

    // Keep touching files until the late attach picks them up.
    let deadline = Instant::now() + WAIT;
    let mut delivered = false;
    for i in 0.. {
        if Instant::now() > deadline {
            break;
        }
        std::fs::write(conf.join(format!("probe{i}.conf")), "x").unwrap();
        if rx.recv_timeout(Duration::from_millis(300)).is_ok() {
            delivered = true;
            break;
        }
    }

    assert!(delivered);
    registry.stop();
}

#[test]
fn test_removed_root_stops_silently() {
    let rt = runtime();
    let temp = TempDir::new().unwrap();
    let gone = root_dir(&temp, "gone");
    let kept = root_dir(&temp, "kept");
    let (gone_cb, gone_rx) = channel_callback();
    let (kept_cb, kept_rx) = channel_callback();

    let mut registry = WatchRegistry::new(WINDOW);
    registry.add_root(&gone, gone_cb).unwrap();
    registry.add_root(&kept, kept_cb).unwrap();
    registry.start(rt.handle()).unwrap();
    std::thread::sleep(Duration::from_millis(100));

    std::fs::remove_dir_all(&gone).unwrap();
    std::thread::sleep(Duration::from_millis(600));

    // Recreating the directory does not revive the root.
    std::fs::create_dir_all(&gone).unwrap();
    std::fs::write(gone.join("app.conf"), "x").unwrap();

    let file = kept.join("app.conf");
    std::fs::write(&file, "y").unwrap();
    assert!(recv_for(&kept_rx, &file).is_some());

    assert!(gone_rx.recv_timeout(Duration::from_millis(300)).is_err());
    registry.stop();
}
