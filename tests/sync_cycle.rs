//! End-to-end exercises of the fetch → mutate → publish cycle over the
//! in-memory transport, through the public API only.

use gardensync::config::NoSettings;
use gardensync::progress::NullProgress;
use gardensync::remote::memory::{MemoryConnector, MemoryHost};
use gardensync::{PublishResult, RemoteEndpoint, SyncError, SyncSession};

fn endpoint() -> RemoteEndpoint {
    RemoteEndpoint::from_login("alice@garden.local", "/srv/garden", "garden_sensors.db").unwrap()
}

fn connect(host: &MemoryHost) -> SyncSession {
    let connector = MemoryConnector::new(host.clone(), "secret");
    SyncSession::connect(
        &connector,
        endpoint(),
        &mut |_attempt: u32| "secret".to_string(),
        &mut NoSettings,
    )
    .unwrap()
}

#[test]
fn full_cycle_download_edit_publish() {
    let ep = endpoint();
    let host = MemoryHost::new();

    // A 10 MiB master, patterned so corruption would show.
    let master: Vec<u8> = (0..10 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    let total = master.len() as u64;
    host.insert(&ep.master_path(), master.clone());

    let mut session = connect(&host);

    // Download with monotonically increasing progress ending at the total.
    let mut updates: Vec<(u64, u64)> = Vec::new();
    let mut cache = session
        .fetch(&mut |t: u64, tot: u64| updates.push((t, tot)))
        .unwrap();

    assert!(!updates.is_empty());
    assert!(updates.windows(2).all(|w| w[0].0 < w[1].0));
    assert!(updates.iter().all(|&(_, tot)| tot == total));
    assert_eq!(updates.last(), Some(&(total, total)));
    assert_eq!(std::fs::read(cache.path()).unwrap(), master);
    assert!(!cache.is_dirty());

    // One committed local mutation.
    let mut edited = master;
    edited.extend_from_slice(b"one more sensor reading");
    std::fs::write(cache.path(), &edited).unwrap();
    cache.mark_changed();
    assert!(cache.is_dirty());

    let result = session.publish(&mut cache, &mut NullProgress);
    match result {
        PublishResult::Published { bytes } => assert_eq!(bytes, edited.len() as u64),
        other => panic!("expected Published, got {other:?}"),
    }

    // Remote now matches local byte for byte, the backup is gone, and the
    // cache is clean again.
    assert_eq!(host.bytes(&ep.master_path()).unwrap(), edited);
    assert!(!host.contains(&ep.backup_path()));
    assert!(!cache.is_dirty());

    let cache_path = cache.path().to_path_buf();
    session.cleanup(Some(cache));
    assert!(!cache_path.exists());
}

#[test]
fn bootstrap_creates_matching_master_and_leaves_no_backup() {
    let ep = endpoint();
    let host = MemoryHost::new();
    let mut session = connect(&host);

    let cache = session.fetch(&mut NullProgress).unwrap();

    let local = std::fs::read(cache.path()).unwrap();
    assert_eq!(host.bytes(&ep.master_path()).unwrap(), local);
    assert!(!host.contains(&ep.backup_path()));
    assert!(!cache.is_dirty());

    session.cleanup(Some(cache));
}

#[test]
fn clean_publish_is_a_noop_with_no_traffic() {
    let ep = endpoint();
    let host = MemoryHost::new();
    host.insert(&ep.master_path(), b"master".to_vec());
    let mut session = connect(&host);

    let mut cache = session.fetch(&mut NullProgress).unwrap();
    let operations_after_fetch = host.operation_count();

    let mut progress_calls = 0u32;
    let result = session.publish(&mut cache, &mut |_t: u64, _tot: u64| progress_calls += 1);

    assert!(matches!(result, PublishResult::NoOp));
    assert_eq!(host.operation_count(), operations_after_fetch);
    assert_eq!(progress_calls, 0);

    session.cleanup(Some(cache));
}

#[test]
fn failed_verification_restores_the_old_master_and_keeps_dirty() {
    let ep = endpoint();
    let host = MemoryHost::new();
    host.insert(&ep.master_path(), b"the old master".to_vec());
    let mut session = connect(&host);

    let mut cache = session.fetch(&mut NullProgress).unwrap();
    std::fs::write(cache.path(), b"the replacement bytes").unwrap();
    cache.mark_changed();

    host.truncate_uploads_to(Some(5));
    let result = session.publish(&mut cache, &mut NullProgress);

    assert!(matches!(result, PublishResult::Failed { .. }));
    assert_eq!(host.bytes(&ep.master_path()).unwrap(), b"the old master");
    assert!(!host.contains(&ep.backup_path()));
    assert!(cache.is_dirty());

    // A retry after the fault clears succeeds against the restored master.
    host.truncate_uploads_to(None);
    let retry = session.publish(&mut cache, &mut NullProgress);
    assert!(retry.is_success());
    assert_eq!(
        host.bytes(&ep.master_path()).unwrap(),
        b"the replacement bytes"
    );
    assert!(!cache.is_dirty());

    session.cleanup(Some(cache));
}

#[test]
fn three_wrong_passwords_never_reach_the_filesystem() {
    let host = MemoryHost::new();
    let connector = MemoryConnector::new(host.clone(), "secret");

    let mut prompts = 0u32;
    let err = SyncSession::connect(
        &connector,
        endpoint(),
        &mut |_attempt: u32| {
            prompts += 1;
            "wrong".to_string()
        },
        &mut NoSettings,
    )
    .unwrap_err();

    assert!(matches!(err, SyncError::Authentication { attempts: 3 }));
    assert_eq!(prompts, 3);
    assert_eq!(host.operation_count(), 0);
}
