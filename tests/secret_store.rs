//! Secret store persistence and fail-closed behavior.

use std::fs;
use std::os::unix::fs::PermissionsExt;

use prism_sidecar::secrets::{MachineIdentity, SecretError, SecretStore};

mod common;

#[test]
fn test_round_trip_values() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::test_store(dir.path());

    let values: [&[u8]; 4] = [
        b"",
        b"123456:ABC-telegram",
        "héllo ✓".as_bytes(),
        &[0u8, 255, 7, 0],
    ];
    for (i, value) in values.iter().enumerate() {
        let name = format!("secret_{}", i);
        store.save(&name, value).unwrap();
        assert_eq!(store.load(&name).unwrap(), *value);
    }

    let large = vec![0xABu8; 64 * 1024];
    store.save("large", &large).unwrap();
    assert_eq!(store.load("large").unwrap(), large);
}

#[test]
fn test_reopened_store_reads_existing_secret() {
    let dir = tempfile::tempdir().unwrap();
    common::test_store(dir.path()).save("bot_token", "abc").unwrap();

    let reopened = common::test_store(dir.path());
    assert_eq!(reopened.load_string("bot_token").unwrap(), "abc");
}

#[test]
fn test_flipped_last_byte_fails_authentication() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::test_store(dir.path());
    store.save("bot_token", "secret-value").unwrap();

    let path = store.dir().join("bot_token.enc");
    let mut blob = hex::decode(fs::read_to_string(&path).unwrap()).unwrap();
    let last = blob.len() - 1;
    blob[last] ^= 0x01;
    fs::write(&path, hex::encode(blob)).unwrap();

    assert!(matches!(
        store.load("bot_token"),
        Err(SecretError::AuthenticationFailed(_))
    ));
}

#[test]
fn test_truncated_ciphertext_fails_authentication() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::test_store(dir.path());
    store.save("bot_token", "secret-value").unwrap();

    let path = store.dir().join("bot_token.enc");
    let blob = hex::decode(fs::read_to_string(&path).unwrap()).unwrap();
    fs::write(&path, hex::encode(&blob[..30])).unwrap();

    assert!(matches!(
        store.load("bot_token"),
        Err(SecretError::AuthenticationFailed(_))
    ));
}

#[test]
fn test_short_blob_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::test_store(dir.path());
    fs::write(store.dir().join("short.enc"), hex::encode([1u8; 10])).unwrap();

    assert!(matches!(
        store.load("short"),
        Err(SecretError::Corrupt { .. })
    ));
}

#[test]
fn test_non_hex_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::test_store(dir.path());
    fs::write(store.dir().join("garbage.enc"), "not hex at all").unwrap();

    assert!(matches!(
        store.load("garbage"),
        Err(SecretError::Corrupt { .. })
    ));
}

#[test]
fn test_other_machine_cannot_decrypt() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::test_store(dir.path());
    store.save("bot_token", "only-here").unwrap();

    let elsewhere = MachineIdentity::new("another-host", "linux", "x86_64");
    let foreign = SecretStore::with_identity(store.dir(), &elsewhere).unwrap();

    assert!(matches!(
        foreign.load("bot_token"),
        Err(SecretError::AuthenticationFailed(_))
    ));
}

#[test]
fn test_missing_secret_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::test_store(dir.path());

    assert!(matches!(store.load("absent"), Err(SecretError::NotFound(_))));
    assert!(!store.exists("absent").unwrap());
    assert!(matches!(store.delete("absent"), Err(SecretError::NotFound(_))));
}

#[test]
fn test_delete_and_exists() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::test_store(dir.path());

    store.save("api_key", "k").unwrap();
    assert!(store.exists("api_key").unwrap());
    store.delete("api_key").unwrap();
    assert!(!store.exists("api_key").unwrap());
}

#[test]
fn test_invalid_names_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::test_store(dir.path());

    for name in ["", "../escape", "a/b", "name.enc"] {
        assert!(
            matches!(store.save(name, "v"), Err(SecretError::InvalidName(_))),
            "name {name:?} accepted"
        );
    }
}

#[test]
fn test_owner_only_permissions() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::test_store(dir.path());
    store.save("bot_token", "v").unwrap();

    let dir_mode = fs::metadata(store.dir()).unwrap().permissions().mode() & 0o777;
    assert_eq!(dir_mode, 0o700);

    let file_mode = fs::metadata(store.dir().join("bot_token.enc"))
        .unwrap()
        .permissions()
        .mode()
        & 0o777;
    assert_eq!(file_mode, 0o600);
}

#[test]
fn test_no_temp_files_left_behind() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::test_store(dir.path());
    for i in 0..5 {
        store.save("rotating", format!("value-{}", i)).unwrap();
    }

    let entries: Vec<_> = fs::read_dir(store.dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries, vec!["rotating.enc".to_string()]);
    assert_eq!(store.load_string("rotating").unwrap(), "value-4");
}

#[test]
fn test_independent_stores_do_not_interfere() {
    let dir = tempfile::tempdir().unwrap();
    let a = SecretStore::with_identity(
        dir.path().join("a"),
        &MachineIdentity::new("host-a", "linux", "x86_64"),
    )
    .unwrap();
    let b = SecretStore::with_identity(
        dir.path().join("b"),
        &MachineIdentity::new("host-b", "linux", "x86_64"),
    )
    .unwrap();

    a.save("token", "from-a").unwrap();
    b.save("token", "from-b").unwrap();
    assert_eq!(a.load_string("token").unwrap(), "from-a");
    assert_eq!(b.load_string("token").unwrap(), "from-b");
}

#[test]
fn test_socket_path_inside_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::test_store(dir.path());
    assert_eq!(store.socket_path(), store.dir().join("engine.sock"));
    assert_eq!(store.bin_dir(), store.dir().join("bin"));
}

#[test]
fn test_unusable_directory_is_storage_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let occupied = dir.path().join("store");
    fs::write(&occupied, b"not a directory").unwrap();

    let identity = MachineIdentity::new("test-host", "linux", "x86_64");
    match SecretStore::with_identity(&occupied, &identity) {
        Err(SecretError::StorageUnavailable { path, .. }) => assert_eq!(path, occupied),
        other => panic!("expected StorageUnavailable, got {other:?}"),
    }
}

#[test]
fn test_save_into_removed_directory_is_write_failed() {
    let dir = tempfile::tempdir().unwrap();
    let store = common::test_store(dir.path());
    fs::remove_dir_all(store.dir()).unwrap();

    match store.save("bot_token", "v") {
        Err(SecretError::WriteFailed { name, .. }) => assert_eq!(name, "bot_token"),
        other => panic!("expected WriteFailed, got {other:?}"),
    }
}
