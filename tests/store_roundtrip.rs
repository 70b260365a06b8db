//! Integration tests for the group store on the host filesystem.
//! Covers subgroup resolution, optimistic concurrency and crash-safe persistence.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tempfile::TempDir;

use groupconf_core::{Description, ETag, GroupError, GroupStore, Password, Role, StoreOptions};

fn open(dir: &TempDir) -> GroupStore {
    GroupStore::open(StoreOptions::new(dir.path())).unwrap()
}

fn write_group(dir: &TempDir, name: &str, json: &str) {
    let path = dir.path().join(format!("{name}.json"));
    fs_err::create_dir_all(path.parent().unwrap()).unwrap();
    fs_err::write(path, json).unwrap();
}

fn titled(title: &str) -> Description {
    let mut desc = Description::default();
    desc.display_name = title.to_string();
    desc
}

fn json_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs_err::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn subgroup_inheritance_follows_auto_subgroups() {
    let dir = TempDir::new().unwrap();
    write_group(
        &dir,
        "group",
        r#"{"displayName":"Group","description":"Main room","public":true,"auto-subgroups":true,"max-clients":12}"#,
    );
    write_group(&dir, "closed", r#"{"displayName":"Closed"}"#);
    let store = open(&dir);

    let sub = store.get_description("group/subgroup").unwrap();
    assert!(sub.is_subgroup());
    assert!(!sub.public);
    assert!(sub.description.is_empty());
    assert_eq!(sub.display_name, "Group");
    assert_eq!(sub.max_clients(), Some(12));

    assert!(store.get_description("closed/subgroup").unwrap_err().is_not_found());
    assert!(store.get_description("nowhere").unwrap_err().is_not_found());
}

#[test]
fn create_update_delete_cycle() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    let created = store
        .update_description("school/maths", &ETag::none(), &titled("Maths"))
        .unwrap();
    assert!(dir.path().join("school").join("maths.json").is_file());
    assert_eq!(store.get_description_tag("school/maths").unwrap(), created);

    let err = store
        .update_description("school/maths", &ETag::none(), &titled("Maths again"))
        .unwrap_err();
    assert!(err.is_conflict());

    // A longer title changes the size, so the tag differs even within one mtime tick.
    let updated = store
        .update_description("school/maths", &created, &titled("Mathematics"))
        .unwrap();
    assert_ne!(created, updated);
    assert!(
        store
            .update_description("school/maths", &created, &titled("Stale"))
            .unwrap_err()
            .is_conflict()
    );

    store.delete_description("school/maths", &updated).unwrap();
    assert!(store.get_description("school/maths").unwrap_err().is_not_found());
    assert!(json_files(&dir.path().join("school")).is_empty());
}

#[test]
fn sanitised_update_preserves_secrets_verbatim() {
    let dir = TempDir::new().unwrap();
    write_group(
        &dir,
        "maths",
        r#"{
            "displayName": "Maths",
            "users": {
                "tutor": {"password": {"type": "pbkdf2", "hash": "sha-256", "key": "ab12", "salt": "cd34", "iterations": 4096}, "permissions": "op"},
                "pupil": {"password": "sum", "permissions": ["present", "message"]}
            },
            "fallback-users": [{"password": {"type": "wildcard"}, "permissions": "observe"}],
            "authKeys": [{"kty": "EC", "crv": "P-256", "x": "abc", "y": "def", "alg": "ES256"}]
        }"#,
    );
    let store = open(&dir);
    let before = store.get_description("maths").unwrap();

    let (mut public, tag) = store.get_sanitised_description("maths").unwrap();
    assert!(public.users.is_empty() && public.auth_keys.is_empty());
    public.display_name = "Algebra".to_string();
    public.allow_recording = true;
    store.update_description("maths", &tag, &public).unwrap();

    let after = store.get_description("maths").unwrap();
    assert_eq!(after.display_name, "Algebra");
    assert!(after.allow_recording);
    assert_eq!(
        serde_json::to_value(&after.users).unwrap(),
        serde_json::to_value(&before.users).unwrap()
    );
    assert_eq!(after.fallback_users, before.fallback_users);
    assert_eq!(after.auth_keys, before.auth_keys);
    assert!(matches!(
        after.users["tutor"].password,
        Some(Password::Hashed(ref hashed)) if hashed.iterations == Some(4096)
    ));
}

#[test]
fn legacy_file_is_upgraded_on_load_and_on_rewrite() {
    let dir = TempDir::new().unwrap();
    write_group(
        &dir,
        "legacy",
        r#"{
            "op": [{"username": "jch", "password": "topsecret"}],
            "presenter": [{"username": "john", "password": "secret"}],
            "other": [{}],
            "allow-subgroups": true,
            "allow-anonymous": true
        }"#,
    );
    let store = open(&dir);

    let desc = store.get_description("legacy").unwrap();
    assert!(desc.auto_subgroups);
    assert_eq!(
        desc.users["jch"].permissions,
        groupconf_core::Permissions::Named(Role::Op)
    );
    assert_eq!(desc.fallback_users[0].password, Some(Password::Wildcard));

    let (public, tag) = store.get_sanitised_description("legacy").unwrap();
    store.update_description("legacy", &tag, &public).unwrap();

    let raw = fs_err::read_to_string(dir.path().join("legacy.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    for obsolete in ["op", "presenter", "other", "allow-subgroups", "allow-anonymous"] {
        assert!(value.get(obsolete).is_none(), "{obsolete} survived the rewrite");
    }
    assert_eq!(value["auto-subgroups"], true);
    assert_eq!(value["users"]["john"]["permissions"], "present");
}

#[test]
fn malformed_file_is_reported_not_served() {
    let dir = TempDir::new().unwrap();
    write_group(&dir, "typo", r#"{"displayname":"lowercase n"}"#);
    let store = open(&dir);
    let err = store.get_description("typo").unwrap_err();
    assert!(matches!(err, GroupError::MalformedConfig { .. }));
    assert!(err.to_string().contains("typo.json"));
}

#[test]
fn external_edit_is_picked_up() {
    let dir = TempDir::new().unwrap();
    write_group(&dir, "lobby", r#"{"displayName":"Lobby"}"#);
    let store = open(&dir);
    assert_eq!(store.get_description("lobby").unwrap().display_name, "Lobby");

    write_group(&dir, "lobby", r#"{"displayName":"Entrance hall"}"#);
    assert_eq!(
        store.get_description("lobby").unwrap().display_name,
        "Entrance hall"
    );
}

#[test]
fn concurrent_creates_admit_exactly_one() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let created = AtomicUsize::new(0);
    let conflicts = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for i in 0..8 {
            let (store, created, conflicts) = (&store, &created, &conflicts);
            scope.spawn(move || {
                match store.update_description("race", &ETag::none(), &titled(&format!("T{i}"))) {
                    Ok(_) => created.fetch_add(1, Ordering::SeqCst),
                    Err(err) if err.is_conflict() => conflicts.fetch_add(1, Ordering::SeqCst),
                    Err(err) => panic!("unexpected error: {err}"),
                };
            });
        }
    });

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(conflicts.load(Ordering::SeqCst), 7);
    assert_eq!(json_files(dir.path()), ["race.json"]);
}

#[test]
fn readers_never_observe_partial_files() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store
        .update_description("busy", &ETag::none(), &titled("v"))
        .unwrap();

    let done = AtomicBool::new(false);
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    let desc = store.get_description("busy").unwrap();
                    assert!(desc.display_name.starts_with('v'));
                }
            });
        }

        for round in 1..=40 {
            let tag = store.get_description_tag("busy").unwrap();
            let title = format!("v{}", "x".repeat(round));
            store.update_description("busy", &tag, &titled(&title)).unwrap();
        }
        done.store(true, Ordering::Release);
    });

    assert_eq!(
        store.get_description("busy").unwrap().display_name,
        format!("v{}", "x".repeat(40))
    );
    assert_eq!(json_files(dir.path()), ["busy.json"]);
}

#[test]
fn randomized_descriptions_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = GroupStore::open(
        StoreOptions::builder()
            .root(dir.path())
            .pretty(false)
            .build(),
    )
    .unwrap();
    let mut rng = fastrand::Rng::with_seed(0x6772_6f75_70);
    let word = |rng: &mut fastrand::Rng| -> String {
        let len = rng.usize(0..12);
        std::iter::repeat_with(|| rng.alphanumeric()).take(len).collect()
    };

    let mut tag = ETag::none();
    for round in 0..25 {
        let mut expected = Description::default();
        expected.display_name = word(&mut rng);
        expected.description = word(&mut rng);
        expected.contact = word(&mut rng);
        expected.public = rng.bool();
        if rng.u8(..) < 32 {
            expected.redirect = word(&mut rng);
        }
        expected.max_clients = rng.u32(..100);
        expected.max_history_age = rng.u64(..100_000);
        expected.allow_recording = rng.bool();
        expected.unrestricted_tokens = rng.bool();
        expected.auto_subgroups = rng.bool();
        expected.autolock = rng.bool();
        expected.autokick = rng.bool();
        expected.codecs = (0..rng.usize(..3)).map(|_| word(&mut rng)).collect();
        expected.comment = word(&mut rng);

        tag = store.update_description("random", &tag, &expected).unwrap();
        let stored = store.get_description("random").unwrap();
        assert_eq!(
            serde_json::to_value(&*stored).unwrap(),
            serde_json::to_value(&expected).unwrap(),
            "round {round}"
        );
    }
}
