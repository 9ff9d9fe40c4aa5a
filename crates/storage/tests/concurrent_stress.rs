//! Concurrent access stress tests for `Manager`.
//!
//! These tests run many readers and writers against one manager to detect
//! torn reads, lost appends and deadlocks. Every storage kind that can sit in
//! a registry is exercised, cached and uncached.

#![allow(clippy::expect_used, clippy::panic)]

mod common;

use std::{collections::HashMap, sync::Arc};

use common::{User, decoder, encoder, tagged};
use local_storage::{AnyStorage, Manager, MemoryBackend, PreferenceStore};
use tokio::task::JoinSet;

/// Number of concurrent tasks for most tests.
const CONCURRENCY: usize = 8;

/// Number of operations each task performs.
const OPS_PER_TASK: usize = 50;

/// Number of users written by every snapshot version.
const SNAPSHOT_LEN: usize = 10;

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

fn registries() -> Vec<(&'static str, Arc<Manager>)> {
    vec![
        ("memory", Arc::new(Manager::new([("users", AnyStorage::memory())]))),
        ("cached", Arc::new(Manager::new([("users", AnyStorage::memory().cached())]))),
        (
            "preferences",
            Arc::new(Manager::new([("users", AnyStorage::preferences(PreferenceStore::in_memory(), "users"))])),
        ),
    ]
}

fn snapshot(version: usize) -> Vec<User> {
    (0..SNAPSHOT_LEN).map(|i| User::new(format!("v{version:04}-{i:02}"))).collect()
}

fn version_of(user: &User) -> &str {
    user.name.split('-').next().expect("tagged name")
}

// ---------------------------------------------------------------------------
// Test: readers never observe a torn snapshot
// ---------------------------------------------------------------------------

/// One writer replaces the whole collection with successive versions while
/// `CONCURRENCY` readers decode it. Every read must see either the empty
/// initial state or exactly one complete version, in order.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_observe_torn_snapshots() {
    for (kind, manager) in registries() {
        let mut set = JoinSet::new();

        let writer = Arc::clone(&manager);
        set.spawn_blocking(move || {
            for version in 1..=OPS_PER_TASK {
                writer.replace_all("users", snapshot(version), &encoder()).expect("replace_all should succeed");
            }
        });

        for _ in 0..CONCURRENCY {
            let reader = Arc::clone(&manager);
            set.spawn_blocking(move || {
                for _ in 0..OPS_PER_TASK {
                    let users: Vec<User> = reader.all("users", &decoder()).expect("all should succeed");
                    if users.is_empty() {
                        continue;
                    }
                    let version = version_of(&users[0]).to_owned();
                    let expected: Vec<User> =
                        snapshot(version[1..].parse().expect("numeric version"));
                    assert_eq!(users, expected, "{kind}: torn read");
                }
            });
        }

        while let Some(result) = set.join_next().await {
            result.expect("task should not panic");
        }

        let last: Vec<User> = manager.all("users", &decoder()).expect("all should succeed");
        assert_eq!(last, snapshot(OPS_PER_TASK), "{kind}: final version");
    }
}

// ---------------------------------------------------------------------------
// Test: parallel appenders lose nothing
// ---------------------------------------------------------------------------

/// `CONCURRENCY` writers append tagged users. Afterwards every user is
/// present exactly once and each writer's users appear in its own order.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_appends_are_not_lost() {
    for (kind, manager) in registries() {
        let mut set = JoinSet::new();
        for task in 0..CONCURRENCY {
            let manager = Arc::clone(&manager);
            set.spawn_blocking(move || {
                for seq in 0..OPS_PER_TASK {
                    manager.append("users", tagged(task, seq), &encoder()).expect("append should succeed");
                }
            });
        }
        while let Some(result) = set.join_next().await {
            result.expect("task should not panic");
        }

        let users: Vec<User> = manager.all("users", &decoder()).expect("all should succeed");
        assert_eq!(users.len(), CONCURRENCY * OPS_PER_TASK, "{kind}: lost appends");
        assert_eq!(manager.count("users").expect("count"), users.len());

        let mut per_task: HashMap<usize, Vec<usize>> = HashMap::new();
        for user in &users {
            let (task, seq) = user.name.trim_start_matches("task").split_once('-').expect("tagged name");
            per_task.entry(task.parse().expect("task")).or_default().push(seq.parse().expect("seq"));
        }
        for (task, seqs) in per_task {
            assert_eq!(seqs, (0..OPS_PER_TASK).collect::<Vec<_>>(), "{kind}: task {task} out of order");
        }
    }
}

// ---------------------------------------------------------------------------
// Test: removals and appends interleave consistently
// ---------------------------------------------------------------------------

/// Writers append while removers take users out one at a time. Every user is
/// either removed exactly once or still stored.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_removals_take_each_user_once() {
    for (kind, manager) in registries() {
        let mut set = JoinSet::new();
        for task in 0..CONCURRENCY / 2 {
            let manager = Arc::clone(&manager);
            set.spawn_blocking(move || {
                for seq in 0..OPS_PER_TASK {
                    manager.append("users", tagged(task, seq), &encoder()).expect("append should succeed");
                }
                Vec::new()
            });
        }
        for _ in 0..CONCURRENCY / 2 {
            let manager = Arc::clone(&manager);
            set.spawn_blocking(move || {
                let mut removed = Vec::new();
                for _ in 0..OPS_PER_TASK {
                    if let Some(user) = manager.remove("users", &decoder(), |_: &User| true).expect("remove should succeed") {
                        removed.push(user);
                    }
                }
                removed
            });
        }

        let mut removed = Vec::new();
        while let Some(result) = set.join_next().await {
            removed.extend(result.expect("task should not panic"));
        }
        let remaining: Vec<User> = manager.all("users", &decoder()).expect("all should succeed");

        let mut seen: Vec<User> = removed.into_iter().chain(remaining).collect();
        seen.sort_by(|a, b| a.name.cmp(&b.name));
        let mut expected: Vec<User> =
            (0..CONCURRENCY / 2).flat_map(|task| (0..OPS_PER_TASK).map(move |seq| tagged(task, seq))).collect();
        expected.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(seen, expected, "{kind}: users duplicated or lost");
    }
}

// ---------------------------------------------------------------------------
// Test: the exclusive lock flavour holds up under the same load
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exclusive_manager_under_mixed_load() {
    let manager = Arc::new(Manager::exclusive([("users", MemoryBackend::new())]));
    let mut set = JoinSet::new();
    for task in 0..CONCURRENCY {
        let manager = Arc::clone(&manager);
        set.spawn_blocking(move || {
            for seq in 0..OPS_PER_TASK {
                if seq % 2 == 0 {
                    manager.append("users", tagged(task, seq), &encoder()).expect("append should succeed");
                } else {
                    let count = manager.count("users").expect("count should succeed");
                    assert!(count <= CONCURRENCY * OPS_PER_TASK);
                }
            }
        });
    }
    while let Some(result) = set.join_next().await {
        result.expect("task should not panic");
    }
    assert_eq!(manager.count("users").expect("count"), CONCURRENCY * OPS_PER_TASK / 2);
}
