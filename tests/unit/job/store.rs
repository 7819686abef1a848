use super::*;
use crate::foundation::core::VideoFormat;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "reelforge_{name}_{}_{}.json",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn job(id: &str) -> Job {
    Job::new(id, "topic", VideoFormat::Shorts, 60.0)
}

#[test]
fn upsert_inserts_then_updates() {
    let path = temp_path("store_upsert");
    let store = JobStore::open(&path).unwrap();

    let mut j = job("a");
    store.upsert(&j).unwrap();
    assert_eq!(store.all().len(), 1);

    j.transition(JobStatus::Planning).unwrap();
    store.upsert(&j).unwrap();
    assert_eq!(store.all().len(), 1);
    assert_eq!(store.get("a").unwrap().status, JobStatus::Planning);

    std::fs::remove_file(&path).ok();
}

#[test]
fn history_survives_a_reopen() {
    let path = temp_path("store_reload");
    {
        let store = JobStore::open(&path).unwrap();
        store.upsert(&job("a")).unwrap();
        store.upsert(&job("b")).unwrap();
    }
    let reopened = JobStore::open(&path).unwrap();
    assert_eq!(reopened.all().len(), 2);
    assert!(reopened.get("b").is_some());

    std::fs::remove_file(&path).ok();
}

#[test]
fn stats_track_success_rate() {
    let path = temp_path("store_stats");
    let store = JobStore::open(&path).unwrap();

    let mut done = job("done");
    done.transition(JobStatus::Planning).unwrap();
    done.transition(JobStatus::CollectingAssets).unwrap();
    done.transition(JobStatus::Editing).unwrap();
    done.transition(JobStatus::Completed).unwrap();
    store.upsert(&done).unwrap();

    let mut failed = job("failed");
    failed.transition(JobStatus::Failed).unwrap();
    store.upsert(&failed).unwrap();

    store.upsert(&job("running")).unwrap();

    let stats = store.stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert!((stats.success_rate() - 1.0 / 3.0).abs() < 1e-9);

    std::fs::remove_file(&path).ok();
}

#[test]
fn empty_stores_report_zero_success_rate() {
    let path = temp_path("store_empty");
    let store = JobStore::open(&path).unwrap();
    assert_eq!(store.stats(), JobStats::default());
    assert_eq!(store.stats().success_rate(), 0.0);
}

#[test]
fn corrupt_history_files_error_instead_of_clobbering() {
    let path = temp_path("store_corrupt");
    std::fs::write(&path, b"{definitely not json").unwrap();
    assert!(JobStore::open(&path).is_err());
    std::fs::remove_file(&path).ok();
}

#[test]
fn persisted_history_is_readable_json() {
    let path = temp_path("store_json");
    let store = JobStore::open(&path).unwrap();
    store.upsert(&job("a")).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 1);
    assert_eq!(parsed[0]["id"], "a");

    std::fs::remove_file(&path).ok();
}
