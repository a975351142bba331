mod common;

use std::time::Duration;

use common::staged;
use sagal_lab::error::HandoffError;
use sagal_lab::{FileSlotStore, HandoffStore, MemorySlotStore, SlotStore};
use serde_json::json;

#[test]
fn empty_slot_reads_none() {
    let handoff = HandoffStore::new(MemorySlotStore::new());
    assert!(handoff.consume().unwrap().is_none());
}

#[test]
fn consume_does_not_clear() {
    let handoff = HandoffStore::new(MemorySlotStore::new());
    let result = staged("ALL", 0.93, "https://cdn.sagal.example/blood-images/a.jpg");

    handoff.stage(&result).unwrap();

    assert_eq!(handoff.consume().unwrap(), Some(result.clone()));
    assert_eq!(handoff.consume().unwrap(), Some(result));
}

#[test]
fn last_stage_wins() {
    let handoff = HandoffStore::new(MemorySlotStore::new());
    let first = staged("ALL", 0.93, "https://cdn.sagal.example/blood-images/a.jpg");
    let second = staged("Normal", 0.71, "https://cdn.sagal.example/blood-images/b.jpg");

    handoff.stage(&first).unwrap();
    handoff.stage(&second).unwrap();

    assert_eq!(handoff.consume().unwrap(), Some(second));
}

#[test]
fn clear_empties_slot_and_is_idempotent() {
    let handoff = HandoffStore::new(MemorySlotStore::new());
    handoff
        .stage(&staged("ALL", 0.5, "https://cdn.sagal.example/x.jpg"))
        .unwrap();

    handoff.clear().unwrap();
    assert!(handoff.consume().unwrap().is_none());
    handoff.clear().unwrap();
}

#[test]
fn slot_uses_lab_result_key_with_score_and_image_url() {
    let handoff = HandoffStore::new(MemorySlotStore::new());
    handoff
        .stage(&staged("ALL", 0.93, "https://cdn.sagal.example/a.jpg"))
        .unwrap();

    assert_eq!(handoff.key(), "lab_result");
    let raw = handoff.slot().read("lab_result").unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(value["label"], "ALL");
    assert_eq!(value["score"], 0.93);
    assert_eq!(value["imageUrl"], "https://cdn.sagal.example/a.jpg");
    assert!(value["stagedAt"].is_string());
}

#[test]
fn reads_legacy_percent_string_entries() {
    let slot = MemorySlotStore::new();
    let legacy = json!({
        "label": "ALL",
        "score": "93.12%",
        "imageUrl": "https://bucket.s3.amazonaws.com/blood-images/old.png"
    });
    slot.write("lab_result", legacy.to_string().as_bytes()).unwrap();

    let result = HandoffStore::new(slot).consume().unwrap().unwrap();

    assert_eq!(result.label().as_str(), "ALL");
    assert!((result.confidence().value() - 0.9312).abs() < 1e-9);
    assert!(result.submission_id().is_nil());
}

#[test]
fn malformed_slot_is_an_error() {
    let slot = MemorySlotStore::new();
    slot.write("lab_result", b"{not json").unwrap();

    let err = HandoffStore::new(slot).consume().unwrap_err();
    assert!(matches!(err, HandoffError::Malformed(_)));
}

#[test]
fn expired_entry_reads_as_empty() {
    let slot = MemorySlotStore::new();
    let old = json!({
        "label": "Normal",
        "score": 0.8,
        "imageUrl": "https://cdn.sagal.example/old.jpg",
        "stagedAt": "2020-01-01T00:00:00Z"
    });
    slot.write("lab_result", old.to_string().as_bytes()).unwrap();

    let handoff = HandoffStore::new(slot).with_ttl(Duration::from_secs(3600));
    assert!(handoff.consume().unwrap().is_none());
}

#[test]
fn fresh_entry_survives_ttl() {
    let handoff = HandoffStore::new(MemorySlotStore::new()).with_ttl(Duration::from_secs(3600));
    let result = staged("ALL", 0.9, "https://cdn.sagal.example/a.jpg");

    handoff.stage(&result).unwrap();
    assert_eq!(handoff.consume().unwrap(), Some(result));
}

#[test]
fn file_slot_round_trips_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let result = staged("Normal", 0.66, "https://cdn.sagal.example/n.jpg");

    HandoffStore::new(FileSlotStore::new(dir.path()))
        .stage(&result)
        .unwrap();

    assert!(dir.path().join("lab_result.json").exists());
    assert!(!dir.path().join("lab_result.json.tmp").exists());

    let reader = HandoffStore::new(FileSlotStore::new(dir.path()));
    assert_eq!(reader.consume().unwrap(), Some(result));

    reader.clear().unwrap();
    assert!(!dir.path().join("lab_result.json").exists());
    reader.clear().unwrap();
}

#[test]
fn file_slot_missing_directory_reads_none() {
    let dir = tempfile::tempdir().unwrap();
    let handoff = HandoffStore::new(FileSlotStore::new(dir.path().join("missing")));
    assert!(handoff.consume().unwrap().is_none());
}

#[cfg(unix)]
#[test]
fn file_slot_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    HandoffStore::new(FileSlotStore::new(dir.path()))
        .stage(&staged("ALL", 0.9, "https://cdn.sagal.example/a.jpg"))
        .unwrap();

    let mode = std::fs::metadata(dir.path().join("lab_result.json"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn out_of_domain_entry_is_refused() {
    let slot = MemorySlotStore::new();
    let forged = json!({
        "label": "not_blood",
        "score": 0.4,
        "imageUrl": "https://cdn.sagal.example/blood-images/a.jpg"
    });
    slot.write("lab_result", forged.to_string().as_bytes()).unwrap();

    let err = HandoffStore::new(slot).consume().unwrap_err();
    assert!(matches!(err, HandoffError::Malformed(_)));
    assert!(err.to_string().contains("not_blood"));
}

#[test]
fn entry_without_image_url_is_refused() {
    let slot = MemorySlotStore::new();
    let missing_image = json!({ "label": "ALL", "score": 0.9, "imageUrl": "  " });
    slot.write("lab_result", missing_image.to_string().as_bytes()).unwrap();

    let err = HandoffStore::new(slot).consume().unwrap_err();
    assert!(matches!(err, HandoffError::Malformed(_)));
}

#[test]
fn entry_with_blank_label_is_refused() {
    let slot = MemorySlotStore::new();
    let blank = json!({
        "label": "",
        "score": 0.9,
        "imageUrl": "https://cdn.sagal.example/a.jpg"
    });
    slot.write("lab_result", blank.to_string().as_bytes()).unwrap();

    assert!(HandoffStore::new(slot).consume().is_err());
}

#[test]
fn huge_ttl_never_expires() {
    let handoff =
        HandoffStore::new(MemorySlotStore::new()).with_ttl(Duration::from_secs(u64::MAX));
    let result = staged("ALL", 0.9, "https://cdn.sagal.example/a.jpg");

    handoff.stage(&result).unwrap();
    assert_eq!(handoff.consume().unwrap(), Some(result));

    let slot = MemorySlotStore::new();
    let old = json!({
        "label": "Normal",
        "score": 0.8,
        "imageUrl": "https://cdn.sagal.example/old.jpg",
        "stagedAt": "2000-01-01T00:00:00Z"
    });
    slot.write("lab_result", old.to_string().as_bytes()).unwrap();
    let handoff = HandoffStore::new(slot).with_ttl(Duration::from_secs(u64::MAX));
    assert!(handoff.consume().unwrap().is_some());
}
