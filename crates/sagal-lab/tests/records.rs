mod common;

use std::sync::Arc;

use common::{CDN, FailingStore, staged};
use sagal_core::keys;
use sagal_core::models::{Gender, PatientRecord, PatientRecordDraft};
use sagal_lab::{ErrorKind, HandoffStore, LabError, MemorySlotStore, RecordBook};
use sagal_storage::MemoryObjectStore;
use sagal_storage::state::save_state;
use uuid::Uuid;

fn draft() -> PatientRecordDraft {
    PatientRecordDraft {
        name: "  Hodan Warsame ".to_string(),
        age: 34,
        gender: Gender::Female,
        doctors_verdict: "Refer to haematology".to_string(),
    }
}

fn staged_handoff() -> HandoffStore<MemorySlotStore> {
    let handoff = HandoffStore::new(MemorySlotStore::new());
    handoff
        .stage(&staged("ALL", 0.93, "https://cdn.sagal.example/blood-images/a.jpg"))
        .unwrap();
    handoff
}

#[tokio::test]
async fn create_consumes_staged_result_and_clears_slot() {
    let store = Arc::new(MemoryObjectStore::new(CDN));
    let book = RecordBook::new(store.clone());
    let handoff = staged_handoff();

    let record = book.create_from_handoff(&handoff, draft()).await.unwrap();

    assert_eq!(record.name, "Hodan Warsame");
    assert_eq!(record.result, "ALL");
    assert_eq!(
        record.blood_image_url.as_deref(),
        Some("https://cdn.sagal.example/blood-images/a.jpg")
    );
    assert_eq!(record.created_at, record.updated_at);
    assert!(handoff.consume().unwrap().is_none());

    assert_eq!(store.keys().await, vec![keys::patient_record(record.id)]);
    assert_eq!(book.get(record.id).await.unwrap(), record);
}

#[tokio::test]
async fn create_without_staged_result_fails() {
    let book = RecordBook::new(Arc::new(MemoryObjectStore::new(CDN)));
    let handoff = HandoffStore::new(MemorySlotStore::new());

    let err = book.create_from_handoff(&handoff, draft()).await.unwrap_err();

    assert!(matches!(err, LabError::NothingStaged));
    assert_eq!(err.kind(), ErrorKind::Record);
}

#[tokio::test]
async fn invalid_draft_is_rejected_before_touching_the_slot() {
    let store = Arc::new(MemoryObjectStore::new(CDN));
    let book = RecordBook::new(store.clone());
    let handoff = staged_handoff();

    let mut incomplete = draft();
    incomplete.doctors_verdict = "   ".to_string();
    let err = book
        .create_from_handoff(&handoff, incomplete)
        .await
        .unwrap_err();

    assert!(matches!(err, LabError::InvalidRecord(_)));
    assert_eq!(err.user_message(), "Please fill in all fields.");
    assert!(handoff.consume().unwrap().is_some());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn failed_save_keeps_staged_result() {
    let book = RecordBook::new(Arc::new(FailingStore::default()));
    let handoff = staged_handoff();

    let err = book.create_from_handoff(&handoff, draft()).await.unwrap_err();

    assert!(matches!(err, LabError::RecordStorage(_)));
    assert!(handoff.consume().unwrap().is_some());
}

#[tokio::test]
async fn update_keeps_lab_result_and_image() {
    let book = RecordBook::new(Arc::new(MemoryObjectStore::new(CDN)));
    let handoff = staged_handoff();
    let created = book.create_from_handoff(&handoff, draft()).await.unwrap();

    let revised = PatientRecordDraft {
        name: "Hodan Warsame".to_string(),
        age: 35,
        gender: Gender::Female,
        doctors_verdict: "Confirmed by bone marrow biopsy".to_string(),
    };
    let updated = book.update(created.id, revised).await.unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.age, 35);
    assert_eq!(updated.doctors_verdict, "Confirmed by bone marrow biopsy");
    assert_eq!(updated.result, created.result);
    assert_eq!(updated.blood_image_url, created.blood_image_url);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);
    assert_eq!(book.get(created.id).await.unwrap(), updated);
}

#[tokio::test]
async fn missing_record_is_not_found() {
    let book = RecordBook::new(Arc::new(MemoryObjectStore::new(CDN)));
    let id = Uuid::new_v4();

    let err = book.get(id).await.unwrap_err();
    assert!(matches!(err, LabError::RecordNotFound(missing) if missing == id));

    let err = book.update(id, draft()).await.unwrap_err();
    assert!(matches!(err, LabError::RecordNotFound(_)));
}

#[tokio::test]
async fn list_returns_newest_first() {
    let store = Arc::new(MemoryObjectStore::new(CDN));
    let book = RecordBook::new(store.clone());

    let record = |name: &str, created: &str| {
        let ts: jiff::Timestamp = created.parse().unwrap();
        PatientRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            age: 40,
            gender: Gender::Male,
            result: "Normal".to_string(),
            doctors_verdict: "No follow-up".to_string(),
            blood_image_url: None,
            created_at: ts,
            updated_at: ts,
        }
    };
    let oldest = record("Abdi", "2026-01-01T09:00:00Z");
    let newest = record("Farah", "2026-03-01T09:00:00Z");
    let middle = record("Yusuf", "2026-02-01T09:00:00Z");
    for r in [&oldest, &newest, &middle] {
        save_state(&*store, &keys::patient_record(r.id), r)
            .await
            .unwrap();
    }

    let names: Vec<String> = book
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, ["Farah", "Yusuf", "Abdi"]);
}

#[tokio::test]
async fn out_of_domain_slot_entry_never_becomes_a_record() {
    let store = Arc::new(MemoryObjectStore::new(CDN));
    let book = RecordBook::new(store.clone());
    let slot = MemorySlotStore::new();
    sagal_lab::SlotStore::write(
        &slot,
        "lab_result",
        br#"{"label":"not_blood","score":0.4,"imageUrl":"https://cdn.sagal.example/a.jpg"}"#,
    )
    .unwrap();
    let handoff = HandoffStore::new(slot);

    let err = book.create_from_handoff(&handoff, draft()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Handoff);
    assert!(store.is_empty().await);
}
