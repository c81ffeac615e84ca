use std::time::Duration;

use docport_models::DocumentStatus;
use docport_services::{TaskId, TaskStatus};

use crate::fixtures::{self, wait_until};

#[tokio::test]
async fn retry_resets_the_task_and_reruns_the_upload() {
    let h = fixtures::harness();
    let name = fixtures::unique_name("retry");
    let id = TaskId::upload(&name);

    h.api.fail_next_upload("Network Error");
    h.store
        .upload_file(fixtures::upload_file(&name), fixtures::metadata())
        .await;
    assert_eq!(h.store.task(&id).unwrap().status, TaskStatus::Error);

    // hold the retried transfer at 0 so the reset is observable
    h.api.hold_uploads(true);
    h.api.script_transfer(&[0.0]);
    let driver = tokio::spawn({
        let store = h.store.clone();
        let id = id.clone();
        async move { store.retry_upload(&id).await }
    });
    assert!(
        wait_until(Duration::from_secs(2), || {
            h.store
                .task(&id)
                .is_some_and(|t| t.status == TaskStatus::Uploading && t.progress == 0.0)
        })
        .await
    );

    // release and run the happy path to completion
    h.api.hold_uploads(false);
    h.api.set_documents(vec![fixtures::make_document(
        3,
        &name,
        DocumentStatus::Parsed,
    )]);
    assert!(
        wait_until(Duration::from_secs(2), || {
            h.store
                .task(&id)
                .is_some_and(|t| t.status == TaskStatus::Completed && t.progress == 100.0)
        })
        .await
    );
    driver.await.unwrap();

    // the retry reused the retained file and form fields
    let uploads = h.api.uploads();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[0].0, uploads[1].0);
    assert_eq!(uploads[0].1, uploads[1].1);
    assert_eq!(uploads[0].2, uploads[1].2);
}

#[tokio::test]
async fn retry_is_ignored_for_request_tasks() {
    let h = fixtures::harness();
    h.store.watch_request(12, "new vendor").await;

    h.store.retry_upload(&TaskId::request(12)).await;
    assert_eq!(h.api.upload_count(), 0);
}

#[tokio::test]
async fn retry_is_ignored_while_an_upload_is_still_active() {
    let h = fixtures::harness();
    let name = fixtures::unique_name("active");
    let id = TaskId::upload(&name);

    h.store
        .upload_file(fixtures::upload_file(&name), fixtures::metadata())
        .await;
    assert_eq!(h.store.task(&id).unwrap().status, TaskStatus::Parsing);

    h.store.retry_upload(&id).await;
    assert_eq!(h.api.upload_count(), 1, "retry must not restart a live upload");
}
