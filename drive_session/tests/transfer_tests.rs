//! End-to-end transfer scenarios against a mocked drive API.

use std::path::PathBuf;

use drive_session::{DriveClientError, DriveSession, SessionError};
use httpmock::prelude::*;
use httpmock::Method::PATCH;
use httpmock::Mock;
use tracing_test::traced_test;

/// Session settings pointing every endpoint at the mock server.
fn session_for(server: &MockServer, max_concurrency: usize) -> DriveSession {
    let settings = serde_json::json!({
        "max_concurrency": max_concurrency,
        "refresh_token": "rt-0",
        "base_url": server.base_url(),
        "auth_url": server.url("/token"),
        "client_id": "app-1",
        "permissions": ["files.readwrite", "offline_access"],
        "redirect_uri": "http://localhost:8080"
    });
    DriveSession::from_json_str(&settings.to_string()).unwrap()
}

/// Token exchange and identity probe answered positively.
async fn mock_connect(server: &MockServer) -> (Mock<'_>, Mock<'_>) {
    let token = server
        .mock_async(|when, then| {
            when.method(POST).path("/token").body_contains("grant_type=refresh_token");
            then.status(200)
                .json_body(serde_json::json!({"access_token": "at-1", "refresh_token": "rt-1"}));
        })
        .await;
    let probe = server
        .mock_async(|when, then| {
            when.method(GET).path("/me/drive");
            then.status(200).json_body(serde_json::json!({"id": "drive-1"}));
        })
        .await;
    (token, probe)
}

fn write_local_files(dir: &tempfile::TempDir, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("content of {name}")).unwrap();
            path
        })
        .collect()
}

#[traced_test]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn uploading_seven_files_with_concurrency_three_succeeds() {
    let server = MockServer::start_async().await;
    let (token, probe) = mock_connect(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let names = ["f1.txt", "f2.txt", "f3.txt", "f4.txt", "f5.txt", "f6.txt", "f7.txt"];
    let paths = write_local_files(&dir, &names);

    let mut upload_mocks = Vec::new();
    for name in names {
        let mock = server
            .mock_async(move |when, then| {
                when.method(PUT)
                    .path(format!("/me/drive/root:/Test/upload/{name}:/content"))
                    .header("authorization", "Bearer at-1")
                    .body(format!("content of {name}"));
                then.status(201)
                    .json_body(serde_json::json!({"id": format!("id-{name}"), "name": name}));
            })
            .await;
        upload_mocks.push(mock);
    }

    let session = session_for(&server, 3);
    session.upload_files(paths, "Test/upload").await.unwrap();

    for mock in &upload_mocks {
        assert_eq!(mock.hits_async().await, 1);
    }
    // Connecting cost exactly one exchange and one probe.
    assert_eq!(token.hits_async().await, 1);
    assert_eq!(probe.hits_async().await, 1);
    assert!(logs_contain("has been uploaded"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn missing_local_file_is_aggregated_and_siblings_still_upload() {
    let server = MockServer::start_async().await;
    mock_connect(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let mut paths = write_local_files(&dir, &["real.txt"]);
    paths.push(dir.path().join("ghost.txt"));

    let uploaded = server
        .mock_async(|when, then| {
            when.method(PUT).path("/me/drive/root:/Test/real.txt:/content");
            then.status(201)
                .json_body(serde_json::json!({"id": "id-real", "name": "real.txt"}));
        })
        .await;

    let session = session_for(&server, 2);
    let err = session.upload_files(paths, "Test").await.unwrap_err();

    let SessionError::Aggregated(message) = err else {
        panic!("expected aggregated error, got: {err}");
    };
    assert!(message.starts_with("could not upload all files: "), "{message}");
    assert!(message.contains("ghost.txt"), "{message}");
    // The sibling worker of the same batch still ran its transfer.
    assert_eq!(uploaded.hits_async().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_download_aborts_remaining_batches() {
    let server = MockServer::start_async().await;
    mock_connect(&server).await;

    // Sorted listing: a..e. Tail-first with concurrency 2 the batches are
    // {e, d}, {c, b}, {a}; item c fails remotely in batch two.
    let listing = server
        .mock_async(|when, then| {
            when.method(GET).path("/me/drive/root:/Test/dl:/children");
            then.status(200).json_body(serde_json::json!({"value": [
                {"id": "id-a", "name": "a.bin"},
                {"id": "id-b", "name": "b.bin"},
                {"id": "id-c", "name": "c.bin"},
                {"id": "id-d", "name": "d.bin"},
                {"id": "id-e", "name": "e.bin"}
            ]}));
        })
        .await;

    let mut content_mocks = Vec::new();
    for id in ["id-b", "id-d", "id-e"] {
        let mock = server
            .mock_async(move |when, then| {
                when.method(GET).path(format!("/me/drive/items/{id}/content"));
                then.status(200).body("data");
            })
            .await;
        content_mocks.push(mock);
    }
    let failing = server
        .mock_async(|when, then| {
            when.method(GET).path("/me/drive/items/id-c/content");
            then.status(500);
        })
        .await;
    let abandoned = server
        .mock_async(|when, then| {
            when.method(GET).path("/me/drive/items/id-a/content");
            then.status(200).body("data");
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let session = session_for(&server, 2);
    let err = session
        .download_files("Test/dl", dir.path(), None)
        .await
        .unwrap_err();

    let SessionError::Aggregated(message) = err else {
        panic!("expected aggregated error, got: {err}");
    };
    assert!(message.starts_with("could not download all files: "), "{message}");
    assert!(message.contains("c.bin"), "{message}");

    assert_eq!(listing.hits_async().await, 1);
    assert_eq!(failing.hits_async().await, 1);
    // The failing item's batch completed; the final batch never started.
    for mock in &content_mocks {
        assert_eq!(mock.hits_async().await, 1);
    }
    assert_eq!(abandoned.hits_async().await, 0);

    // Completed side effects persist.
    assert!(dir.path().join("e.bin").exists());
    assert!(dir.path().join("d.bin").exists());
    assert!(!dir.path().join("a.bin").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn download_specific_file_fetches_only_that_item() {
    let server = MockServer::start_async().await;
    mock_connect(&server).await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/me/drive/root:/Test/dl:/children");
            then.status(200).json_body(serde_json::json!({"value": [
                {"id": "id-a", "name": "a.bin"},
                {"id": "id-b", "name": "b.bin"}
            ]}));
        })
        .await;
    let wanted = server
        .mock_async(|when, then| {
            when.method(GET).path("/me/drive/items/id-b/content");
            then.status(200).body("b-data");
        })
        .await;
    let unwanted = server
        .mock_async(|when, then| {
            when.method(GET).path("/me/drive/items/id-a/content");
            then.status(200).body("a-data");
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let session = session_for(&server, 4);
    session
        .download_files("Test/dl", dir.path(), Some("b.bin"))
        .await
        .unwrap();

    assert_eq!(wanted.hits_async().await, 1);
    assert_eq!(unwanted.hits_async().await, 0);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("b.bin")).unwrap(),
        "b-data"
    );
    assert!(!dir.path().join("a.bin").exists());
}

#[tokio::test]
async fn move_file_resolves_ids_and_patches() {
    let server = MockServer::start_async().await;
    mock_connect(&server).await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/me/drive/root:/src:/children");
            then.status(200).json_body(serde_json::json!({"value": [
                {"id": "id-file", "name": "report.txt"}
            ]}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/me/drive/root:/dest");
            then.status(200).json_body(serde_json::json!({"id": "id-dest", "name": "dest", "folder": {}}));
        })
        .await;
    let patch = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/me/drive/items/id-file")
                .json_body_partial(r#"{"parentReference": {"id": "id-dest"}}"#);
            then.status(200).json_body(serde_json::json!({"id": "id-file", "name": "report.txt"}));
        })
        .await;

    let session = session_for(&server, 2);
    session.move_file("dest", "src", "report.txt").await.unwrap();
    patch.assert_async().await;
}

#[tokio::test]
async fn move_file_missing_from_source_is_an_error() {
    let server = MockServer::start_async().await;
    mock_connect(&server).await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/me/drive/root:/src:/children");
            then.status(200).json_body(serde_json::json!({"value": []}));
        })
        .await;
    let patch = server
        .mock_async(|when, then| {
            when.method(PATCH).path_contains("/me/drive/items/");
            then.status(200).json_body(serde_json::json!({"id": "x", "name": "x"}));
        })
        .await;

    let session = session_for(&server, 2);
    let err = session.move_file("dest", "src", "report.txt").await.unwrap_err();

    assert!(
        matches!(err, SessionError::Client(DriveClientError::Remote(ref msg)) if msg.contains("report.txt")),
        "unexpected error: {err}"
    );
    assert_eq!(patch.hits_async().await, 0);
}

#[tokio::test]
async fn move_all_files_reparents_the_source_folder() {
    let server = MockServer::start_async().await;
    mock_connect(&server).await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/me/drive/root:/src");
            then.status(200).json_body(serde_json::json!({"id": "id-src", "name": "src", "folder": {}}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/me/drive/root:/dest");
            then.status(200).json_body(serde_json::json!({"id": "id-dest", "name": "dest", "folder": {}}));
        })
        .await;
    let patch = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/me/drive/items/id-src")
                .json_body_partial(r#"{"parentReference": {"id": "id-dest"}}"#);
            then.status(200).json_body(serde_json::json!({"id": "id-src", "name": "src", "folder": {}}));
        })
        .await;

    let session = session_for(&server, 2);
    session.move_all_files("dest", "src").await.unwrap();
    patch.assert_async().await;
}

#[tokio::test]
async fn make_dir_failure_carries_the_remote_code() {
    let server = MockServer::start_async().await;
    mock_connect(&server).await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/me/drive/root:/Test:/children");
            then.status(409)
                .json_body(serde_json::json!({"error": {"code": "nameAlreadyExists"}}));
        })
        .await;

    let session = session_for(&server, 2);
    let err = session.make_dir("Test", "dup").await.unwrap_err();
    assert!(err.to_string().contains("could not create the directory dup"), "{err}");
    assert!(err.to_string().contains("nameAlreadyExists"), "{err}");
}

#[test]
fn construction_with_missing_field_never_touches_the_network() {
    // No mock server at all: an invalid settings object must fail before
    // any request is issued.
    let err = DriveSession::from_json_str(
        r#"{"max_concurrency": 2, "refresh_token": "rt-0", "auth_url": "https://login.example.com/token"}"#,
    )
    .unwrap_err();
    assert!(
        matches!(err, SessionError::Client(DriveClientError::Configuration(_))),
        "unexpected error: {err}"
    );
}
