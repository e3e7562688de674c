//! Graph transport tests against a mock server.

mod common;

use common::{
    children, file_json, folder_json, item_path, mount_library, settings, settings_with, DRIVE_ID,
    ROOT_ID, SITE_ID,
};
use serde_json::json;
use sharepath_core::{
    ClientOptions, ConflictPolicy, DeleteMode, LibraryError, MissingFolders, RemoteStore,
    StoreError,
};
use sharepath_graph::{connect, Credential, GraphStore, UPLOAD_CHUNK_ALIGNMENT};
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Connecting
// =============================================================================

mod connecting {
    use super::*;

    #[tokio::test]
    async fn test_connect_binds_named_library() {
        let server = MockServer::start().await;
        mount_library(&server).await;

        let client = connect(&settings(&server), ClientOptions::default())
            .await
            .unwrap();

        let root = client.root();
        assert_eq!(root.title, "PACS");
        assert_eq!(root.library_id, DRIVE_ID);
        assert_eq!(root.root_item_id, ROOT_ID);
        assert_eq!(root.server_relative_url, "/sites/Team/PACS");
        assert_eq!(client.store().drive_id(), DRIVE_ID);
    }

    #[tokio::test]
    async fn test_unknown_library_is_configuration_error() {
        let server = MockServer::start().await;
        mount_library(&server).await;
        let mut settings = settings(&server);
        settings.library = "Missing".to_string();

        let err = connect(&settings, ClientOptions::default())
            .await
            .err()
            .unwrap();

        match err {
            LibraryError::Configuration(message) => {
                assert!(message.contains("Missing"));
                assert!(message.contains("Documents"));
            }
            other => panic!("Expected Configuration, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_settings_fail_before_any_request() {
        let server = MockServer::start().await;
        let mut settings = settings(&server);
        settings.site_path = "sites/Team".to_string();

        let err = connect(&settings, ClientOptions::default())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, LibraryError::Configuration(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drive_listing_follows_next_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/sites/contoso.sharepoint.com:/sites/Team"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": SITE_ID })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/v1.0/sites/{SITE_ID}/drives")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{ "id": "drive-0", "name": "Documents" }],
                "@odata.nextLink": format!("{}/v1.0/next-drives", server.uri())
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/next-drives"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{ "id": DRIVE_ID, "name": "pacs" }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/v1.0/drives/{DRIVE_ID}/root")))
            .respond_with(ResponseTemplate::new(200).set_body_json(folder_json(ROOT_ID, "root")))
            .mount(&server)
            .await;

        let store = GraphStore::connect(&settings(&server)).await.unwrap();

        // Case-insensitive title match, no webUrl: URL falls back to site path
        let root = store.library_root().await.unwrap();
        assert_eq!(root.title, "pacs");
        assert_eq!(root.server_relative_url, "/sites/Team/pacs");
    }

    #[tokio::test]
    async fn test_connect_retries_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/sites/contoso.sharepoint.com:/sites/Team"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_library(&server).await;

        let settings = settings(&server).with_connect_attempts(2);
        let store = GraphStore::connect(&settings).await.unwrap();

        assert_eq!(store.drive_id(), DRIVE_ID);
    }

    #[tokio::test]
    async fn test_unauthorized_site_lookup_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/sites/contoso.sharepoint.com:/sites/Team"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "code": "InvalidAuthenticationToken", "message": "Access token has expired." }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let settings = settings(&server).with_connect_attempts(3);
        let err = connect(&settings, ClientOptions::default())
            .await
            .err()
            .unwrap();

        assert!(matches!(
            err,
            LibraryError::Transport(StoreError::Unauthorized(ref message)) if message.contains("expired")
        ));
    }
}

// =============================================================================
// Authentication
// =============================================================================

mod authentication {
    use super::*;

    #[tokio::test]
    async fn test_client_secret_token_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_secret=s3cret"))
            .and(body_string_contains("scope=https%3A%2F%2Fgraph.microsoft.com%2F.default"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "issued-token",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/sites/contoso.sharepoint.com:/sites/Team"))
            .and(header("Authorization", "Bearer issued-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": SITE_ID })))
            .mount(&server)
            .await;
        mount_library(&server).await;

        let settings = settings_with(
            &server,
            Credential::ClientSecret {
                secret: "s3cret".to_string(),
            },
        );
        let client = connect(&settings, ClientOptions::default()).await.unwrap();

        assert_eq!(client.root().title, "PACS");
    }

    #[tokio::test]
    async fn test_certificate_flow_sends_signed_assertion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .and(body_string_contains(
                "client_assertion_type=urn%3Aietf%3Aparams%3Aoauth%3Aclient-assertion-type%3Ajwt-bearer",
            ))
            .and(body_string_contains("client_assertion=ey"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "cert-token",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_library(&server).await;

        let settings = settings_with(
            &server,
            Credential::Certificate {
                private_key_pem: include_str!("fixtures/test-key.pem").to_string(),
                thumbprint: "3A7B0C112233445566778899AABBCCDDEEFF0012".to_string(),
            },
        );

        assert!(connect(&settings, ClientOptions::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let settings = settings_with(
            &server,
            Credential::ClientSecret {
                secret: "wrong".to_string(),
            },
        )
        .with_connect_attempts(3);

        let err = connect(&settings, ClientOptions::default())
            .await
            .err()
            .unwrap();

        assert!(matches!(
            err,
            LibraryError::Transport(StoreError::Unauthorized(ref message)) if message.contains("AADSTS7000215")
        ));
    }
}

// =============================================================================
// Structural operations
// =============================================================================

mod operations {
    use super::*;

    #[tokio::test]
    async fn test_create_folder_chain() {
        let server = MockServer::start().await;
        mount_library(&server).await;
        Mock::given(method("GET"))
            .and(path(item_path(ROOT_ID, "/children")))
            .respond_with(children(vec![]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(item_path(ROOT_ID, "/children")))
            .and(body_json(json!({
                "name": "HR",
                "folder": {},
                "@microsoft.graph.conflictBehavior": "fail"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(folder_json("hr-id", "HR")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(item_path("hr-id", "/children")))
            .respond_with(children(vec![]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(item_path("hr-id", "/children")))
            .respond_with(ResponseTemplate::new(201).set_body_json(folder_json("pay-id", "Payroll")))
            .expect(1)
            .mount(&server)
            .await;

        let client = connect(&settings(&server), ClientOptions::default())
            .await
            .unwrap();
        let folder = client.create_folder("HR/Payroll").await.unwrap();

        assert_eq!(folder.id, "pay-id");
        assert_eq!(folder.path.to_string(), "HR/Payroll");
    }

    #[tokio::test]
    async fn test_conflict_on_create_reuses_existing_folder() {
        let server = MockServer::start().await;
        mount_library(&server).await;
        Mock::given(method("GET"))
            .and(path(item_path(ROOT_ID, "/children")))
            .respond_with(children(vec![]))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(item_path(ROOT_ID, "/children")))
            .respond_with(children(vec![folder_json("hr-id", "HR")]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(item_path(ROOT_ID, "/children")))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": { "code": "nameAlreadyExists", "message": "Name already exists" }
            })))
            .mount(&server)
            .await;

        let client = connect(&settings(&server), ClientOptions::default())
            .await
            .unwrap();
        let folder = client.create_folder("HR").await.unwrap();

        assert_eq!(folder.id, "hr-id");
    }

    #[tokio::test]
    async fn test_failed_creation_names_segment() {
        let server = MockServer::start().await;
        mount_library(&server).await;
        Mock::given(method("GET"))
            .and(path(item_path(ROOT_ID, "/children")))
            .respond_with(children(vec![folder_json("hr-id", "HR")]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(item_path("hr-id", "/children")))
            .respond_with(children(vec![]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(item_path("hr-id", "/children")))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = connect(&settings(&server), ClientOptions::default())
            .await
            .unwrap();
        let err = client.create_folder("HR/Payroll/2025").await.unwrap_err();

        match err {
            LibraryError::FolderCreation {
                segment,
                depth,
                committed,
                source,
            } => {
                assert_eq!(segment, "Payroll");
                assert_eq!(depth, 2);
                assert_eq!(committed, "HR");
                assert!(matches!(source, StoreError::Server { status: 500, .. }));
            }
            other => panic!("Expected FolderCreation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_children_listing_is_paged() {
        let server = MockServer::start().await;
        mount_library(&server).await;
        Mock::given(method("GET"))
            .and(path(item_path(ROOT_ID, "/children")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [file_json("f1", "one.txt", 1)],
                "@odata.nextLink": format!("{}/v1.0/children-page-2", server.uri())
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/children-page-2"))
            .respond_with(children(vec![
                file_json("f2", "two.txt", 2),
                folder_json("d1", "Sub"),
            ]))
            .mount(&server)
            .await;

        let client = connect(&settings(&server), ClientOptions::default())
            .await
            .unwrap();

        let files = client.get_files("").await.unwrap();
        let folders = client.get_folders("/").await.unwrap();

        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["one.txt", "two.txt"]);
        assert_eq!(files[1].path.to_string(), "two.txt");
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].path.to_string(), "Sub");
    }

    #[tokio::test]
    async fn test_children_without_name_are_skipped() {
        let server = MockServer::start().await;
        mount_library(&server).await;
        Mock::given(method("GET"))
            .and(path(item_path(ROOT_ID, "/children")))
            .respond_with(children(vec![
                json!({ "id": "anon-folder", "folder": { "childCount": 0 } }),
                json!({ "id": "anon-file", "name": "", "size": 1, "file": {} }),
                file_json("f1", "one.txt", 1),
            ]))
            .mount(&server)
            .await;

        let client = connect(&settings(&server), ClientOptions::default())
            .await
            .unwrap();

        let files = client.get_files("").await.unwrap();
        let folders = client.get_folders("").await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path.to_string(), "one.txt");
        assert!(folders.is_empty());
    }

    #[tokio::test]
    async fn test_small_upload_uses_single_put() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("notes 1.txt");
        std::fs::write(&local, b"hello").unwrap();

        let server = MockServer::start().await;
        mount_library(&server).await;
        Mock::given(method("GET"))
            .and(path(item_path(ROOT_ID, "/children")))
            .respond_with(children(vec![]))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(item_path(ROOT_ID, ":/notes%201.txt:/content")))
            .and(query_param("@microsoft.graph.conflictBehavior", "fail"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(file_json("f-id", "notes 1.txt", 5)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = connect(&settings(&server), ClientOptions::default())
            .await
            .unwrap();
        let file = client.upload_file(&local, "").await.unwrap();

        assert_eq!(file.id, "f-id");
        assert_eq!(file.size, 5);
        assert_eq!(file.path.to_string(), "notes 1.txt");
        assert_eq!(file.properties["mimeType"], "text/plain");
    }

    #[tokio::test]
    async fn test_large_upload_uses_session_chunks() {
        let chunk = 2 * UPLOAD_CHUNK_ALIGNMENT;
        let total = 4 * 1024 * 1024 + 1;
        let full_chunks = total / chunk;
        let last_start = full_chunks * chunk;

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("big.bin");
        std::fs::write(&local, vec![7u8; total]).unwrap();

        let server = MockServer::start().await;
        mount_library(&server).await;
        Mock::given(method("GET"))
            .and(path(item_path(ROOT_ID, "/children")))
            .respond_with(children(vec![]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(item_path(ROOT_ID, ":/big.bin:/createUploadSession")))
            .and(body_json(json!({
                "item": { "@microsoft.graph.conflictBehavior": "fail" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "uploadUrl": format!("{}/upload/session-1", server.uri())
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/upload/session-1"))
            .and(header(
                "Content-Range",
                format!("bytes {}-{}/{}", last_start, total - 1, total).as_str(),
            ))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(file_json("big-id", "big.bin", total as u64)),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/upload/session-1"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "nextExpectedRanges": []
            })))
            .expect(full_chunks as u64)
            .mount(&server)
            .await;

        let settings = settings(&server).with_upload_chunk_size(chunk);
        let client = connect(&settings, ClientOptions::default()).await.unwrap();
        let file = client.upload_file(&local, "").await.unwrap();

        assert_eq!(file.id, "big-id");
        assert_eq!(file.size, total as u64);
    }

    #[tokio::test]
    async fn test_download_and_move() {
        let server = MockServer::start().await;
        mount_library(&server).await;
        Mock::given(method("GET"))
            .and(path(item_path(ROOT_ID, "/children")))
            .respond_with(children(vec![
                folder_json("a-id", "Archive"),
                file_json("f-id", "a.txt", 3),
            ]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(item_path("a-id", "/children")))
            .respond_with(children(vec![]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(item_path("f-id", "/content")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"abc".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(item_path("f-id", "")))
            .and(query_param("@microsoft.graph.conflictBehavior", "fail"))
            .and(body_json(json!({
                "parentReference": { "id": "a-id" },
                "name": "a.txt"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(file_json("f-id", "a.txt", 3)))
            .expect(1)
            .mount(&server)
            .await;

        let client = connect(&settings(&server), ClientOptions::default())
            .await
            .unwrap();

        let fetched = client.fetch_file("a.txt").await.unwrap();
        assert_eq!(fetched.content, b"abc");

        let moved = client.move_file("a.txt", "archive").await.unwrap();
        assert_eq!(moved.path.to_string(), "Archive/a.txt");
    }

    #[tokio::test]
    async fn test_replace_move_overwrites_in_one_patch() {
        let server = MockServer::start().await;
        mount_library(&server).await;
        Mock::given(method("GET"))
            .and(path(item_path(ROOT_ID, "/children")))
            .respond_with(children(vec![
                folder_json("a-id", "Archive"),
                file_json("f-id", "a.txt", 3),
            ]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(item_path("a-id", "/children")))
            .respond_with(children(vec![file_json("old-id", "a.txt", 1)]))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(item_path("f-id", "")))
            .and(query_param("@microsoft.graph.conflictBehavior", "replace"))
            .respond_with(ResponseTemplate::new(200).set_body_json(file_json("f-id", "a.txt", 3)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let options = ClientOptions::default().with_conflict_policy(ConflictPolicy::Replace);
        let client = connect(&settings(&server), options).await.unwrap();

        let moved = client.move_file("a.txt", "Archive").await.unwrap();

        assert_eq!(moved.id, "f-id");
        assert_eq!(moved.path.to_string(), "Archive/a.txt");
    }

    #[tokio::test]
    async fn test_rename_patches_name_only_within_parent() {
        let server = MockServer::start().await;
        mount_library(&server).await;
        Mock::given(method("GET"))
            .and(path(item_path(ROOT_ID, "/children")))
            .respond_with(children(vec![file_json("f-id", "draft.txt", 3)]))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(item_path("f-id", "")))
            .and(query_param("@microsoft.graph.conflictBehavior", "fail"))
            .and(body_json(json!({
                "parentReference": { "id": ROOT_ID },
                "name": "final.txt"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(file_json("f-id", "final.txt", 3)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = connect(&settings(&server), ClientOptions::default())
            .await
            .unwrap();
        let renamed = client.rename_file("draft.txt", "final.txt").await.unwrap();

        assert_eq!(renamed.path.to_string(), "final.txt");
    }

    #[tokio::test]
    async fn test_delete_of_vanished_file() {
        let server = MockServer::start().await;
        mount_library(&server).await;
        Mock::given(method("GET"))
            .and(path(item_path(ROOT_ID, "/children")))
            .respond_with(children(vec![file_json("f-id", "a.txt", 3)]))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(item_path("f-id", "")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let strict = connect(&settings(&server), ClientOptions::default())
            .await
            .unwrap();
        assert!(strict.delete_file("a.txt").await.unwrap_err().is_not_found());

        let idempotent = connect(
            &settings(&server),
            ClientOptions::default().with_delete_mode(DeleteMode::Idempotent),
        )
        .await
        .unwrap();
        assert_eq!(
            idempotent.delete_file("a.txt").await.unwrap(),
            sharepath_core::DeleteOutcome::AlreadyAbsent
        );
    }

    #[tokio::test]
    async fn test_folder_by_link_uses_direct_lookup() {
        let server = MockServer::start().await;
        mount_library(&server).await;
        Mock::given(method("GET"))
            .and(path(format!(
                "/v1.0/drives/{DRIVE_ID}/root:/Compliance%20Team/Target%20Dir"
            )))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(folder_json("t-id", "Target Dir")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = connect(&settings(&server), ClientOptions::default())
            .await
            .unwrap();
        let folder = client
            .get_folder_by_link("/sites/Team/PACS/Compliance Team/Target Dir")
            .await
            .unwrap();

        assert_eq!(folder.id, "t-id");
        assert_eq!(folder.path.to_string(), "Compliance Team/Target Dir");
    }

    #[tokio::test]
    async fn test_throttling_and_expired_token_surface_as_transport_errors() {
        let server = MockServer::start().await;
        mount_library(&server).await;
        Mock::given(method("GET"))
            .and(path(item_path(ROOT_ID, "/children")))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "17"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(item_path(ROOT_ID, "/children")))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "code": "InvalidAuthenticationToken", "message": "Token expired" }
            })))
            .mount(&server)
            .await;

        let client = connect(&settings(&server), ClientOptions::default())
            .await
            .unwrap();

        let throttled = client.get_files("").await.unwrap_err();
        assert!(matches!(
            throttled,
            LibraryError::Transport(StoreError::RateLimited { retry_after_secs: 17 })
        ));

        let expired = client
            .resolve_folder("Anything", MissingFolders::Fail)
            .await
            .unwrap_err();
        assert!(matches!(
            expired,
            LibraryError::Transport(StoreError::Unauthorized(ref m)) if m.contains("InvalidAuthenticationToken")
        ));
    }
}
