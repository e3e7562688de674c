//! Mock Graph fixtures shared by the transport tests
#![allow(dead_code)]

use serde_json::{json, Value};
use sharepath_graph::{Credential, GraphSettings};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SITE_ID: &str = "contoso.sharepoint.com,site-guid,web-guid";
pub const DRIVE_ID: &str = "drive-1";
pub const ROOT_ID: &str = "root-id";

/// Settings pointing at the mock server, authenticated with a fixed token
pub fn settings(server: &MockServer) -> GraphSettings {
    settings_with(
        server,
        Credential::AccessToken {
            token: "test-token".to_string(),
        },
    )
}

pub fn settings_with(server: &MockServer, credential: Credential) -> GraphSettings {
    GraphSettings::new(
        "tenant",
        "client",
        credential,
        "contoso.sharepoint.com",
        "/sites/Team",
        "PACS",
    )
    .with_base_urls(format!("{}/v1.0", server.uri()), server.uri())
    .with_connect_attempts(1)
}

/// Mount the site, drive list and library root lookups `connect` performs
pub async fn mount_library(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1.0/sites/contoso.sharepoint.com:/sites/Team"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": SITE_ID })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v1.0/sites/{SITE_ID}/drives")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {
                    "id": "drive-0",
                    "name": "Documents",
                    "webUrl": "https://contoso.sharepoint.com/sites/Team/Shared%20Documents"
                },
                {
                    "id": DRIVE_ID,
                    "name": "PACS",
                    "webUrl": "https://contoso.sharepoint.com/sites/Team/PACS"
                }
            ]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v1.0/drives/{DRIVE_ID}/root")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": ROOT_ID,
            "name": "root",
            "folder": { "childCount": 0 }
        })))
        .mount(server)
        .await;
}

/// `/v1.0/drives/<drive>/items/<id>` plus `suffix`
pub fn item_path(id: &str, suffix: &str) -> String {
    format!("/v1.0/drives/{DRIVE_ID}/items/{id}{suffix}")
}

pub fn folder_json(id: &str, name: &str) -> Value {
    json!({ "id": id, "name": name, "folder": { "childCount": 0 } })
}

pub fn file_json(id: &str, name: &str, size: u64) -> Value {
    json!({ "id": id, "name": name, "size": size, "file": { "mimeType": "text/plain" } })
}

pub fn children(items: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "value": items }))
}
