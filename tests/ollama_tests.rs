#![allow(clippy::unwrap_used, clippy::expect_used)]

use omnigen::catalog::Catalog;
use omnigen::cli::{run_command, Commands};
use omnigen::ollama;
use std::fs;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Response, Server};

/// Serve one request and return the path that was asked for.
fn serve_tags(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        let request = server.recv().unwrap();
        let url = request.url().to_string();
        let response = Response::from_string(body)
            .with_status_code(status)
            .with_header(Header::from_bytes("Content-Type", "application/json").unwrap());
        request.respond(response).unwrap();
        url
    });
    (format!("http://{addr}"), handle)
}

const TAGS: &str = r#"{"models": [
    {"name": "llama3:latest", "size": 4661224676},
    {"name": "qwen2.5-coder:7b", "size": 4683087332}
]}"#;

#[test]
fn test_fetch_models_reads_tag_listing() {
    let (host, server) = serve_tags(200, TAGS);
    let models = ollama::fetch_models(&format!("{host}/"), Duration::from_secs(5)).unwrap();
    assert_eq!(models, ["llama3:latest", "qwen2.5-coder:7b"]);
    assert_eq!(server.join().unwrap(), "/api/tags");
}

#[test]
fn test_fetch_models_reports_error_status() {
    let (host, server) = serve_tags(500, "{}");
    let err = ollama::fetch_models(&host, Duration::from_secs(5)).unwrap_err();
    assert!(err.to_string().starts_with("Failed to list Ollama models"), "{err}");
    server.join().unwrap();
}

#[test]
fn test_sync_command_updates_catalog_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.yaml");
    fs::write(
        &path,
        "providers:\n  - id: 3\n    name: Remote\n    provider: openai_compatible\n    base_url: https://api.example.com\n    api_key: sk-test\n    model_name: gpt\n",
    )
    .unwrap();
    let (host, server) = serve_tags(200, TAGS);

    let mut out = Vec::new();
    run_command(
        &Commands::SyncOllama {
            catalog: path.clone(),
            host: host.clone(),
        },
        &mut out,
    )
    .unwrap();
    server.join().unwrap();

    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["added"][1], "qwen2.5-coder:7b");
    assert_eq!(report["activated"], 4);

    let catalog = Catalog::read(&path).unwrap();
    assert_eq!(catalog.providers.len(), 3);
    let llama = &catalog.providers[1];
    assert_eq!(llama.id, 4);
    assert_eq!(llama.model_name, "llama3:latest");
    assert_eq!(llama.base_url, format!("{host}/v1"));
    assert!(llama.active);
    assert_eq!(catalog.providers.iter().filter(|p| p.active).count(), 1);
}
