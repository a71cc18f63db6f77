#![allow(clippy::unwrap_used, clippy::expect_used)]

use omnigen::catalog::{Catalog, ProviderConfig};
use omnigen::generator::llm::{ChatRequest, Endpoint};
use omnigen::generator::{ChatClient, HttpChatClient, LlmError, LlmFallback};
use std::io::Read;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Response, Server};

struct Seen {
    url: String,
    authorization: Option<String>,
    body: serde_json::Value,
}

/// Serve exactly one request with the given status and body.
fn serve_once(status: u16, reply: String) -> (String, JoinHandle<Seen>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        let mut request = server.recv().unwrap();
        let mut body = String::new();
        request.as_reader().read_to_string(&mut body).unwrap();
        let authorization = request
            .headers()
            .iter()
            .find(|h| h.field.equiv("Authorization"))
            .map(|h| h.value.as_str().to_string());
        let seen = Seen {
            url: request.url().to_string(),
            authorization,
            body: serde_json::from_str(&body).unwrap(),
        };
        let response = Response::from_string(reply)
            .with_status_code(status)
            .with_header(Header::from_bytes("Content-Type", "application/json").unwrap());
        request.respond(response).unwrap();
        seen
    });
    (format!("http://{addr}"), handle)
}

fn completion(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

#[test]
fn test_http_client_posts_chat_completion() {
    let (base, server) = serve_once(200, completion("class User {}"));
    let client = HttpChatClient::new(Duration::from_secs(5)).unwrap();
    let endpoint = Endpoint {
        base_url: format!("{base}/v1"),
        api_key: "sk-test".to_string(),
    };

    let raw = client
        .complete(&endpoint, &ChatRequest::for_prompt("gpt-4o-mini", "make a class"))
        .unwrap();
    assert_eq!(raw, "class User {}");

    let seen = server.join().unwrap();
    assert_eq!(seen.url, "/v1/chat/completions");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer sk-test"));
    assert_eq!(seen.body["model"], "gpt-4o-mini");
    assert_eq!(seen.body["temperature"], 0.0);
    assert_eq!(seen.body["stream"], false);
    assert_eq!(seen.body["messages"][0]["role"], "system");
    assert_eq!(seen.body["messages"][1]["content"], "make a class");
}

#[test]
fn test_http_client_reports_status() {
    let (base, server) = serve_once(500, "upstream exploded".to_string());
    let client = HttpChatClient::new(Duration::from_secs(5)).unwrap();
    let endpoint = Endpoint {
        base_url: base,
        api_key: "k".to_string(),
    };

    let err = client
        .complete(&endpoint, &ChatRequest::for_prompt("m", "p"))
        .unwrap_err();
    assert_eq!(
        err,
        LlmError::Status {
            status: 500,
            body: "upstream exploded".to_string()
        }
    );
    assert!(err.to_string().starts_with("LLM Call Failed:"));
    server.join().unwrap();
}

#[test]
fn test_http_client_rejects_empty_choices() {
    let (base, server) = serve_once(200, r#"{"choices": []}"#.to_string());
    let client = HttpChatClient::new(Duration::from_secs(5)).unwrap();
    let endpoint = Endpoint {
        base_url: base,
        api_key: "k".to_string(),
    };

    let err = client
        .complete(&endpoint, &ChatRequest::for_prompt("m", "p"))
        .unwrap_err();
    assert!(matches!(err, LlmError::InvalidResponse(_)));
    server.join().unwrap();
}

#[test]
fn test_connection_refused_is_request_error() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let server = Server::http("127.0.0.1:0").unwrap();
        server.server_addr().to_ip().unwrap().port()
    };
    let client = HttpChatClient::new(Duration::from_secs(2)).unwrap();
    let endpoint = Endpoint {
        base_url: format!("http://127.0.0.1:{port}"),
        api_key: "k".to_string(),
    };
    let err = client
        .complete(&endpoint, &ChatRequest::for_prompt("m", "p"))
        .unwrap_err();
    assert!(matches!(err, LlmError::Request(_)));
}

#[test]
fn test_fallback_normalizes_url_and_sanitizes_reply() {
    let reply = "<think>\nThe user wants an entity.\n</think>\n```java\npublic class User {}\n```";
    let (base, server) = serve_once(200, completion(reply));
    let catalog = Catalog {
        groups: Vec::new(),
        providers: vec![
            ProviderConfig {
                id: 1,
                name: "remote".to_string(),
                provider: "openai_compatible".to_string(),
                base_url: "https://unused.example".to_string(),
                api_key: Some("sk-remote".to_string()),
                model_name: "gpt".to_string(),
                active: false,
            },
            ProviderConfig {
                id: 2,
                name: "local".to_string(),
                provider: "ollama".to_string(),
                base_url: format!("{base}/v1/chat/completions/"),
                api_key: None,
                model_name: "qwen2.5-coder".to_string(),
                active: true,
            },
        ],
    };
    let client = HttpChatClient::new(Duration::from_secs(5)).unwrap();

    let code = LlmFallback::new(&catalog, &client)
        .generate("Entity for user")
        .unwrap();
    assert_eq!(code, "public class User {}");

    let seen = server.join().unwrap();
    assert_eq!(seen.url, "/v1/chat/completions");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer ollama"));
    assert_eq!(seen.body["model"], "qwen2.5-coder");
}
