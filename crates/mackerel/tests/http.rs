#![forbid(unsafe_code)]

use std::time::Duration;

use cfnmkr_core::Invocation;
use cfnmkr_mackerel::{ApiError, Client, CreateServiceParam, MackerelApi, StaticKey};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves one connection with `status` and `body`; yields the raw request text.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = sock.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if n == 0 || request_complete(&buf) {
                break;
            }
        }
        let resp = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        sock.write_all(resp.as_bytes()).await.unwrap();
        sock.shutdown().await.ok();
        String::from_utf8_lossy(&buf).into_owned()
    });
    (base, handle)
}

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some(head_end) = text.find("\r\n\r\n") else { return false };
    let len = text[..head_end]
        .lines()
        .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap_or(0)))
        .unwrap_or(0);
    buf.len() >= head_end + 4 + len
}

fn client(base: &str) -> Client { Client::new(StaticKey("secret-key".into())).unwrap().with_base_url(base).unwrap() }

#[tokio::test]
async fn sends_key_agent_and_body() {
    let (base, server) = serve_once("200 OK", r#"{"name":"web","memo":"","roles":[]}"#).await;
    let svc = client(&base).create_service(&Invocation::new(), &CreateServiceParam { name: "web".into(), memo: String::new() }).await.unwrap();
    assert_eq!(svc.name, "web");

    let req = server.await.unwrap();
    let lower = req.to_ascii_lowercase();
    assert!(req.starts_with("POST /api/v0/services HTTP/1.1"), "{}", req);
    assert!(lower.contains("x-api-key: secret-key"), "{}", req);
    assert!(lower.contains("user-agent: cfn-mackerel-macro/"), "{}", req);
    assert!(req.ends_with(r#"{"name":"web","memo":""}"#), "{}", req);
}

#[tokio::test]
async fn error_bodies_become_status_errors() {
    let (base, server) = serve_once("404 Not Found", r#"{"error":{"message":"Monitor not found"}}"#).await;
    let err = client(&base).delete_monitor(&Invocation::new(), "m1").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "status: 404, Monitor not found");
    assert!(server.await.unwrap().starts_with("DELETE /api/v0/monitors/m1 "));
}

#[tokio::test]
async fn revoke_requires_success_flag() {
    let (base, _server) = serve_once("200 OK", r#"{"success":false}"#).await;
    let err = client(&base).revoke_invitation(&Invocation::new(), "a@example.com").await.unwrap_err();
    assert!(matches!(err, ApiError::UnexpectedResponse), "err={:?}", err);
}

#[tokio::test]
async fn deadline_bounds_a_silent_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/", listener.local_addr().unwrap());
    let _hold = tokio::spawn(async move {
        let (sock, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(sock);
    });
    let inv = Invocation::with_timeout(Duration::from_millis(200));
    let err = client(&base).get_org(&inv).await.unwrap_err();
    assert!(matches!(err, ApiError::Timeout(_)), "err={:?}", err);
}

#[tokio::test]
async fn ids_are_escaped_in_the_request_line() {
    let (base, server) = serve_once("200 OK", "{}").await;
    client(&base).delete_role(&Invocation::new(), "a/b?c#d", "x y").await.unwrap();
    let req = server.await.unwrap();
    assert!(req.starts_with("DELETE /api/v0/services/a%2Fb%3Fc%23d/roles/x%20y HTTP/1.1"), "{}", req);
}
