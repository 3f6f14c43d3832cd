use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::post,
    Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageBuffer, ImageFormat, Rgb};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::process::Command;

const BIN: &str = env!("CARGO_BIN_EXE_dentascan");

#[derive(Clone)]
struct ServerState {
    status: u16,
    body: String,
    /// Requests with this 1-based index never get an answer
    stall_request: Option<usize>,
    calls: Arc<AtomicUsize>,
}

async fn handle_prediction(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    let call = state.calls.fetch_add(1, Ordering::SeqCst) + 1;
    while let Ok(Some(field)) = multipart.next_field().await {
        let _ = field.bytes().await;
    }
    if state.stall_request == Some(call) {
        std::future::pending::<()>().await;
    }
    (StatusCode::from_u16(state.status).unwrap(), state.body.clone())
}

async fn spawn_server(status: u16, body: String, stall_request: Option<usize>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
    let addr = listener.local_addr().expect("mock server address");
    let calls = Arc::new(AtomicUsize::new(0));
    let state = ServerState {
        status,
        body,
        stall_request,
        calls: Arc::clone(&calls),
    };
    let app = Router::new()
        .route("/prediction/", post(handle_prediction))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), calls)
}

fn prediction_body() -> String {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(4, 4, Rgb([255, 0, 0]));
    let mut png = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();
    format!(
        r#"{{"predicted_disease":"Caries","condition":"Moderate","confidence":"92%","advice":"See a dentist","gradcam_base64":"{}"}}"#,
        STANDARD.encode(png)
    )
}

/// A scratch directory holding a sample image and a regular file that blocks directory creation.
fn scratch(name: &str) -> (PathBuf, PathBuf, PathBuf) {
    let dir = std::env::temp_dir().join("dentascan-cli-test").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    let image = dir.join("molar.jpg");
    std::fs::write(&image, [0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3]).unwrap();
    let blocker = dir.join("cache-is-a-file");
    std::fs::write(&blocker, b"not a directory").unwrap();
    (dir, image, blocker)
}

fn dentascan(endpoint: &str, cache: &PathBuf) -> Command {
    let mut cmd = Command::new(BIN);
    cmd.arg("--endpoint")
        .arg(endpoint)
        .env("DENTASCAN_CACHE", cache.join("nested"))
        .env("NO_PROXY", "127.0.0.1,localhost")
        .env_remove("DENTASCAN_ENDPOINT")
        .env_remove("DENTASCAN_TIMEOUT_SECS")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Feeds the shell one chunk of input at a time. Before each later chunk, waits until the mock
/// server has seen that many requests.
async fn run_shell(mut cmd: Command, chunks: &[&str], calls: &AtomicUsize) -> Output {
    cmd.arg("shell").stdin(Stdio::piped());
    let mut child = cmd.spawn().expect("spawn dentascan shell");
    let mut stdin = child.stdin.take().unwrap();
    for (seen, chunk) in chunks.iter().enumerate() {
        tokio::time::timeout(Duration::from_secs(10), async {
            while calls.load(Ordering::SeqCst) < seen {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("request should reach the server");
        stdin.write_all(chunk.as_bytes()).await.unwrap();
        stdin.flush().await.unwrap();
    }
    drop(stdin);
    tokio::time::timeout(Duration::from_secs(20), child.wait_with_output())
        .await
        .expect("shell should exit promptly")
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_predict_succeeds_with_unwritable_cache() {
    let (url, _calls) = spawn_server(200, prediction_body(), None).await;
    let (_dir, image, blocker) = scratch("unwritable-cache");

    let output = dentascan(&url, &blocker)
        .arg("predict")
        .arg(&image)
        .output()
        .await
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {stderr}");
    assert!(stdout.contains("Disease: Caries"));
    assert!(stderr.contains("Could not save heatmap"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_explicit_heatmap_target_skips_cache() {
    let (url, _calls) = spawn_server(200, prediction_body(), None).await;
    let (dir, image, blocker) = scratch("explicit-target");
    let target = dir.join("gradcam.png");
    let _ = std::fs::remove_file(&target);

    let output = dentascan(&url, &blocker)
        .arg("predict")
        .arg(&image)
        .arg("--save-heatmap")
        .arg(&target)
        .output()
        .await
        .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Heatmap saved to"));
    assert!(std::fs::read(&target).unwrap().starts_with(&[0x89, b'P', b'N', b'G']));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_predict_fails_on_server_error() {
    let (url, _calls) = spawn_server(500, r#"{"detail":"boom"}"#.to_string(), None).await;
    let (_dir, image, blocker) = scratch("server-error");

    let output = dentascan(&url, &blocker)
        .arg("predict")
        .arg(&image)
        .output()
        .await
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Prediction failed. Check the server."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shell_quits_during_pending_request() {
    let (url, calls) = spawn_server(200, prediction_body(), Some(1)).await;
    let (_dir, image, blocker) = scratch("quit-while-pending");

    let mut cmd = dentascan(&url, &blocker);
    cmd.arg("--timeout").arg("300");
    let start = format!("open {}\npredict\n", image.display());
    let output = run_shell(cmd, &[&start, "quit\n"], &calls).await;

    assert!(output.status.success());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shell_close_abandons_pending_request() {
    let (url, calls) = spawn_server(200, prediction_body(), Some(1)).await;
    let (_dir, image, blocker) = scratch("close-while-pending");

    let mut cmd = dentascan(&url, &blocker);
    cmd.arg("--timeout").arg("300");
    let start = format!("open {}\npredict\n", image.display());
    // No quit: end of input lets the second request finish before the shell exits
    let restart = format!("close\nopen {}\npredict\n", image.display());
    let output = run_shell(cmd, &[&start, &restart], &calls).await;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(!stdout.contains("Still analyzing..."));
    assert!(stdout.contains("Disease: Caries"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
