//! Integration test: run the gateway on a free port over an in-memory serial link and drive it
//! through HTTP while the test plays the module. The server task is left running when a test ends.

use lib::config::{Config, GatewayAuthMode};
use lib::gateway;
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf};

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

fn temp_config_dir() -> (PathBuf, PathBuf) {
    let dir = std::env::temp_dir().join(format!("smsgate-gateway-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let config_path = dir.join("config.json");
    std::fs::File::create(&config_path)
        .and_then(|mut f| f.write_all(b"{}"))
        .expect("write config.json");
    (dir, config_path)
}

/// The far end of the serial link.
struct FakeModule {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl FakeModule {
    /// Next command of type `typ`, skipping the status polls the gateway sends on its own.
    async fn expect_command(&mut self, typ: &str) -> Value {
        let wait = async {
            loop {
                let line = self
                    .lines
                    .next_line()
                    .await
                    .expect("read command")
                    .expect("link closed");
                let cmd: Value = serde_json::from_str(&line).expect("command is JSON");
                if cmd["type"] == typ {
                    return cmd;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .unwrap_or_else(|_| panic!("no {} command within 5s", typ))
    }

    async fn emit(&mut self, frame: Value) {
        let mut line = frame.to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await.expect("write frame");
    }
}

struct Gateway {
    base: String,
    client: reqwest::Client,
    module: FakeModule,
    _dir: PathBuf,
}

async fn start_gateway(configure: impl FnOnce(&mut Config)) -> Gateway {
    let port = free_port();
    let (dir, config_path) = temp_config_dir();

    let mut config = Config::default();
    config.gateway.port = port;
    config.gateway.bind = "127.0.0.1".to_string();
    config.serial.command_timeout_secs = 2;
    configure(&mut config);

    let (gateway_end, module_end) = tokio::io::duplex(64 * 1024);
    let (gw_read, gw_write) = tokio::io::split(gateway_end);
    let (mod_read, mod_write) = tokio::io::split(module_end);
    tokio::spawn(async move {
        let _ = gateway::serve(config, config_path, BufReader::new(gw_read), gw_write).await;
    });

    let base = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();
    let mut last_err = None;
    for _ in 0..100 {
        match client.get(format!("{}/", base)).send().await {
            Ok(resp) if resp.status().is_success() => {
                return Gateway {
                    base,
                    client,
                    module: FakeModule {
                        lines: BufReader::new(mod_read).lines(),
                        writer: mod_write,
                    },
                    _dir: dir,
                };
            }
            Ok(_) => {}
            Err(e) => last_err = Some(e),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("gateway on port {} did not come up within 5s; last error: {:?}", port, last_err);
}

impl Gateway {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn messages(&self) -> Vec<Value> {
        self.client
            .get(self.url("/api/messages"))
            .send()
            .await
            .expect("GET messages")
            .json()
            .await
            .expect("messages JSON")
    }
}

#[tokio::test]
async fn health_reports_running_and_port() {
    let gw = start_gateway(|_| {}).await;
    let json: Value = gw
        .client
        .get(gw.url("/"))
        .send()
        .await
        .expect("GET /")
        .json()
        .await
        .expect("parse JSON");
    assert_eq!(json["runtime"], "running");
    assert!(json["port"].as_u64().is_some());
}

#[tokio::test]
async fn send_sms_round_trip_through_module() {
    let mut gw = start_gateway(|_| {}).await;

    let resp = gw
        .client
        .post(gw.url("/api/serial/sms"))
        .json(&json!({ "to": "+15550001", "content": "hello" }))
        .send()
        .await
        .expect("POST sms");
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.expect("response JSON");
    let request_id = body["requestId"].as_str().expect("requestId").to_string();

    let cmd = gw.module.expect_command("send_sms").await;
    assert_eq!(cmd["to"], "+15550001");
    assert_eq!(cmd["content"], "hello");
    assert_eq!(cmd["request_id"], request_id.as_str());

    let records = gw.messages().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], request_id.as_str());
    assert_eq!(records[0]["status"], "pending");
    assert_eq!(records[0]["direction"], "outgoing");

    gw.module
        .emit(json!({
            "type": "sms_send_result",
            "success": true,
            "to": "+15550001",
            "request_id": request_id.as_str(),
        }))
        .await;

    for _ in 0..100 {
        let records = gw.messages().await;
        if records[0]["status"] == "sent" {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("record {} never became sent", request_id);
}

#[tokio::test]
async fn incoming_sms_is_listed() {
    let mut gw = start_gateway(|_| {}).await;
    gw.module
        .emit(json!({
            "type": "incoming_sms",
            "timestamp": 1_700_000_000,
            "from": "+15550002",
            "content": "ping",
        }))
        .await;

    for _ in 0..100 {
        let records = gw.messages().await;
        if let Some(r) = records.first() {
            assert_eq!(r["from"], "+15550002");
            assert_eq!(r["content"], "ping");
            assert_eq!(r["status"], "received");
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("incoming sms never showed up in /api/messages");
}

#[tokio::test]
async fn send_sms_rejects_bad_bodies() {
    let gw = start_gateway(|_| {}).await;

    let missing_to = gw
        .client
        .post(gw.url("/api/serial/sms"))
        .json(&json!({ "content": "hello" }))
        .send()
        .await
        .expect("POST sms");
    assert_eq!(missing_to.status(), reqwest::StatusCode::BAD_REQUEST);

    let not_json = gw
        .client
        .post(gw.url("/api/serial/sms"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("POST sms");
    assert_eq!(not_json.status(), reqwest::StatusCode::BAD_REQUEST);

    assert!(gw.messages().await.is_empty());
}

#[tokio::test]
async fn flymode_waits_for_module_confirmation() {
    let mut gw = start_gateway(|_| {}).await;

    let client = gw.client.clone();
    let url = gw.url("/api/serial/flymode");
    let call = tokio::spawn(async move {
        client
            .post(url)
            .json(&json!({ "enabled": true }))
            .send()
            .await
            .expect("POST flymode")
            .status()
    });

    let cmd = gw.module.expect_command("set_flymode").await;
    assert_eq!(cmd["enabled"], true);
    gw.module
        .emit(json!({
            "type": "cellular_control_response",
            "success": true,
            "request_id": cmd["request_id"],
        }))
        .await;

    assert!(call.await.expect("join").is_success());
    let status: Value = gw
        .client
        .get(gw.url("/api/serial/status"))
        .send()
        .await
        .expect("GET status")
        .json()
        .await
        .expect("status JSON");
    assert_eq!(status["flymode"], true);
}

#[tokio::test]
async fn flymode_rejection_is_an_error() {
    let mut gw = start_gateway(|_| {}).await;

    let client = gw.client.clone();
    let url = gw.url("/api/serial/flymode");
    let call = tokio::spawn(async move {
        let resp = client
            .post(url)
            .json(&json!({ "enabled": false }))
            .send()
            .await
            .expect("POST flymode");
        let status = resp.status();
        let body: Value = resp.json().await.expect("error JSON");
        (status, body)
    });

    let cmd = gw.module.expect_command("set_flymode").await;
    gw.module
        .emit(json!({
            "type": "cmd_response",
            "success": false,
            "error": "modem busy",
            "request_id": cmd["request_id"],
        }))
        .await;

    let (status, body) = call.await.expect("join");
    assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap_or("").contains("modem busy"));
}

#[tokio::test]
async fn api_requires_token_when_configured() {
    let gw = start_gateway(|c| {
        c.gateway.auth.mode = GatewayAuthMode::Token;
        c.gateway.auth.token = Some("s3cret".to_string());
    })
    .await;

    let anonymous = gw
        .client
        .get(gw.url("/api/messages"))
        .send()
        .await
        .expect("GET messages");
    assert_eq!(anonymous.status(), reqwest::StatusCode::UNAUTHORIZED);

    let authorized = gw
        .client
        .get(gw.url("/api/messages"))
        .bearer_auth("s3cret")
        .send()
        .await
        .expect("GET messages");
    assert!(authorized.status().is_success());
}
