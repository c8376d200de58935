//! Frames routed through the modem service: persistence, notifications, and send-result correlation.
//! Uses an in-memory store, a recording webhook sender, and tracked background work.

use async_trait::async_trait;
use lib::background::Background;
use lib::channels::{
    ChannelConfig, ChannelKind, ChannelSender, NotificationKind, NotificationMessage, Notifier,
    Payload, SendError, SenderRegistry,
};
use lib::modem::{ModemService, TaskStatus, TaskStatusUpdater};
use lib::routing::MessageRouter;
use lib::serial::{CommandWriter, DecodedMessage, MessageKind};
use lib::store::{Direction, JsonMessageStore, MessageStatus, MessageStore, StoreError, TextMessage};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

struct RecordingSender {
    sent: Arc<Mutex<Vec<NotificationMessage>>>,
}

#[async_trait]
impl ChannelSender for RecordingSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn send(&self, _settings: &serde_json::Value, payload: Payload<'_>) -> Result<(), SendError> {
        let Payload::Structured(msg) = payload else {
            panic!("webhook channel should get the structured message");
        };
        self.sent.lock().unwrap().push(msg.clone());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingUpdater {
    calls: Mutex<Vec<(String, TaskStatus)>>,
}

#[async_trait]
impl TaskStatusUpdater for RecordingUpdater {
    async fn update(&self, request_id: &str, status: TaskStatus) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push((request_id.to_string(), status));
        Ok(())
    }
}

/// Every write fails as if the disk were gone.
struct FailingStore;

#[async_trait]
impl MessageStore for FailingStore {
    async fn save(&self, _message: &TextMessage) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("disk gone")))
    }

    async fn update_status(&self, _id: &str, _status: MessageStatus) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("disk gone")))
    }

    async fn get(&self, _id: &str) -> Result<Option<TextMessage>, StoreError> {
        Ok(None)
    }

    async fn list(&self, _limit: usize) -> Result<Vec<TextMessage>, StoreError> {
        Ok(Vec::new())
    }
}

struct Harness {
    router: MessageRouter,
    background: Background,
    store: Arc<dyn MessageStore>,
    sent: Arc<Mutex<Vec<NotificationMessage>>>,
    updater: Arc<RecordingUpdater>,
    _commands: mpsc::Receiver<String>,
}

impl Harness {
    fn new() -> Self {
        Self::with_store(Arc::new(JsonMessageStore::in_memory()))
    }

    fn with_store(store: Arc<dyn MessageStore>) -> Self {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let updater = Arc::new(RecordingUpdater::default());
        let channels = vec![ChannelConfig::new("webhook", true, json!({ "url": "unused" }))];
        let notifier = Arc::new(Notifier::new(
            Arc::new(channels),
            SenderRegistry::new().with(RecordingSender { sent: sent.clone() }),
        ));
        let (commands, rx) = CommandWriter::channel(16);
        let background = Background::tracked();
        let service = Arc::new(
            ModemService::new(store.clone(), notifier, commands, background.clone())
                .with_task_status_updater(updater.clone()),
        );
        Self {
            router: service.router(),
            background,
            store,
            sent,
            updater,
            _commands: rx,
        }
    }

    async fn route(&self, line: &str) {
        self.router.route(DecodedMessage::parse(line).expect("valid frame"));
        self.background.wait_idle().await;
    }

    fn notifications(&self) -> Vec<NotificationMessage> {
        self.sent.lock().unwrap().clone()
    }

    fn task_updates(&self) -> Vec<(String, TaskStatus)> {
        self.updater.calls.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn every_known_type_has_a_handler() {
    let h = Harness::new();
    for kind in MessageKind::ALL {
        assert!(h.router.handles(kind.tag()), "no handler for {}", kind.tag());
    }
    assert_eq!(h.router.tags().len(), MessageKind::ALL.len());
}

#[tokio::test]
async fn incoming_sms_is_stored_and_notified_once() {
    let h = Harness::new();
    h.route(r#"{"type":"incoming_sms","timestamp":1700000000,"from":"+10000000000","content":"hello"}"#)
        .await;

    let records = h.store.list(10).await.expect("list");
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.direction, Direction::Incoming);
    assert_eq!(r.status, MessageStatus::Received);
    assert_eq!(r.content, "hello");
    assert_eq!(r.from, "+10000000000");
    assert!(!r.id.is_empty());

    let sent = h.notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::Sms);
    assert_eq!(sent[0].from, "+10000000000");
    assert_eq!(sent[0].content, "hello");
    assert_eq!(sent[0].timestamp, 1_700_000_000);
}

#[tokio::test]
async fn malformed_sms_is_dropped() {
    let h = Harness::new();
    h.route(r#"{"type":"incoming_sms","timestamp":"yesterday","from":"+1","content":"x"}"#)
        .await;
    assert!(h.store.list(10).await.expect("list").is_empty());
    assert!(h.notifications().is_empty());
}

#[tokio::test]
async fn successful_send_result_marks_record_sent() {
    let h = Harness::new();
    h.store
        .save(&TextMessage::outgoing("R1", "+1555", "hi"))
        .await
        .expect("seed");

    h.route(r#"{"type":"sms_send_result","success":true,"to":"+1555","request_id":"R1"}"#)
        .await;

    let r = h.store.get("R1").await.expect("get").expect("record");
    assert_eq!(r.status, MessageStatus::Sent);
    assert_eq!(h.task_updates(), vec![("R1".to_string(), TaskStatus::Success)]);
    assert!(h.notifications().is_empty());
}

#[tokio::test]
async fn failed_send_result_marks_failed_and_notifies_once() {
    let h = Harness::new();
    h.store
        .save(&TextMessage::outgoing("R1", "+1555", "hi"))
        .await
        .expect("seed");

    h.route(r#"{"type":"sms_send_result","success":false,"to":"+1555","request_id":"R1"}"#)
        .await;

    let r = h.store.get("R1").await.expect("get").expect("record");
    assert_eq!(r.status, MessageStatus::Failed);
    assert_eq!(h.task_updates(), vec![("R1".to_string(), TaskStatus::Failed)]);
    let sent = h.notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::Sms);
    assert_eq!(sent[0].from, "system");
    assert_eq!(sent[0].content, "send failed: +1555");
}

#[tokio::test]
async fn send_result_without_request_id_changes_nothing() {
    let h = Harness::new();
    h.store
        .save(&TextMessage::outgoing("R1", "+1555", "hi"))
        .await
        .expect("seed");

    h.route(r#"{"type":"sms_send_result","success":false,"to":"+1555"}"#).await;
    h.route(r#"{"type":"sms_send_result","success":true,"to":"+1555","request_id":""}"#)
        .await;

    let r = h.store.get("R1").await.expect("get").expect("record");
    assert_eq!(r.status, MessageStatus::Pending);
    assert!(h.task_updates().is_empty());
    assert!(h.notifications().is_empty());
}

#[tokio::test]
async fn duplicate_send_result_is_idempotent() {
    let h = Harness::new();
    h.store
        .save(&TextMessage::outgoing("R1", "+1555", "hi"))
        .await
        .expect("seed");
    let frame = r#"{"type":"sms_send_result","success":true,"to":"+1555","request_id":"R1"}"#;

    h.route(frame).await;
    let once = h.store.get("R1").await.expect("get").expect("record");
    h.route(frame).await;
    let twice = h.store.get("R1").await.expect("get").expect("record");

    assert_eq!(once, twice);
    assert_eq!(twice.status, MessageStatus::Sent);
}

#[tokio::test]
async fn send_result_for_unknown_record_still_reports_task_status() {
    let h = Harness::new();
    h.route(r#"{"type":"sms_send_result","success":true,"to":"+1555","request_id":"gone"}"#)
        .await;
    assert_eq!(h.task_updates(), vec![("gone".to_string(), TaskStatus::Success)]);
}

#[tokio::test]
async fn incoming_call_notifies_and_disconnect_does_not() {
    let h = Harness::new();
    h.route(r#"{"type":"incoming_call","timestamp":1700000000,"from":"+1555"}"#)
        .await;
    h.route(r#"{"type":"call_disconnected","timestamp":1700000030}"#).await;

    let sent = h.notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::Call);
    assert_eq!(sent[0].from, "+1555");
    assert!(sent[0].content.is_empty());
    assert!(h.store.list(10).await.expect("list").is_empty());
}

#[tokio::test]
async fn unknown_type_is_ignored() {
    let h = Harness::new();
    h.route(r#"{"type":"firmware_debug","level":3}"#).await;
    assert!(h.notifications().is_empty());
    assert!(h.store.list(10).await.expect("list").is_empty());
}

#[tokio::test]
async fn sim_change_notifies_operators() {
    let h = Harness::new();
    h.route(r#"{"type":"sim_event","state":"removed"}"#).await;
    h.route(r#"{"type":"sim_event","state":"removed"}"#).await;

    let sent = h.notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::System);
    assert!(sent[0].content.contains("removed"));
}

#[tokio::test]
async fn sms_missing_fields_is_still_stored_and_notified() {
    let h = Harness::new();
    h.route(r#"{"type":"incoming_sms","from":"+10000000000","content":"hello"}"#)
        .await;

    let records = h.store.list(10).await.expect("list");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].content, "hello");
    let sent = h.notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].timestamp, 0);
}

#[tokio::test]
async fn null_request_id_changes_nothing() {
    let h = Harness::new();
    h.store
        .save(&TextMessage::outgoing("R1", "+1555", "hi"))
        .await
        .expect("seed");

    h.route(r#"{"type":"sms_send_result","success":false,"to":"+1555","request_id":null}"#)
        .await;

    let r = h.store.get("R1").await.expect("get").expect("record");
    assert_eq!(r.status, MessageStatus::Pending);
    assert!(h.task_updates().is_empty());
    assert!(h.notifications().is_empty());
}

#[tokio::test]
async fn store_failure_does_not_block_notification() {
    let h = Harness::with_store(Arc::new(FailingStore));
    h.route(r#"{"type":"incoming_sms","timestamp":1700000000,"from":"+1555","content":"hello"}"#)
        .await;

    let sent = h.notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].content, "hello");
}

#[tokio::test]
async fn store_failure_does_not_block_task_status() {
    let h = Harness::with_store(Arc::new(FailingStore));
    h.route(r#"{"type":"sms_send_result","success":true,"to":"+1555","request_id":"R1"}"#)
        .await;

    assert_eq!(h.task_updates(), vec![("R1".to_string(), TaskStatus::Success)]);
}

#[tokio::test]
async fn sim_event_with_several_keys_uses_state() {
    let h = Harness::new();
    h.route(r#"{"type":"sim_event","state":"ready","event":"inserted"}"#).await;

    let sent = h.notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].content, "SIM state: ready");
}
