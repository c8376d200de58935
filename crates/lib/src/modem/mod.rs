//! Modem service: the handlers behind each message type, the send-result correlator,
//! and the command path back to the module.
//!
//! Handlers run synchronously on the decode loop. Anything that touches storage or the
//! network is handed to [`Background`] so the next frame is decoded immediately.

mod call;
mod commands;
mod correlator;
mod sms;
mod system;

pub use commands::CommandError;
pub use correlator::{TaskStatus, TaskStatusUpdater};

use crate::background::Background;
use crate::channels::{NotificationMessage, Notifier};
use crate::device::DeviceState;
use crate::routing::MessageRouter;
use crate::serial::{CommandWriter, DecodedMessage, MessageKind};
use crate::store::MessageStore;
use commands::PendingReplies;
use std::sync::Arc;
use std::time::Duration;

type HandlerFn = fn(&ModemService, &DecodedMessage);

/// Message kind -> handler. Every known kind has exactly one entry.
const HANDLERS: [(MessageKind, HandlerFn); 13] = [
    (MessageKind::IncomingSms, ModemService::handle_incoming_sms),
    (MessageKind::SystemReady, ModemService::handle_system_ready),
    (MessageKind::Heartbeat, ModemService::handle_heartbeat),
    (MessageKind::StatusResponse, ModemService::handle_status_response),
    (
        MessageKind::CellularControlResponse,
        ModemService::handle_cellular_control_response,
    ),
    (
        MessageKind::PhoneNumberResponse,
        ModemService::handle_phone_number_response,
    ),
    (MessageKind::CmdResponse, ModemService::handle_command_response),
    (MessageKind::SmsSendResult, ModemService::handle_sms_send_result),
    (MessageKind::SimEvent, ModemService::handle_sim_event),
    (MessageKind::Warning, ModemService::handle_warning),
    (MessageKind::Error, ModemService::handle_error),
    (MessageKind::IncomingCall, ModemService::handle_incoming_call),
    (MessageKind::CallDisconnected, ModemService::handle_call_disconnected),
];

pub struct ModemService {
    store: Arc<dyn MessageStore>,
    notifier: Arc<Notifier>,
    commands: CommandWriter,
    device: DeviceState,
    pending: PendingReplies,
    background: Background,
    task_status: Option<Arc<dyn TaskStatusUpdater>>,
    command_timeout: Duration,
}

impl ModemService {
    pub fn new(
        store: Arc<dyn MessageStore>,
        notifier: Arc<Notifier>,
        commands: CommandWriter,
        background: Background,
    ) -> Self {
        Self {
            store,
            notifier,
            commands,
            device: DeviceState::new(),
            pending: PendingReplies::default(),
            background,
            task_status: None,
            command_timeout: Duration::from_secs(10),
        }
    }

    /// Propagate send outcomes to an external scheduler (e.g. a scheduled-SMS task list).
    pub fn with_task_status_updater(mut self, updater: Arc<dyn TaskStatusUpdater>) -> Self {
        self.task_status = Some(updater);
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Router with every known message type bound to this service.
    pub fn router(self: &Arc<Self>) -> MessageRouter {
        HANDLERS
            .iter()
            .fold(MessageRouter::builder(), |builder, &(kind, handler)| {
                let service = Arc::clone(self);
                builder.register(kind.tag(), move |msg: &DecodedMessage| handler(&service, msg))
            })
            .build()
    }

    pub fn device(&self) -> &DeviceState {
        &self.device
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Fan `msg` out in the background.
    fn notify(&self, msg: NotificationMessage) {
        let notifier = self.notifier.clone();
        self.background.spawn("notification", async move {
            notifier.dispatch(&msg).await;
        });
    }
}
