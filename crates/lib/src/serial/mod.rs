//! Serial link to the cellular module.
//!
//! The module speaks newline-delimited JSON: every inbound line is an object with a
//! `type` tag, every outbound command is one object per line. Lines are decoded into
//! [`DecodedMessage`] values and handed to the router by the decode loop.

mod command;
mod link;
mod message;

pub use command::Command;
pub use link::{
    open_device, run_decode_loop, spawn_writer, CommandWriter, DeviceReader, DeviceWriter, LinkError,
};
pub use message::{
    CallDisconnected, CommandReply, DecodedMessage, FrameError, IncomingCall, IncomingSms,
    MessageKind, ModuleNotice, PayloadError, PhoneNumberReport, SimEvent, SmsSendResult,
};
