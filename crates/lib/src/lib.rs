//! smsgate core library: decode frames from a serial cellular module, route them to
//! typed handlers, keep SMS records, correlate send results, and fan notifications out
//! to chat webhooks and email. Used by the CLI.

pub mod background;
pub mod channels;
pub mod config;
pub mod device;
pub mod gateway;
pub mod init;
pub mod modem;
pub mod routing;
pub mod serial;
pub mod store;
