//! Gateway: HTTP control plane.
//!
//! Single port serving health, SMS sending, module status and control, and the
//! message record list. Owns the serial link while running.

mod protocol;
mod server;

pub use protocol::{ApiError, MessagesQuery, SendSmsRequest, SendSmsResponse, SetFlymodeRequest};
pub use server::{router, run_gateway, serve, GatewayState};
