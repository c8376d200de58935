//! Line I/O on the serial device: the decode loop (module -> router) and the command writer (service -> module).

use crate::routing::MessageRouter;
use crate::serial::command::Command;
use crate::serial::message::DecodedMessage;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream,
    ReadHalf, WriteHalf,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const WRITE_QUEUE: usize = 32;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("serial link closed")]
    Closed,
    #[error("encoding command: {0}")]
    Encode(#[from] serde_json::Error),
}

const READ_TIMEOUT: Duration = Duration::from_millis(500);
const BRIDGE_BUFFER: usize = 16 * 1024;

/// Module output as lines, and the sink for commands.
pub type DeviceReader = BufReader<ReadHalf<DuplexStream>>;
pub type DeviceWriter = WriteHalf<DuplexStream>;

/// Open the tty at `baud_rate`, 8 data bits, 1 stop bit, no parity.
///
/// The port is blocking, so it is driven by two pump threads bridged onto an in-memory
/// duplex; the returned halves behave like any other async stream.
pub async fn open_device(path: &Path, baud_rate: u32) -> std::io::Result<(DeviceReader, DeviceWriter)> {
    let name = path.to_string_lossy().into_owned();
    let port = serialport::new(name, baud_rate)
        .timeout(READ_TIMEOUT)
        .data_bits(serialport::DataBits::Eight)
        .stop_bits(serialport::StopBits::One)
        .parity(serialport::Parity::None)
        .flow_control(serialport::FlowControl::None)
        .open()?;
    let writer = port.try_clone()?;
    Ok(bridge_blocking(port, writer))
}

/// Pump a blocking reader/writer pair through a duplex. Must be called inside a tokio runtime.
///
/// The read pump stops at EOF, on a read error, or once the async side is dropped; a
/// read timeout just means the module was quiet. The write pump stops when the async
/// writer is dropped or the device refuses a write.
pub(crate) fn bridge_blocking<R, W>(mut device_in: R, mut device_out: W) -> (DeviceReader, DeviceWriter)
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let (near, far) = tokio::io::duplex(BRIDGE_BUFFER);
    let (near_read, near_write) = tokio::io::split(near);
    let (mut far_read, mut far_write) = tokio::io::split(far);
    let handle = Handle::current();

    let read_handle = handle.clone();
    std::thread::spawn(move || {
        let mut buf = [0u8; 1024];
        loop {
            let n = match device_in.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => continue,
                Err(e) => {
                    log::error!("serial: read failed: {}", e);
                    break;
                }
            };
            if read_handle.block_on(far_write.write_all(&buf[..n])).is_err() {
                break;
            }
        }
        log::debug!("serial: read pump stopped");
    });

    std::thread::spawn(move || {
        let mut buf = [0u8; 1024];
        loop {
            let n = match handle.block_on(far_read.read(&mut buf)) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            if let Err(e) = device_out.write_all(&buf[..n]).and_then(|_| device_out.flush()) {
                log::error!("serial: write to device failed: {}", e);
                break;
            }
        }
        log::debug!("serial: write pump stopped");
    });

    (BufReader::new(near_read), near_write)
}

/// Read lines until EOF, routing each decodable frame. Undecodable lines are logged and skipped.
///
/// Routing is synchronous; handlers hand slow work to background tasks, so the next
/// line is read as soon as the handler returns.
pub async fn run_decode_loop<R>(reader: R, router: &MessageRouter) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match DecodedMessage::parse(trimmed) {
            Ok(msg) => router.route(msg),
            Err(e) => log::warn!("serial: dropping undecodable frame ({}): {}", e, trimmed),
        }
    }
    log::info!("serial: link reached EOF, decode loop stopped");
    Ok(())
}

/// Cloneable handle that queues commands for the writer task.
#[derive(Clone)]
pub struct CommandWriter {
    tx: mpsc::Sender<String>,
}

impl CommandWriter {
    /// A writer whose lines land in the returned receiver instead of a device (tests, dry runs).
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub async fn send(&self, command: &Command) -> Result<(), LinkError> {
        let line = command.to_line()?;
        log::debug!("serial: -> {}", line.trim_end());
        self.tx.send(line).await.map_err(|_| LinkError::Closed)
    }
}

/// Spawn the task that drains queued commands into `writer`. The task ends when every
/// [`CommandWriter`] clone is dropped or a write fails.
pub fn spawn_writer<W>(mut writer: W) -> (CommandWriter, JoinHandle<()>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (commands, mut rx) = CommandWriter::channel(WRITE_QUEUE);
    let handle = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            let res = async {
                writer.write_all(line.as_bytes()).await?;
                writer.flush().await
            }
            .await;
            if let Err(e) = res {
                log::error!("serial: write failed, stopping writer: {}", e);
                return;
            }
        }
        log::debug!("serial: command queue closed, writer stopped");
    });
    (commands, handle)
}
