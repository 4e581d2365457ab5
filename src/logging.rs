//! Tracing writer that tees formatted log lines into a broadcast channel,
//! where the `/api/logs` SSE endpoint picks them up.

use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone)]
pub(crate) struct LogBroadcastWriter {
    pub sender: tokio::sync::broadcast::Sender<String>,
}

impl<'a> MakeWriter<'a> for LogBroadcastWriter {
    type Writer = LogTee;

    fn make_writer(&'a self) -> Self::Writer {
        LogTee {
            sender: self.sender.clone(),
        }
    }
}

pub(crate) struct LogTee {
    sender: tokio::sync::broadcast::Sender<String>,
}

impl std::io::Write for LogTee {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let msg = String::from_utf8_lossy(buf).to_string();
        let _ = self.sender.send(msg); // Ignored if no receivers
        std::io::stdout().write(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stdout().flush()
    }
}
