//! Stdio transport: JSON-RPC lines on stdin, responses on stdout.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::protocol::ProtocolHandler;
use crate::types::{McpError, McpResult};

use super::control::{RunControl, RunTokens};
use super::{framing, Transport};

/// Transport for desktop MCP clients that spawn the server as a child process.
///
/// Every inbound request is handled on its own task, so a slow tool does not
/// hold up later requests. Responses go through a single writer task and may
/// leave in a different order than their requests arrived.
pub struct StdioTransport {
    handler: Arc<ProtocolHandler>,
    control: RunControl,
}

impl StdioTransport {
    pub fn new(handler: Arc<ProtocolHandler>) -> Self {
        Self {
            handler,
            control: RunControl::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    /// Run the receive loop over arbitrary streams.
    pub async fn serve_io<R, W>(&self, reader: R, writer: W, ctx: CancellationToken) -> McpResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Some(run) = self.control.begin(&ctx) else {
            return Err(McpError::AlreadyRunning(self.transport_type()));
        };
        let result = self.receive(reader, writer, run).await;
        self.control.finish();
        result
    }

    async fn receive<R, W>(&self, reader: R, writer: W, run: RunTokens) -> McpResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(write_frames(writer, rx));

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut tasks = JoinSet::new();
        let mut read_error = None;
        let shutdown = self.handler.shutdown_token();

        tracing::info!("Stdio transport started");

        loop {
            buf.clear();
            let bytes_read = tokio::select! {
                _ = run.stop.cancelled() => {
                    tracing::info!("Stdio transport stopping");
                    break;
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("Client requested shutdown");
                    break;
                }
                read = reader.read_until(b'\n', &mut buf) => match read {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::error!("Failed to read stdin: {e}");
                        read_error = Some(e);
                        break;
                    }
                },
            };

            if bytes_read == 0 {
                tracing::info!("EOF on stdin, shutting down");
                break;
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    tracing::warn!("Parse error: {e}");
                    send_error(&tx, &McpError::ParseError(format!("invalid UTF-8: {e}")));
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            match framing::parse_message(line) {
                Ok(msg) => {
                    let handler = self.handler.clone();
                    let tx = tx.clone();
                    let parent = run.force.clone();
                    tasks.spawn(async move {
                        let Some(response) = handler.handle_message(msg, &parent).await else {
                            return;
                        };
                        match framing::frame_message(&response) {
                            Ok(framed) => {
                                let _ = tx.send(framed);
                            }
                            Err(e) => tracing::error!("Failed to frame response: {e}"),
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!("Parse error: {e}");
                    send_error(&tx, &e);
                }
            }

            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = joined {
                    tracing::error!("Request task panicked: {e}");
                }
            }
        }

        // Let in-flight requests answer before the writer closes.
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Request task panicked: {e}");
            }
        }
        drop(tx);

        let written = writer_task
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;
        match read_error {
            Some(e) => Err(e.into()),
            None => written,
        }
    }
}

fn send_error(tx: &mpsc::UnboundedSender<String>, err: &McpError) {
    match framing::error_frame(err) {
        Ok(framed) => {
            let _ = tx.send(framed);
        }
        Err(e) => tracing::error!("Failed to frame error: {e}"),
    }
}

async fn write_frames<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) -> McpResult<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        writer.write_all(frame.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}

#[async_trait]
impl Transport for StdioTransport {
    async fn start(&self, ctx: CancellationToken) -> McpResult<()> {
        self.serve_io(tokio::io::stdin(), tokio::io::stdout(), ctx)
            .await
    }

    async fn stop(&self, ctx: CancellationToken) -> McpResult<()> {
        self.control.stop(ctx).await
    }

    fn transport_type(&self) -> &'static str {
        "stdio"
    }
}
