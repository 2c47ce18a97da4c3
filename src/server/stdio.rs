//! Newline-delimited JSON-RPC over stdin/stdout

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::McpServer;
use crate::protocol::JsonRpcResponse;
use crate::{Error, Result};

/// Serve requests read from `reader`, writing responses to `writer`.
///
/// Each request runs on its own task; responses are written by a single task
/// in completion order. Returns when the input closes or the server's
/// shutdown token is cancelled.
pub async fn serve_stdio<R, W>(server: McpServer, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<JsonRpcResponse>(64);
    let writer_task = tokio::spawn(write_responses(writer, rx));

    let shutdown = server.shutdown_token().clone();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut in_flight = JoinSet::new();

    info!("Serving MCP over stdio");
    let outcome = loop {
        buf.clear();
        let read = tokio::select! {
            () = shutdown.cancelled() => break Ok(()),
            read = reader.read_until(b'\n', &mut buf) => read,
        };
        match read {
            Ok(0) => {
                debug!("stdin closed");
                break Ok(());
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "Failed to read from stdin");
                break Err(Error::from(e));
            }
        }

        // Raw bytes: invalid UTF-8 is answered with a parse error
        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }
        let message = line.to_vec();

        let server = server.clone();
        let tx = tx.clone();
        in_flight.spawn(async move {
            if let Some(response) = server.handle_message(&message).await {
                if tx.send(response).await.is_err() {
                    error!("Response writer closed");
                }
            }
        });

        while in_flight.try_join_next().is_some() {}
    };

    while in_flight.join_next().await.is_some() {}
    drop(tx);

    let written = writer_task
        .await
        .map_err(|e| Error::Internal(format!("Writer task failed: {e}")))?;
    outcome.and(written)
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::Receiver<JsonRpcResponse>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_vec(&response)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
    }
    Ok(())
}
