//! Forwarding of child output to the log.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Spawn a task copying each line of `stream` to the log until EOF.
pub fn spawn_drain<R>(label: &'static str, stream: R) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => info!(target: "simlink::server", stream = label, "{}", line),
                Ok(None) => break,
                Err(e) => {
                    warn!(stream = label, error = %e, "Child output read failed");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_ends_at_eof() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let task = spawn_drain("stdout", reader);

        tokio::io::AsyncWriteExt::write_all(&mut writer, b"node started\npartial")
            .await
            .unwrap();
        drop(writer);

        tokio::time::timeout(std::time::Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
    }
}
