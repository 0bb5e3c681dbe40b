use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};
use tyspeak_core::{ErrorKind, SpeechHandler, SpeechRequest, SpeechResponse};

/// One line written back per request line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Response(SpeechResponse),
    Error {
        kind: ErrorKind,
        message: String,
        /// Always the zero response; kept so hosts can read one shape
        response: SpeechResponse,
    },
}

impl Reply {
    fn error(kind: ErrorKind, message: String) -> Self {
        Self::Error {
            kind,
            message,
            response: SpeechResponse::failure(),
        }
    }
}

/// Serve requests from stdin until it closes, one at a time.
pub async fn run_subprocess(handler: SpeechHandler) -> anyhow::Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(&handler, stdin, stdout).await
}

/// Read newline-delimited JSON requests and answer each before reading the
/// next. Bad input, including bytes that are not UTF-8, gets an
/// `invalid_request` reply; only I/O errors end the loop.
pub async fn serve<R, W>(
    handler: &SpeechHandler,
    mut reader: R,
    mut writer: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let mut handled = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let Some(reply) = answer(handler, &buf).await else {
            continue;
        };

        let json = serde_json::to_string(&reply)?;
        let json = format!("{json}\n");
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await?;
        handled += 1;
    }

    info!(handled, "Input closed, subprocess exiting");
    Ok(())
}

/// Reply for one raw input line, or `None` for a blank line.
async fn answer(handler: &SpeechHandler, raw: &[u8]) -> Option<Reply> {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line.trim(),
        Err(e) => {
            warn!("Rejecting request that is not UTF-8: {e}");
            return Some(Reply::error(ErrorKind::InvalidRequest, e.to_string()));
        }
    };
    if line.is_empty() {
        return None;
    }

    let reply = match serde_json::from_str::<SpeechRequest>(line) {
        Ok(request) => match handler.handle(request).await {
            Ok(response) => Reply::Response(response),
            Err(e) => Reply::error(e.kind(), format!("{:#}", e.cause())),
        },
        Err(e) => {
            warn!("Rejecting malformed request: {e}");
            Reply::error(ErrorKind::InvalidRequest, e.to_string())
        }
    };
    Some(reply)
}
