use lambda_runtime::{Error, LambdaEvent};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tyspeak_core::{SpeechHandler, SpeechRequest, SpeechResponse};

/// Answer one Lambda invocation. A failed step is returned as the invocation
/// error, carrying the service's own message; the runtime reports it in place
/// of a response.
pub async fn invoke(
    handler: &SpeechHandler,
    event: LambdaEvent<SpeechRequest>,
) -> Result<SpeechResponse, Error> {
    let (request, context) = event.into_parts();
    info!(request_id = %context.request_id, "Invocation received");

    handler.handle(request).await.map_err(|e| {
        error!(request_id = %context.request_id, kind = %e.kind(), "{e}");
        Error::from(e)
    })
}

pub fn setup_tracing() {
    use tracing_subscriber::fmt;

    // CloudWatch adds its own timestamps and does not render colors
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(false)
                .without_time()
                .with_target(true),
        )
        .with(filter)
        .init();
}
