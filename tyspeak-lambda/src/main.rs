use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::info;
use tyspeak_core::{aws, RelayConfig, SpeechRequest};
use tyspeak_lambda::{invoke, setup_tracing};

#[tokio::main]
async fn main() -> Result<(), Error> {
    setup_tracing();

    // Built once per cold start and reused by every warm invocation
    let config = RelayConfig::from_env()?;
    info!(
        "Lambda startup: bucket={}, queue_url={}",
        config.bucket_name, config.queue_url
    );
    let handler = aws::build_handler(config).await;
    let handler = &handler;

    run(service_fn(move |event: LambdaEvent<SpeechRequest>| async move {
        invoke(handler, event).await
    }))
    .await
}
