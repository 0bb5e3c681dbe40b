use tracing_subscriber;
use tyspeak_core::{
    pipeline::mock::{MockBehavior, MockServices, MockSynthesizer},
    RelayConfig, SpeechHandler,
};

pub const QUEUE_URL: &str = "https://sqs.us-east-1.amazonaws.com/123456789012/tts-ready";
pub const BUCKET: &str = "tts-audio";

pub struct Fixture {
    pub handler: SpeechHandler,
    pub services: MockServices,
}

impl Fixture {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::with_services(MockServices::new())
    }

    #[allow(dead_code)]
    pub fn with_synthesis_behavior(behavior: MockBehavior) -> Self {
        let mut services = MockServices::new();
        services.synthesizer = MockSynthesizer::new(behavior);
        Self::with_services(services)
    }

    #[allow(dead_code)]
    pub fn with_services(services: MockServices) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let config = RelayConfig::new(QUEUE_URL, BUCKET);
        let handler = services.handler(config);
        Self { handler, services }
    }
}
