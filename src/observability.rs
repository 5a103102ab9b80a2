use biometrics::{Collector, Counter, Moments};

pub(crate) static WEBHOOK_REQUESTS: Counter = Counter::new("voicehook.webhook.requests");
pub(crate) static WEBHOOK_REQUEST_ERRORS: Counter =
    Counter::new("voicehook.webhook.request_errors");
pub(crate) static WEBHOOK_REQUEST_DURATION: Moments =
    Moments::new("voicehook.webhook.request_duration_seconds");

pub(crate) static TEXT_TURNS: Counter = Counter::new("voicehook.turns.text");
pub(crate) static VOICE_TURNS: Counter = Counter::new("voicehook.turns.voice");
pub(crate) static TURN_FAILURES: Counter = Counter::new("voicehook.turns.failures");
pub(crate) static EMPTY_REPLIES: Counter = Counter::new("voicehook.turns.empty_replies");

pub(crate) static PLAYBACKS: Counter = Counter::new("voicehook.audio.playbacks");
pub(crate) static PLAYBACK_ERRORS: Counter = Counter::new("voicehook.audio.playback_errors");
pub(crate) static CAPTURES: Counter = Counter::new("voicehook.audio.captures");
pub(crate) static CAPTURE_BYTES: Counter = Counter::new("voicehook.audio.capture_bytes");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&WEBHOOK_REQUESTS);
    collector.register_counter(&WEBHOOK_REQUEST_ERRORS);
    collector.register_moments(&WEBHOOK_REQUEST_DURATION);

    collector.register_counter(&TEXT_TURNS);
    collector.register_counter(&VOICE_TURNS);
    collector.register_counter(&TURN_FAILURES);
    collector.register_counter(&EMPTY_REPLIES);

    collector.register_counter(&PLAYBACKS);
    collector.register_counter(&PLAYBACK_ERRORS);
    collector.register_counter(&CAPTURES);
    collector.register_counter(&CAPTURE_BYTES);
}
