//! Test doubles for the realtime layer.

use super::registry::{ConnectionRegistry, SendError, Transport};
use super::rooms::RoomDirectory;
use super::router::MessageRouter;
use crate::translation::providers::fakes::{
    Behavior, FakeClassifier, FakeSpeechToText, FakeSynthesizer, FakeTranslator,
};
use crate::translation::providers::PlaceholderSynthesizer;
use crate::translation::{Adapters, TranslationCache, TranslationOrchestrator};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every frame sent to it.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<String>>,
    closed: AtomicBool,
    fail_sends: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reports open but rejects every send.
    pub fn failing() -> Arc<Self> {
        let transport = Self::default();
        transport.fail_sends.store(true, Ordering::SeqCst);
        Arc::new(transport)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect()
    }

    pub fn last(&self) -> Option<Value> {
        self.messages().pop()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Transport for RecordingTransport {
    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    fn send_text(&self, text: &str) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::Closed);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(SendError::Full);
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// A router wired to fake adapters; `translation` controls the fake translator.
pub fn router_with(translation: Behavior) -> (MessageRouter, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let adapters = Adapters {
        transcriber: Arc::new(FakeSpeechToText::new("hello", Behavior::Succeed)),
        translator: Arc::new(FakeTranslator::new(translation)),
        synthesizer: Arc::new(FakeSynthesizer::new(Behavior::Succeed)),
        classifier: Arc::new(FakeClassifier::new("EN", Behavior::Succeed)),
    };
    let orchestrator = TranslationOrchestrator::new(
        adapters,
        PlaceholderSynthesizer::new(dir.path(), "/audio"),
        Arc::new(TranslationCache::new(100, None)),
        Duration::from_secs(1),
    );

    let registry = Arc::new(ConnectionRegistry::new());
    let rooms = Arc::new(RoomDirectory::new(registry.clone()));
    let router = MessageRouter::new(registry, rooms, Arc::new(orchestrator));
    (router, dir)
}
