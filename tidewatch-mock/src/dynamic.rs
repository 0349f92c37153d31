use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tidewatch_core::{
    ProviderDescriptor, ProviderResponse, ShipmentPayload, TrackingError, TrackingKind,
    TrackingProvider,
};

use crate::fixtures::shipment_for;

/// Instruction for how one call should behave.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Answer with a complete payload.
    Return(ShipmentPayload),
    /// Answer with a partial payload.
    Partial(ShipmentPayload),
    /// Fail with the provided error.
    Fail(TrackingError),
    /// Never answer (simulate a stalled provider).
    Hang,
    /// Wait, then behave as the inner instruction.
    Delay(Duration, Box<MockBehavior>),
}

#[derive(Default)]
struct InternalState {
    default: Option<MockBehavior>,
    per_number: HashMap<String, MockBehavior>,
    queue: VecDeque<MockBehavior>,
    requests: Vec<(String, TrackingKind)>,
}

/// Handle used by tests to drive a [`ScriptedProvider`] from the outside.
#[derive(Clone)]
pub struct ScriptedController {
    state: Arc<Mutex<InternalState>>,
    available: Arc<AtomicBool>,
}

impl ScriptedController {
    /// Behavior for calls with no more specific rule. Unset means fixture data.
    pub async fn set_default(&self, behavior: MockBehavior) {
        self.state.lock().await.default = Some(behavior);
    }

    /// Behavior for calls about `number`.
    pub async fn set_for(&self, number: &str, behavior: MockBehavior) {
        self.state
            .lock()
            .await
            .per_number
            .insert(number.to_string(), behavior);
    }

    /// One-shot behavior for the next call, ahead of any other rule. Queued
    /// behaviors are consumed in order.
    pub async fn push_next(&self, behavior: MockBehavior) {
        self.state.lock().await.queue.push_back(behavior);
    }

    /// Whether the provider reports a configured credential.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Calls received so far.
    pub async fn call_count(&self) -> usize {
        self.state.lock().await.requests.len()
    }

    /// Every `(number, kind)` requested so far, in order.
    pub async fn requests(&self) -> Vec<(String, TrackingKind)> {
        self.state.lock().await.requests.clone()
    }

    /// Clear all rules and the request log.
    pub async fn clear(&self) {
        *self.state.lock().await = InternalState::default();
    }
}

/// A provider that defers all behavior to a [`ScriptedController`].
pub struct ScriptedProvider {
    descriptor: ProviderDescriptor,
    state: Arc<Mutex<InternalState>>,
    available: Arc<AtomicBool>,
}

impl ScriptedProvider {
    /// Create the provider and its controller.
    #[must_use]
    pub fn new_with_controller(
        descriptor: ProviderDescriptor,
    ) -> (Arc<dyn TrackingProvider>, ScriptedController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let available = Arc::new(AtomicBool::new(true));
        let controller = ScriptedController {
            state: Arc::clone(&state),
            available: Arc::clone(&available),
        };
        let me = Arc::new(Self {
            descriptor,
            state,
            available,
        });
        (me as Arc<dyn TrackingProvider>, controller)
    }
}

async fn perform(mut behavior: MockBehavior) -> Result<ProviderResponse, TrackingError> {
    loop {
        match behavior {
            MockBehavior::Return(p) => return Ok(ProviderResponse::Complete(p)),
            MockBehavior::Partial(p) => return Ok(ProviderResponse::Partial(p)),
            MockBehavior::Fail(e) => return Err(e),
            MockBehavior::Hang => return std::future::pending().await,
            MockBehavior::Delay(d, inner) => {
                tokio::time::sleep(d).await;
                behavior = *inner;
            }
        }
    }
}

#[async_trait]
impl TrackingProvider for ScriptedProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn track_shipment(
        &self,
        tracking_number: &str,
        kind: TrackingKind,
    ) -> Result<ProviderResponse, TrackingError> {
        // Pick the behavior without holding the lock across the call.
        let behavior = {
            let mut guard = self.state.lock().await;
            guard.requests.push((tracking_number.to_string(), kind));
            guard
                .queue
                .pop_front()
                .or_else(|| guard.per_number.get(tracking_number).cloned())
                .or_else(|| guard.default.clone())
        };
        match behavior {
            Some(b) => perform(b).await,
            None => Ok(ProviderResponse::Complete(shipment_for(
                tracking_number,
                kind,
            ))),
        }
    }
}
