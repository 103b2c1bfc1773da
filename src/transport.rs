use super::*;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use unicode_normalization::UnicodeNormalization;

/// Field values handed to a [`Transport`], in form order, honeypot excluded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionPayload {
    entries: Vec<(String, String)>,
}

impl SubmissionPayload {
    /// Builds the payload from `(name, value)` pairs. A repeated name keeps its
    /// last value; values are NFC-normalized.
    pub fn from_entries<I, K, V>(entries: I, honeypot_name: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut payload = Self::default();
        for (name, value) in entries {
            let name = name.into();
            if name.is_empty() || name == honeypot_name {
                continue;
            }
            payload.insert(name, value.as_ref().nfc().collect());
        }
        payload
    }

    fn insert(&mut self, name: String, value: String) {
        if let Some(slot) = self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for SubmissionPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, (name, value)) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value:?}")?;
        }
        f.write_str("}")
    }
}

/// Why a dispatched submission failed. Never shown to the visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    reason: String,
}

impl TransportError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport error: {}", self.reason)
    }
}

impl StdError for TransportError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Success,
    Failure(TransportError),
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// How a transport answers a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The outcome arrives once the clock has moved `delay_ms` forward.
    After {
        delay_ms: i64,
        outcome: SubmissionOutcome,
    },
    /// The outcome arrives through [`Site::settle_submission`].
    Pending,
}

impl Dispatch {
    pub fn succeed_after(delay_ms: i64) -> Self {
        Self::After {
            delay_ms,
            outcome: SubmissionOutcome::Success,
        }
    }

    pub fn fail_after(delay_ms: i64, reason: impl Into<String>) -> Self {
        Self::After {
            delay_ms,
            outcome: SubmissionOutcome::Failure(TransportError::new(reason)),
        }
    }
}

/// Delivery of a contact-form submission. Called once per accepted submit.
pub trait Transport {
    fn submit(&mut self, payload: &SubmissionPayload) -> Dispatch;
}

/// Stand-in for a real endpoint: answers after a fixed delay and fails at a
/// fixed rate, driven by a seeded generator.
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    delay_ms: i64,
    failure_rate: f64,
    rng_state: u64,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self {
            delay_ms: 1_500,
            failure_rate: 0.1,
            rng_state: 0x9E37_79B9_7F4A_7C15,
        }
    }
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_state = if seed == 0 {
            0xA5A5_A5A5_A5A5_A5A5
        } else {
            seed
        };
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: i64) -> Self {
        self.delay_ms = delay_ms.max(0);
        self
    }

    /// Clamped to `0.0..=1.0`.
    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate.clamp(0.0, 1.0);
        self
    }

    fn next_random_f64(&mut self) -> f64 {
        // xorshift64*
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = if x == 0 { 0xA5A5_A5A5_A5A5_A5A5 } else { x };
        let out = x.wrapping_mul(0x2545_F491_4F6C_DD1D);
        // Top 53 bits to [0.0, 1.0).
        let mantissa = out >> 11;
        (mantissa as f64) * (1.0 / ((1u64 << 53) as f64))
    }
}

impl Transport for SimulatedTransport {
    fn submit(&mut self, _payload: &SubmissionPayload) -> Dispatch {
        if self.next_random_f64() >= self.failure_rate {
            Dispatch::succeed_after(self.delay_ms)
        } else {
            Dispatch::fail_after(self.delay_ms, "simulated error")
        }
    }
}

#[derive(Debug)]
struct ScriptedState {
    script: VecDeque<Dispatch>,
    fallback: Dispatch,
    received: Vec<SubmissionPayload>,
}

/// Recording transport for tests. Answers with queued dispatches first, then
/// with its fallback. Clones share the same record.
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    state: Rc<RefCell<ScriptedState>>,
}

impl ScriptedTransport {
    pub fn new(fallback: Dispatch) -> Self {
        Self {
            state: Rc::new(RefCell::new(ScriptedState {
                script: VecDeque::new(),
                fallback,
                received: Vec::new(),
            })),
        }
    }

    pub fn succeeding(delay_ms: i64) -> Self {
        Self::new(Dispatch::succeed_after(delay_ms))
    }

    pub fn failing(delay_ms: i64, reason: impl Into<String>) -> Self {
        Self::new(Dispatch::fail_after(delay_ms, reason))
    }

    pub fn pending() -> Self {
        Self::new(Dispatch::Pending)
    }

    /// Queues `dispatch` as the answer to the next unanswered submission.
    pub fn then(self, dispatch: Dispatch) -> Self {
        self.state.borrow_mut().script.push_back(dispatch);
        self
    }

    pub fn calls(&self) -> usize {
        self.state.borrow().received.len()
    }

    pub fn payloads(&self) -> Vec<SubmissionPayload> {
        self.state.borrow().received.clone()
    }

    pub fn last_payload(&self) -> Option<SubmissionPayload> {
        self.state.borrow().received.last().cloned()
    }
}

impl Transport for ScriptedTransport {
    fn submit(&mut self, payload: &SubmissionPayload) -> Dispatch {
        let mut state = self.state.borrow_mut();
        state.received.push(payload.clone());
        match state.script.pop_front() {
            Some(dispatch) => dispatch,
            None => state.fallback.clone(),
        }
    }
}
