use std::time::{Duration, Instant};

// Debounced commit of the search text. submit() arms (or re-arms) the
// deadline, poll() hands the value out exactly once after the quiescence
// window passed without another submit. The model cancels any pending
// commit on teardown.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: Option<(Instant, String)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            pending: None,
        }
    }

    pub fn submit(&mut self, value: String) {
        self.submit_at(value, Instant::now());
    }

    pub fn poll(&mut self) -> Option<String> {
        self.poll_at(Instant::now())
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn submit_at(&mut self, value: String, now: Instant) {
        self.pending = Some((now + self.window, value));
    }

    fn poll_at(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((deadline, _)) if now >= *deadline => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }
}
