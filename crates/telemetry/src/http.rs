use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use simcore::{Model, TelemetryFrame};
use ureq::Agent;

use crate::source::deliver;
use crate::{
    FrameBuffer, FrameCallback, IngestFilter, SubscriptionId, TelemetrySnapshot, TelemetrySource,
    Verdict, DEFAULT_FRAME_CAPACITY,
};

/// Configuration for the HTTP polling source.
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Base address of the relay API; the latest-frame resource is
    /// `{api_url}/telemetry`.
    pub api_url: String,
    /// Time between polls. Shorter means fresher frames, more requests.
    pub polling_interval: Duration,
    /// Retained window of accepted frames.
    pub buffer_capacity: usize,
    /// Per-request timeout; a hung server stalls at most one tick.
    pub request_timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        HttpSourceConfig {
            api_url: "http://localhost:3001/api".to_string(),
            polling_interval: Duration::from_millis(100), // 10 Hz
            buffer_capacity: DEFAULT_FRAME_CAPACITY,
            request_timeout: Duration::from_secs(2),
        }
    }
}

/// Mutex poisoning only happens if a holder panicked; the pipeline's state
/// is valid after any partial operation, so recover the guard.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cancellation token for the polling thread: doubles as the inter-tick
/// timer so `disconnect` wakes a sleeping tick immediately.
#[derive(Default)]
struct ShutdownToken {
    stopped: Mutex<bool>,
    signal: Condvar,
}

impl ShutdownToken {
    fn stop(&self) {
        *lock(&self.stopped) = true;
        self.signal.notify_all();
    }

    fn rearm(&self) {
        *lock(&self.stopped) = false;
    }

    fn is_stopped(&self) -> bool {
        *lock(&self.stopped)
    }

    /// Sleep for `timeout` or until stopped, whichever comes first.
    /// Returns whether the token is stopped.
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = lock(&self.stopped);
        while !*stopped {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            stopped = self
                .signal
                .wait_timeout(stopped, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *stopped
    }
}

/// Filter and buffer share a lock: a verdict and its buffer append must be
/// atomic with respect to `clear_buffer` and `initial_data`.
struct Ingest {
    filter: IngestFilter,
    buffer: FrameBuffer,
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    accepted: Vec<(SubscriptionId, FrameCallback)>,
    ignored: Vec<(SubscriptionId, FrameCallback)>,
}

impl Subscribers {
    fn next(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId::new(self.next_id)
    }
}

fn snapshot(callbacks: &[(SubscriptionId, FrameCallback)]) -> Vec<FrameCallback> {
    callbacks.iter().map(|(_, callback)| Arc::clone(callback)).collect()
}

struct Shared {
    ingest: Mutex<Ingest>,
    subscribers: Mutex<Subscribers>,
    shutdown: ShutdownToken,
}

/// Telemetry source that polls a latest-frame HTTP resource.
///
/// One polling thread issues a blocking `GET` per tick, so ticks are
/// serialized by construction: a slow response delays the next tick rather
/// than racing it, and the dedup/ordering state can never be clobbered by a
/// stale in-flight result. Transient transport failures are logged and the
/// loop continues at the next interval; nothing here terminates the
/// pipeline.
pub struct HttpTelemetrySource {
    config: HttpSourceConfig,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HttpTelemetrySource {
    pub fn new(config: HttpSourceConfig) -> Self {
        let shared = Shared {
            ingest: Mutex::new(Ingest {
                filter: IngestFilter::new(),
                buffer: FrameBuffer::new(config.buffer_capacity),
            }),
            subscribers: Mutex::new(Subscribers::default()),
            shutdown: ShutdownToken::default(),
        };
        HttpTelemetrySource {
            config,
            shared: Arc::new(shared),
            worker: Mutex::new(None),
        }
    }

    /// Start polling. Idempotent: calling while already connected is a
    /// no-op. Resets dedup/ordering state so the stream starts fresh; the
    /// first poll fires immediately.
    pub fn connect(&self) {
        let mut worker = lock(&self.worker);
        if worker.is_some() {
            return;
        }

        self.shared.shutdown.rearm();
        lock(&self.shared.ingest).filter.reset();

        let shared = Arc::clone(&self.shared);
        let url = format!("{}/telemetry", self.config.api_url.trim_end_matches('/'));
        let interval = self.config.polling_interval;
        let timeout = self.config.request_timeout;
        info!("polling {url} every {interval:?}");

        *worker = Some(thread::spawn(move || {
            let agent = ureq::AgentBuilder::new()
                .timeout_connect(timeout)
                .timeout(timeout)
                .build();
            loop {
                if shared.shutdown.is_stopped() {
                    break;
                }
                poll_once(&agent, &url, &shared);
                if shared.shutdown.wait(interval) {
                    break;
                }
            }
            debug!("telemetry polling stopped");
        }));
    }

    /// Stop polling and join the polling thread. After this returns no
    /// further tick fires and no state is mutated; an in-flight response is
    /// discarded. Safe to call repeatedly, including from inside a
    /// subscriber callback.
    pub fn disconnect(&self) {
        self.shared.shutdown.stop();
        if let Some(handle) = lock(&self.worker).take() {
            // Callbacks run on the polling thread; a subscriber stopping
            // the source from inside one must not join its own thread. The
            // loop exits on its own once the stop flag is set.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.worker).is_some() && !self.shared.shutdown.is_stopped()
    }

    /// Empty the retained window and forget the ordering watermark, so a
    /// subsequent frame with any `t` — even one smaller than previously
    /// seen — starts a fresh stream.
    pub fn clear_buffer(&self) {
        let mut ingest = lock(&self.shared.ingest);
        ingest.buffer.clear();
        ingest.filter.reset_ordering();
    }

    pub fn buffer_len(&self) -> usize {
        lock(&self.shared.ingest).buffer.len()
    }

    pub fn last_accepted_t(&self) -> Option<f64> {
        lock(&self.shared.ingest).filter.last_accepted_t()
    }
}

fn poll_once(agent: &Agent, url: &str, shared: &Shared) {
    let response = match agent.get(url).call() {
        Ok(response) => response,
        Err(err) => {
            warn!("telemetry poll failed: {err}");
            return;
        }
    };

    // No data published yet; not an error.
    if response.status() == 204 {
        return;
    }

    let body = match response.into_string() {
        Ok(body) => body,
        Err(err) => {
            warn!("telemetry body read failed: {err}");
            return;
        }
    };
    let snapshot: TelemetrySnapshot = match serde_json::from_str(&body) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!("telemetry decode failed: {err}");
            return;
        }
    };

    // A response that lands after disconnect is discarded, not applied.
    if shared.shutdown.is_stopped() {
        return;
    }

    let verdict = {
        let mut ingest = lock(&shared.ingest);
        let verdict = ingest.filter.offer(&snapshot);
        if let Verdict::Accepted(frame) = verdict {
            ingest.buffer.push(frame);
        }
        verdict
    };

    // Registration lists are snapshotted before delivery so a subscriber
    // can call back into the source without deadlocking.
    match verdict {
        Verdict::Accepted(frame) => {
            let callbacks = self::snapshot(&lock(&shared.subscribers).accepted);
            deliver(&callbacks, &frame, "accepted");
        }
        Verdict::Stale(frame) => {
            warn!("ignoring out-of-order frame t={}", frame.t);
            let callbacks = self::snapshot(&lock(&shared.subscribers).ignored);
            deliver(&callbacks, &frame, "ignored");
        }
        Verdict::Duplicate => {}
        Verdict::Malformed => {
            debug!("dropping telemetry frame without a numeric t");
        }
    }
}

impl TelemetrySource for HttpTelemetrySource {
    fn initial_data(&self) -> Vec<TelemetryFrame> {
        lock(&self.shared.ingest).buffer.to_vec()
    }

    fn subscribe_accepted(&self, callback: FrameCallback) -> SubscriptionId {
        let mut subscribers = lock(&self.shared.subscribers);
        let id = subscribers.next();
        subscribers.accepted.push((id, callback));
        id
    }

    fn subscribe_ignored(&self, callback: FrameCallback) -> SubscriptionId {
        let mut subscribers = lock(&self.shared.subscribers);
        let id = subscribers.next();
        subscribers.ignored.push((id, callback));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscribers = lock(&self.shared.subscribers);
        subscribers.accepted.retain(|(registered, _)| *registered != id);
        subscribers.ignored.retain(|(registered, _)| *registered != id);
    }

    fn disconnect(&self) {
        HttpTelemetrySource::disconnect(self);
    }
}

impl Drop for HttpTelemetrySource {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = HttpSourceConfig::default();
        assert_eq!(config.api_url, "http://localhost:3001/api");
        assert_eq!(config.polling_interval, Duration::from_millis(100));
        assert_eq!(config.buffer_capacity, DEFAULT_FRAME_CAPACITY);
    }

    #[test]
    fn shutdown_token_wakes_waiters() {
        let token = Arc::new(ShutdownToken::default());
        let waiter = {
            let token = Arc::clone(&token);
            thread::spawn(move || {
                let started = Instant::now();
                // Far longer than the test will take unless stop() wakes it
                assert!(token.wait(Duration::from_secs(30)));
                started.elapsed()
            })
        };
        thread::sleep(Duration::from_millis(20));
        token.stop();
        let waited = waiter.join().unwrap();
        assert!(waited < Duration::from_secs(5));
    }

    #[test]
    fn clear_buffer_resets_ordering_only() {
        let source = HttpTelemetrySource::new(HttpSourceConfig::default());
        {
            let mut ingest = lock(&source.shared.ingest);
            let snapshot = TelemetrySnapshot {
                t: Some(2.0),
                server_timestamp: Some(1.0),
                ..Default::default()
            };
            assert!(matches!(ingest.filter.offer(&snapshot), Verdict::Accepted(_)));
            ingest.buffer.push(TelemetryFrame { t: 2.0, ..Default::default() });
        }
        assert_eq!(source.buffer_len(), 1);
        assert_eq!(source.last_accepted_t(), Some(2.0));

        source.clear_buffer();
        assert_eq!(source.buffer_len(), 0);
        assert_eq!(source.last_accepted_t(), None);
    }
}
