//! Shared, thread-safe front end for a [`DeliveryEngine`].

use super::{AckKind, DeliveryEngine, Error};
use crate::codec::{Frame, Publish};
use crate::macros::{log_debug, log_error, log_warn};
use crate::storage::{KeyValueStore, MemoryStore};
use crate::time::{Clock, SystemClock};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[cfg(feature = "async")]
use crate::codec::Version;
#[cfg(feature = "async")]
use crate::network::{self, AsyncWrite};

/// A [`DeliveryEngine`] behind a lock, with an outbound frame channel and a
/// shared retry timer.
///
/// Every operation runs under the lock and pushes the frames it produced onto
/// the channel before releasing it, so frames leave in the order the engine
/// decided on. The channel only hands frames over; a writer task such as
/// [`run_writer`] owns the transport.
///
/// The retry timer is a single tokio task ticking every
/// `retry_interval_ms`. It runs while anything is inflight and stops when
/// the window empties. Timer operations need a tokio runtime; without one,
/// retransmission is skipped and an error is logged.
///
/// ```rust
/// use libmqtt::codec::{Publish, QoS};
/// use libmqtt::config::EngineConfig;
/// use libmqtt::delivery::{DeliveryEngine, DeliveryService};
/// use libmqtt::time::SystemClock;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let engine = DeliveryEngine::in_memory(EngineConfig::default());
/// let (service, mut outbound) = DeliveryService::new(engine, SystemClock::new());
///
/// service.enqueue(Publish::new("t/1", b"on".to_vec(), QoS::AtLeastOnce)).unwrap();
/// let frame = outbound.recv().await.unwrap();
/// assert_eq!(frame.packet_id(), Some(1));
/// # }
/// ```
#[derive(Debug)]
pub struct DeliveryService<S = MemoryStore, C = SystemClock> {
    inner: Arc<Mutex<Inner<S>>>,
    clock: C,
}

#[derive(Debug)]
struct Inner<S> {
    engine: DeliveryEngine<S>,
    outbound: UnboundedSender<Frame>,
    retry_task: Option<JoinHandle<()>>,
}

impl<S> Inner<S>
where
    S: KeyValueStore,
{
    fn send(&self, frames: Vec<Frame>) {
        for frame in frames {
            if self.outbound.send(frame).is_err() {
                log_warn!("outbound channel closed, dropping frame");
            }
        }
    }
}

impl<S, C> Clone for DeliveryService<S, C>
where
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            clock: self.clock.clone(),
        }
    }
}

/// Acquire mutex guard, ignoring poisoning
fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl<S, C> DeliveryService<S, C>
where
    S: KeyValueStore + Send + 'static,
    C: Clock + Clone + Send + Sync + 'static,
{
    /// Wrap `engine`, returning the service and the receiving end of its
    /// outbound channel.
    pub fn new(engine: DeliveryEngine<S>, clock: C) -> (Self, UnboundedReceiver<Frame>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let inner = Inner {
            engine,
            outbound,
            retry_task: None,
        };
        let service = Self {
            inner: Arc::new(Mutex::new(inner)),
            clock,
        };
        (service, rx)
    }

    /// See [`DeliveryEngine::enqueue`].
    pub fn enqueue(&self, publish: Publish) -> Result<(), Error> {
        let mut inner = lock_ignore_poison(&self.inner);
        let frames = inner.engine.enqueue(publish, self.clock.now())?;
        inner.send(frames);
        self.rearm(&mut inner);
        Ok(())
    }

    /// See [`DeliveryEngine::acknowledge`].
    pub fn acknowledge(&self, packet_id: u16, kind: AckKind) {
        let mut inner = lock_ignore_poison(&self.inner);
        let frames = inner.engine.acknowledge(packet_id, kind, self.clock.now());
        inner.send(frames);
        self.rearm(&mut inner);
    }

    /// See [`DeliveryEngine::on_connected`].
    pub fn on_connected(&self, clean_session: bool) {
        let mut inner = lock_ignore_poison(&self.inner);
        let frames = inner.engine.on_connected(clean_session, self.clock.now());
        inner.send(frames);
        self.rearm(&mut inner);
    }

    /// See [`DeliveryEngine::recover`].
    pub fn recover(&self) {
        let mut inner = lock_ignore_poison(&self.inner);
        let frames = inner.engine.recover(self.clock.now());
        inner.send(frames);
        self.rearm(&mut inner);
    }

    /// See [`DeliveryEngine::clean_all`]. Stops the retry timer.
    pub fn clean_all(&self) {
        let mut inner = lock_ignore_poison(&self.inner);
        inner.engine.clean_all();
        self.rearm(&mut inner);
    }

    /// See [`DeliveryEngine::next_packet_id`].
    pub fn next_packet_id(&self) -> Result<u16, Error> {
        lock_ignore_poison(&self.inner).engine.next_packet_id()
    }

    /// See [`DeliveryEngine::release_packet_id`].
    pub fn release_packet_id(&self, packet_id: u16) {
        lock_ignore_poison(&self.inner).engine.release_packet_id(packet_id);
    }

    /// Run `f` against the engine under the lock.
    pub fn with_engine<R>(&self, f: impl FnOnce(&DeliveryEngine<S>) -> R) -> R {
        f(&lock_ignore_poison(&self.inner).engine)
    }

    /// Whether the retry timer task is running.
    pub fn retry_running(&self) -> bool {
        lock_ignore_poison(&self.inner)
            .retry_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop the retry timer. It restarts with the next operation that leaves
    /// something inflight.
    pub fn shutdown(&self) {
        if let Some(task) = lock_ignore_poison(&self.inner).retry_task.take() {
            task.abort();
        }
    }

    fn rearm(&self, inner: &mut Inner<S>) {
        if !inner.engine.retry_armed() {
            if let Some(task) = inner.retry_task.take() {
                log_debug!("window empty, stopping retry timer");
                task.abort();
            }
            return;
        }
        if inner.retry_task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log_error!("no tokio runtime, retransmission disabled");
            return;
        };
        let period = Duration::from_millis(inner.engine.config().retry_interval_ms.max(1));
        let shared = Arc::clone(&self.inner);
        let clock = self.clock.clone();
        log_debug!("starting retry timer");
        inner.retry_task = Some(runtime.spawn(retry_loop(shared, clock, period)));
    }
}

async fn retry_loop<S, C>(inner: Arc<Mutex<Inner<S>>>, clock: C, period: Duration)
where
    S: KeyValueStore,
    C: Clock,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let mut guard = lock_ignore_poison(&inner);
        if !guard.engine.retry_armed() {
            guard.retry_task = None;
            return;
        }
        let frames = guard.engine.retry(clock.now());
        guard.send(frames);
    }
}

/// Encode every frame from `outbound` and write it to `transport`, in order,
/// until the channel closes.
///
/// Frames that fail to encode are logged and dropped. A transport failure
/// ends the writer; unacknowledged frames stay inflight for the next
/// connection.
#[cfg(feature = "async")]
pub async fn run_writer<W: AsyncWrite>(
    mut outbound: UnboundedReceiver<Frame>,
    transport: &mut W,
    version: Version,
) -> Result<(), network::Error> {
    while let Some(frame) = outbound.recv().await {
        let bytes = match frame.encode(version) {
            Ok(bytes) => bytes,
            Err(err) => {
                log_error!("dropping unencodable {}: {}", frame.packet_type(), err);
                continue;
            }
        };
        transport.write_all(&bytes).await?;
        transport
            .flush()
            .await
            .map_err(|_| network::Error::WriteError)?;
    }
    Ok(())
}
