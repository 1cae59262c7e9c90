//! Bounded FIFO drained by a dedicated consumer thread

use crate::INTERNAL_TARGET;
use crate::registry::{CallbackRegistry, DeliveryKind};
use crate::stats::DispatchStats;
use crossbeam_channel::{
    Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError, bounded,
};
use logbridge_core::{
    AsyncOwnership, BridgeConfig, BridgeError, BridgeResult, LogLevel, OverflowPolicy,
};
use parking_lot::Mutex;
use std::cell::Cell;
use std::ffi::CString;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Name of the consumer thread
pub const CONSUMER_THREAD_NAME: &str = "logbridge-async";

/// How often a producer waiting for room re-checks for shutdown
const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(10);

thread_local! {
    static ON_CONSUMER_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// A message copied out of the producer's buffer
struct QueuedMessage {
    text: CString,
    level: LogLevel,
}

/// Async delivery path
///
/// Producers copy messages into owned buffers and push them onto a bounded
/// channel; one consumer thread pops them in FIFO order and delivers them to
/// whatever async slot is registered at delivery time.
///
/// No lock is held while a producer waits for room, so shutdown never queues
/// behind a blocked producer and the consumer never waits on shutdown.
pub struct AsyncDispatchQueue {
    sender: Mutex<Option<Sender<QueuedMessage>>>,
    closed: AtomicBool,
    // Second receiver handle, used by producers to evict under DropOldest
    // and by shutdown to discard leftovers.
    evictor: Receiver<QueuedMessage>,
    // Disconnects when the consumer thread exits.
    finished: Receiver<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
    discard: Arc<AtomicBool>,
    capacity: usize,
    policy: OverflowPolicy,
    drain_on_shutdown: bool,
    stats: Arc<DispatchStats>,
}

impl AsyncDispatchQueue {
    /// Create the queue and spawn its consumer thread
    pub fn start(
        config: &BridgeConfig,
        registry: Arc<CallbackRegistry>,
        stats: Arc<DispatchStats>,
    ) -> BridgeResult<Self> {
        let (sender, receiver) = bounded::<QueuedMessage>(config.queue_capacity);
        let (finished_tx, finished) = bounded::<()>(0);
        let evictor = receiver.clone();
        let discard = Arc::new(AtomicBool::new(false));

        let consumer = Consumer {
            receiver,
            registry,
            stats: stats.clone(),
            ownership: config.async_ownership,
            discard: discard.clone(),
            _finished: finished_tx,
        };

        let handle = thread::Builder::new()
            .name(CONSUMER_THREAD_NAME.to_string())
            .spawn(move || consumer.run())
            .map_err(|e| BridgeError::Internal(format!("failed to spawn consumer thread: {e}")))?;

        tracing::debug!(
            target: INTERNAL_TARGET,
            capacity = config.queue_capacity,
            policy = %config.overflow_policy,
            "async dispatch queue started"
        );

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            closed: AtomicBool::new(false),
            evictor,
            finished,
            worker: Mutex::new(Some(handle)),
            discard,
            capacity: config.queue_capacity,
            policy: config.overflow_policy,
            drain_on_shutdown: config.drain_on_shutdown,
            stats,
        })
    }

    /// True once shutdown has closed the queue
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Push an owned copy of a message onto the tail of the queue
    ///
    /// When the queue is full the configured [`OverflowPolicy`] applies.
    /// Enqueues made from the consumer thread itself (an async sink that
    /// logs) never block: they fail with `QueueFull` if there is no room.
    /// A producer still waiting for room when shutdown begins gets `Stopped`.
    pub fn enqueue(&self, text: CString, level: LogLevel) -> BridgeResult<()> {
        let sender = match self.open_sender() {
            Some(sender) => sender,
            None => return Err(self.stopped()),
        };

        let message = QueuedMessage { text, level };
        let result = if ON_CONSUMER_THREAD.with(Cell::get) {
            self.push_or_drop(&sender, message)
        } else {
            match self.policy {
                OverflowPolicy::Block => self.push_blocking(&sender, message, None),
                OverflowPolicy::BlockWithTimeout(ms) => {
                    let deadline = Instant::now() + Duration::from_millis(ms);
                    self.push_blocking(&sender, message, Some(deadline))
                }
                OverflowPolicy::DropNewest => self.push_or_drop(&sender, message),
                OverflowPolicy::DropOldest => self.push_evicting_oldest(&sender, message),
            }
        };

        match &result {
            Ok(()) => self.stats.record_async_enqueued(),
            Err(BridgeError::Stopped) => self.stats.record_stopped_dropped(),
            Err(_) => {}
        }
        result
    }

    /// Clone of the live sender, or `None` once the queue is closed
    fn open_sender(&self) -> Option<Sender<QueuedMessage>> {
        if self.is_closed() {
            return None;
        }
        self.sender.lock().clone()
    }

    fn stopped(&self) -> BridgeError {
        self.stats.record_stopped_dropped();
        BridgeError::Stopped
    }

    /// Wait for room until `deadline` (forever when `None`) or until shutdown
    fn push_blocking(
        &self,
        sender: &Sender<QueuedMessage>,
        mut message: QueuedMessage,
        deadline: Option<Instant>,
    ) -> BridgeResult<()> {
        loop {
            if self.is_closed() {
                return Err(BridgeError::Stopped);
            }
            let wait = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return self.push_or_drop(sender, message);
                    }
                    remaining.min(CLOSE_POLL_INTERVAL)
                }
                None => CLOSE_POLL_INTERVAL,
            };
            match sender.send_timeout(message, wait) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(returned)) => message = returned,
                Err(SendTimeoutError::Disconnected(_)) => return Err(BridgeError::Stopped),
            }
        }
    }

    fn push_or_drop(
        &self,
        sender: &Sender<QueuedMessage>,
        message: QueuedMessage,
    ) -> BridgeResult<()> {
        match sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(self.overflow()),
            Err(TrySendError::Disconnected(_)) => Err(BridgeError::Stopped),
        }
    }

    fn push_evicting_oldest(
        &self,
        sender: &Sender<QueuedMessage>,
        message: QueuedMessage,
    ) -> BridgeResult<()> {
        let message = match sender.try_send(message) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(message)) => message,
            Err(TrySendError::Disconnected(_)) => return Err(BridgeError::Stopped),
        };

        // The consumer may win the race for the head; either way a slot frees up.
        if self.evictor.try_recv().is_ok() {
            self.overflow();
        }

        self.push_or_drop(sender, message)
    }

    /// Count an overflow drop and build the matching error
    fn overflow(&self) -> BridgeError {
        let previous = self.stats.record_overflow_dropped();
        if previous == 0 || (previous + 1).is_multiple_of(1000) {
            tracing::warn!(
                target: INTERNAL_TARGET,
                dropped = previous + 1,
                capacity = self.capacity,
                policy = %self.policy,
                "async log queue full, message dropped"
            );
        }
        BridgeError::QueueFull {
            capacity: self.capacity,
        }
    }

    /// Close the queue and join the consumer thread
    ///
    /// Remaining messages are delivered when `drain_on_shutdown` is set and
    /// discarded otherwise. On `ShutdownTimeout` the consumer is still
    /// running and a later call waits for it again; `Ok` is only returned
    /// once the thread has been joined. Calling this from the consumer
    /// thread fails, since the thread cannot join itself.
    pub fn shutdown(&self, timeout: Duration) -> BridgeResult<()> {
        if ON_CONSUMER_THREAD.with(Cell::get) {
            return Err(BridgeError::Internal(
                "cannot shut down the async queue from its own consumer thread".to_string(),
            ));
        }

        if !self.drain_on_shutdown {
            self.discard.store(true, Ordering::Release);
        }

        // Producers waiting for room see the flag and give up their sender
        // clones; the channel disconnects once they have and it is empty.
        self.closed.store(true, Ordering::Release);
        drop(self.sender.lock().take());

        if !self.drain_on_shutdown {
            while self.evictor.try_recv().is_ok() {
                self.stats.record_stopped_dropped();
            }
        }

        let mut worker = self.worker.lock();
        let handle = match worker.take() {
            Some(handle) => handle,
            None => return Ok(()),
        };

        match self.finished.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                *worker = Some(handle);
                tracing::warn!(
                    target: INTERNAL_TARGET,
                    pending = self.evictor.len(),
                    "async consumer thread did not finish within {:?}",
                    timeout
                );
                return Err(BridgeError::ShutdownTimeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
        }

        if handle.join().is_err() {
            tracing::error!(
                target: INTERNAL_TARGET,
                "async consumer thread panicked during shutdown"
            );
        }

        tracing::debug!(target: INTERNAL_TARGET, "async dispatch queue stopped");
        Ok(())
    }
}

/// State moved onto the consumer thread
struct Consumer {
    receiver: Receiver<QueuedMessage>,
    registry: Arc<CallbackRegistry>,
    stats: Arc<DispatchStats>,
    ownership: AsyncOwnership,
    discard: Arc<AtomicBool>,
    // Dropped with the consumer, which disconnects the shutdown signal.
    _finished: Sender<()>,
}

impl Consumer {
    fn run(self) {
        ON_CONSUMER_THREAD.with(|flag| flag.set(true));

        // recv() keeps returning queued messages after the sender is gone and
        // errors only once the channel is both disconnected and empty.
        while let Ok(message) = self.receiver.recv() {
            if self.discard.load(Ordering::Acquire) {
                self.stats.record_stopped_dropped();
                continue;
            }
            self.deliver(message);
        }
    }

    fn deliver(&self, message: QueuedMessage) {
        // Re-check: the slot may have been replaced or removed since enqueue.
        let slot = match self.registry.current(DeliveryKind::Async) {
            Some(slot) if slot.accepts(message.level) => slot,
            _ => {
                self.stats.record_unregistered_dropped();
                return;
            }
        };

        let delivered = match self.ownership {
            AsyncOwnership::Borrowed => slot.deliver(&message.text),
            AsyncOwnership::Transferred => slot.deliver_owned(message.text),
        };

        if delivered {
            self.stats.record_async_delivered();
        } else {
            self.stats.record_unregistered_dropped();
        }
    }
}

impl Drop for AsyncDispatchQueue {
    fn drop(&mut self) {
        if self.worker.lock().is_some() {
            let _ = self.shutdown(Duration::from_secs(5));
        }
    }
}
