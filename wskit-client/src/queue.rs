//! The outbound frame queue: what `send` writes into while the connection
//! is not `open`, and what `flush` drains once it is.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use wskit_core::Envelope;

/// What happens to an `enqueue` call once the queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Evict the oldest queued frame, push the new one onto the tail.
    DropOldest,
    /// Discard the new frame; the queue is left unchanged.
    DropNewest,
    /// Never enqueue anything -- every `enqueue` call returns `false`.
    Off,
}

impl OverflowPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            OverflowPolicy::DropOldest => "drop-oldest",
            OverflowPolicy::DropNewest => "drop-newest",
            OverflowPolicy::Off => "off",
        }
    }
}

/// Reported to registered overflow callbacks: which policy fired and the
/// queue's configured capacity (not its current size, which is unchanged by
/// a drop-newest overflow and still at capacity after a drop-oldest one).
#[derive(Debug, Clone)]
pub struct OverflowEvent {
    pub policy: OverflowPolicy,
    pub max_size: usize,
}

type OverflowCallback = Arc<dyn Fn(&OverflowEvent) + Send + Sync>;

/// Bounded FIFO of already-encoded frames, queued while the connection is
/// not `open`, drained to the transport once it is.
///
/// `Off` still honors a capacity of zero semantically (nothing is ever kept)
/// but does not require one: the policy alone governs whether `enqueue`
/// succeeds, independent of `capacity`.
pub struct OutboundQueue {
    capacity: usize,
    policy: OverflowPolicy,
    frames: Mutex<VecDeque<Envelope>>,
    overflow_callbacks: Mutex<Vec<OverflowCallback>>,
}

impl OutboundQueue {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            capacity,
            policy,
            frames: Mutex::new(VecDeque::new()),
            overflow_callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Registers a callback invoked synchronously whenever an `enqueue`
    /// overflows. A panic inside the callback is caught and logged rather
    /// than propagated -- one misbehaving callback must not stop the others
    /// from firing or alter the drop decision already made.
    pub fn on_overflow(&self, callback: impl Fn(&OverflowEvent) + Send + Sync + 'static) {
        self.overflow_callbacks.lock().push(Arc::new(callback));
    }

    pub fn size(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }

    /// Enqueues `frame`, applying the overflow policy if the queue is
    /// already at capacity. Returns `false` if the frame was dropped
    /// (either discarded under `drop-newest`/`off`, or accepted under
    /// `drop-oldest` -- see the return value note below).
    ///
    /// `drop-oldest` still returns `true`: the new frame *was* enqueued,
    /// just at the cost of evicting the head. `drop-newest` and `off`
    /// return `false`: the new frame was not kept at all.
    pub fn enqueue(&self, frame: Envelope) -> bool {
        if matches!(self.policy, OverflowPolicy::Off) {
            return false;
        }

        let mut frames = self.frames.lock();
        if frames.len() < self.capacity {
            frames.push_back(frame);
            return true;
        }

        match self.policy {
            OverflowPolicy::DropOldest => {
                frames.pop_front();
                frames.push_back(frame);
                drop(frames);
                self.fire_overflow();
                true
            }
            OverflowPolicy::DropNewest => {
                drop(frames);
                self.fire_overflow();
                false
            }
            OverflowPolicy::Off => unreachable!("handled above"),
        }
    }

    fn fire_overflow(&self) {
        let event = OverflowEvent {
            policy: self.policy,
            max_size: self.capacity,
        };
        for callback in self.overflow_callbacks.lock().iter() {
            let callback = callback.clone();
            let event_ref = &event;
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(event_ref);
            }));
            if outcome.is_err() {
                tracing::warn!("outbound queue overflow callback panicked");
            }
        }
    }

    /// Drains the queue in FIFO order, handing each frame to `send_frame`.
    /// Returns the number of frames successfully sent. On the first
    /// transport failure, draining stops immediately: the frames already
    /// popped (including the one that failed) are gone, not re-queued --
    /// at-most-once delivery after enqueue.
    pub async fn flush<F, Fut>(&self, mut send_frame: F) -> usize
    where
        F: FnMut(Envelope) -> Fut,
        Fut: std::future::Future<Output = Result<(), String>>,
    {
        let mut sent = 0;
        loop {
            let frame = {
                let mut frames = self.frames.lock();
                frames.pop_front()
            };
            let Some(frame) = frame else {
                break;
            };
            match send_frame(frame).await {
                Ok(()) => sent += 1,
                Err(_) => break,
            }
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wskit_core::Envelope;

    fn frame(ty: &str) -> Envelope {
        Envelope::new(ty)
    }

    #[test]
    fn drop_oldest_evicts_head_and_reports_overflow() {
        let queue = OutboundQueue::new(3, OverflowPolicy::DropOldest);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        queue.on_overflow(move |event| {
            assert_eq!(event.policy, OverflowPolicy::DropOldest);
            assert_eq!(event.max_size, 3);
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        for ty in ["m1", "m2", "m3", "m4"] {
            assert!(queue.enqueue(frame(ty)));
        }

        assert_eq!(queue.size(), 3);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_newest_discards_the_new_frame() {
        let queue = OutboundQueue::new(2, OverflowPolicy::DropNewest);
        assert!(queue.enqueue(frame("m1")));
        assert!(queue.enqueue(frame("m2")));
        assert!(!queue.enqueue(frame("m3")));
        assert_eq!(queue.size(), 2);
    }

    #[test]
    fn off_policy_never_enqueues() {
        let queue = OutboundQueue::new(10, OverflowPolicy::Off);
        assert!(!queue.enqueue(frame("m1")));
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn one_callback_panicking_does_not_stop_the_others() {
        let queue = OutboundQueue::new(1, OverflowPolicy::DropOldest);
        let second_fired = Arc::new(AtomicUsize::new(0));
        let second_fired_clone = second_fired.clone();
        queue.on_overflow(|_| panic!("boom"));
        queue.on_overflow(move |_| {
            second_fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        queue.enqueue(frame("m1"));
        queue.enqueue(frame("m2"));

        assert_eq!(second_fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn flush_drains_fifo_and_stops_at_first_failure() {
        let queue = OutboundQueue::new(5, OverflowPolicy::DropOldest);
        for ty in ["m1", "m2", "m3"] {
            queue.enqueue(frame(ty));
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let sent = queue
            .flush(|frame| {
                let seen = seen_clone.clone();
                async move {
                    if frame.ty == "m2" {
                        return Err("transport down".to_string());
                    }
                    seen.lock().push(frame.ty);
                    Ok(())
                }
            })
            .await;

        assert_eq!(sent, 1);
        assert_eq!(*seen.lock(), vec!["m1"]);
        assert_eq!(queue.size(), 0, "drained frames are gone, not re-queued");
    }
}
