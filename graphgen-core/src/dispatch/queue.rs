//! A bounded multi-producer, multi-consumer queue with blocking push.

use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use crate::error::DispatchError;

/// Result of a timed [`BoundedQueue::pop`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Popped<T> {
    Item(T),
    /// Nothing arrived within the timeout.
    Idle,
    /// The queue is closed and empty.
    Drained,
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

pub(crate) struct BoundedQueue<T> {
    capacity: usize,
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> BoundedQueue<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Pushes `item`, blocking while the queue is full.
    ///
    /// Gives the item back when the queue closes or `deadline` passes first.
    pub(crate) fn push(
        &self,
        item: T,
        deadline: Option<Instant>,
    ) -> Result<(), (T, DispatchError)> {
        let started = Instant::now();
        let mut state = self.lock();
        loop {
            if state.closed {
                return Err((item, DispatchError::Closed));
            }
            if state.items.len() < self.capacity {
                state.items.push_back(item);
                drop(state);
                self.not_empty.notify_one();
                return Ok(());
            }
            state = match deadline {
                None => self
                    .not_full
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err((
                            item,
                            DispatchError::TimedOut {
                                waited: now - started,
                            },
                        ));
                    }
                    self.not_full
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Waits up to `timeout` for an item.
    pub(crate) fn pop(&self, timeout: Duration) -> Popped<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Popped::Item(item);
            }
            if state.closed {
                return Popped::Drained;
            }
            let now = Instant::now();
            if now >= deadline {
                return Popped::Idle;
            }
            state = self
                .not_empty
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Stops accepting items and wakes every waiter.
    ///
    /// Items already queued can still be popped.
    pub(crate) fn close(&self) {
        self.lock().closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Removes every queued item.
    pub(crate) fn drain(&self) -> Vec<T> {
        let items: Vec<T> = self.lock().items.drain(..).collect();
        self.not_full.notify_all();
        items
    }

    // No operation leaves the state half-updated, so a poisoned lock still
    // guards consistent data.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn pop_returns_items_in_fifo_order() {
        let queue = BoundedQueue::new(4);
        for item in 1..=3 {
            queue.push(item, None).expect("queue has space");
        }
        let popped: Vec<_> = (0..3).map(|_| queue.pop(Duration::ZERO)).collect();
        assert_eq!(popped, [Popped::Item(1), Popped::Item(2), Popped::Item(3)]);
        assert_eq!(queue.pop(Duration::from_millis(5)), Popped::Idle);
    }

    #[test]
    fn push_times_out_when_full_and_returns_the_item() {
        let queue = BoundedQueue::new(1);
        queue.push("first", None).expect("queue has space");
        let deadline = Instant::now() + Duration::from_millis(20);
        let (item, error) = queue.push("second", Some(deadline)).expect_err("queue is full");
        assert_eq!(item, "second");
        assert!(matches!(error, DispatchError::TimedOut { .. }));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn close_rejects_pushes_but_keeps_queued_items() {
        let queue = BoundedQueue::new(2);
        queue.push(7, None).expect("queue has space");
        queue.close();
        let (item, error) = queue.push(8, None).expect_err("queue is closed");
        assert_eq!((item, error), (8, DispatchError::Closed));
        assert_eq!(queue.pop(Duration::ZERO), Popped::Item(7));
        assert_eq!(queue.pop(Duration::from_secs(5)), Popped::Drained);
    }

    #[test]
    fn blocked_push_resumes_once_space_frees() {
        let queue = Arc::new(BoundedQueue::new(1));
        queue.push(1, None).expect("queue has space");
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(2, None))
        };
        thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop(Duration::ZERO), Popped::Item(1));
        producer
            .join()
            .expect("producer panicked")
            .expect("push succeeds once space frees");
        assert_eq!(queue.pop(Duration::from_secs(5)), Popped::Item(2));
    }

    #[test]
    fn close_wakes_blocked_producers() {
        let queue = Arc::new(BoundedQueue::new(1));
        queue.push(1, None).expect("queue has space");
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(2, None))
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        let (item, error) = producer
            .join()
            .expect("producer panicked")
            .expect_err("queue closed while blocked");
        assert_eq!((item, error), (2, DispatchError::Closed));
        assert_eq!(queue.drain(), [1]);
    }

    #[test]
    fn a_poisoned_lock_keeps_the_queue_usable() {
        let queue = Arc::new(BoundedQueue::new(2));
        queue.push(1, None).expect("queue has space");
        let poisoner = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let _guard = queue.lock();
                panic!("poison the queue lock");
            })
        };
        assert!(poisoner.join().is_err());
        assert!(queue.state.is_poisoned());

        queue.push(2, None).expect("poisoned queue still accepts items");
        assert_eq!(queue.pop(Duration::ZERO), Popped::Item(1));
        assert_eq!(queue.pop(Duration::ZERO), Popped::Item(2));
    }
}
