//! Write-once completion cell shared by every handle of one launched
//! computation.
use crate::Error;
use parking_lot::{Condvar, Mutex};
use std::task::{Poll, Waker};
use tracing::trace;

pub(crate) type Outcome<T, E> = Result<T, Error<E>>;

#[derive(Debug)]
pub(crate) struct State<T, E> {
    inner: Mutex<Inner<T, E>>,
    done: Condvar,
}

#[derive(Debug)]
struct Inner<T, E> {
    /// `None` while pending. Written once, never taken.
    outcome: Option<Outcome<T, E>>,
    /// Async consumers parked on this state.
    wakers: Vec<Waker>,
}

impl<T, E> State<T, E> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                outcome: None,
                wakers: vec![],
            }),
            done: Condvar::new(),
        }
    }

    /// Store `outcome` and release every waiter. Only the first call has any
    /// effect; returns whether this call was it.
    pub(crate) fn complete(&self, outcome: Outcome<T, E>) -> bool {
        let mut inner = self.inner.lock();
        if inner.outcome.is_some() {
            return false;
        }
        trace!(success = outcome.is_ok(), "storing outcome");
        inner.outcome = Some(outcome);
        for waker in inner.wakers.drain(..) {
            waker.wake()
        }
        self.done.notify_all();
        true
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.inner.lock().outcome.is_some()
    }

    pub(crate) fn wait(&self) {
        let mut inner = self.inner.lock();
        while inner.outcome.is_none() {
            self.done.wait(&mut inner);
        }
    }
}

impl<T: Clone, E: Clone> State<T, E> {
    pub(crate) fn get(&self) -> Outcome<T, E> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(ref outcome) = inner.outcome {
                return outcome.clone();
            }
            self.done.wait(&mut inner);
        }
    }

    pub(crate) fn try_get(&self) -> Option<Outcome<T, E>> {
        self.inner.lock().outcome.clone()
    }

    pub(crate) fn poll(&self, waker: &Waker) -> Poll<Outcome<T, E>> {
        let mut inner = self.inner.lock();
        match inner.outcome {
            Some(ref outcome) => Poll::Ready(outcome.clone()),
            None => {
                if !inner.wakers.iter().any(|w| w.will_wake(waker)) {
                    inner.wakers.push(waker.clone());
                }
                Poll::Pending
            }
        }
    }
}
