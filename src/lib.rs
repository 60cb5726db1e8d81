//! Launch a computation on its own thread and collect its outcome later.
//!
//! [`launch`] returns a [`PromiseOut`] right away. Any number of clones of the
//! handle may block on it with [`Promise::get_result`] or [`Promise::wait`],
//! peek with [`Promise::is_completed`], or `.await` it from async code. A
//! panic inside the computation never reaches the consumers: it is turned
//! into [`Error::Panicked`].
//!
//! # Examples
//!
//! ```
//! use promise_run::{launch, Promise};
//! use std::thread;
//!
//! let answer = launch(|| Ok::<_, String>(6 * 7));
//! let answer2 = answer.clone();
//! let task1 = thread::spawn(move || answer2.get_result());
//! assert_eq!(answer.get_result().unwrap(), 42);
//! assert_eq!(task1.join().expect("The task1 thread has panicked").unwrap(), 42);
//! ```
use std::sync::Arc;
use thiserror::Error;

pub mod combinator;
pub mod promise_out;
mod state;

pub use combinator::{wait_all, when_all};
pub use promise_out::{launch, Launcher, PromiseOut};

/// Why a launched computation produced no value.
#[derive(Debug, Clone, Error)]
pub enum Error<E> {
    /// The computation returned this error itself.
    #[error("{0}")]
    Failed(E),
    /// The computation panicked; holds the panic message, or the payload's
    /// type id when it carries no message.
    #[error("panic occurred: {0}")]
    Panicked(String),
    /// The worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] Arc<std::io::Error>),
}

impl<E> Error<E> {
    /// Whether the computation panicked.
    pub fn is_panic(&self) -> bool {
        matches!(self, Error::Panicked(_))
    }

    /// Whether the computation returned an error of its own.
    pub fn is_failure(&self) -> bool {
        matches!(self, Error::Failed(_))
    }

    /// The computation's own error, if that is what this is.
    pub fn failure(&self) -> Option<&E> {
        match self {
            Error::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Like [`Error::failure`], by value.
    pub fn into_failure(self) -> Option<E> {
        match self {
            Error::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// The consumer side of a launched computation.
///
/// Every method may be called from any thread, any number of times. Once a
/// promise is completed it stays completed and always yields the same outcome.
pub trait Promise {
    type Output;
    type Error;

    /// Block until the computation is done and return its outcome.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_run::{launch, Error, Promise};
    ///
    /// let p = launch(|| -> Result<(), String> { panic!("💥") });
    /// assert!(matches!(p.get_result(), Err(Error::Panicked(msg)) if msg == "💥"));
    /// ```
    fn get_result(&self) -> Result<Self::Output, Error<Self::Error>>;

    /// Whether the outcome is already stored. Never blocks.
    fn is_completed(&self) -> bool;

    /// Block until the computation is done.
    fn wait(&self);
}
