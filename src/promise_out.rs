//! The launching side: start a computation on a fresh thread and hand back a
//! shareable [`PromiseOut`] for its outcome.
use crate::state::{Outcome, State};
use crate::{Error, Promise};
use std::any::Any;
use std::future::Future;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;
use tracing::{debug, error, warn};

const DEFAULT_THREAD_NAME: &str = "promise-worker";

/// Handle to the eventual outcome of a launched computation.
///
/// Clones share the same state, so every clone sees the same outcome. The
/// handle can also be `.await`ed.
///
/// # Examples
///
/// ```
/// use promise_run::{launch, Promise};
/// use futures::executor::block_on;
/// use std::thread;
/// let op = launch(|| Ok::<_, ()>(String::from("🍓")));
/// let op_a = op.clone();
/// let task1 = thread::spawn(move || block_on(async {
///     println!("我等到了{:?}", op_a.await);
/// }));
/// assert_eq!(op.get_result().unwrap(), "🍓");
/// task1.join().expect("The task1 thread has panicked.");
/// ```
#[derive(Debug)]
pub struct PromiseOut<T, E> {
    state: Arc<State<T, E>>,
}

impl<T, E> Clone for PromiseOut<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Clone, E: Clone> PromiseOut<T, E> {
    /// The outcome if it is already there, `None` while pending. Never blocks.
    pub fn try_get_result(&self) -> Option<Outcome<T, E>> {
        self.state.try_get()
    }
}

impl<T: Clone, E: Clone> Promise for PromiseOut<T, E> {
    type Output = T;
    type Error = E;

    fn get_result(&self) -> Outcome<T, E> {
        self.state.get()
    }

    fn is_completed(&self) -> bool {
        self.state.is_completed()
    }

    fn wait(&self) {
        self.state.wait()
    }
}

impl<T: Clone, E: Clone> Future for PromiseOut<T, E> {
    type Output = Outcome<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.state.poll(cx.waker())
    }
}

/// Launch configuration, modeled on [`std::thread::Builder`].
///
/// ```
/// use promise_run::{Launcher, Promise};
///
/// let p = Launcher::new()
///     .name("fetcher")
///     .spawn(|| Ok::<_, ()>(std::thread::current().name().map(String::from)));
/// assert_eq!(p.get_result().unwrap().as_deref(), Some("fetcher"));
/// ```
#[derive(Debug, Clone)]
pub struct Launcher {
    name: String,
    stack_size: Option<usize>,
}

impl Default for Launcher {
    fn default() -> Self {
        Self {
            name: DEFAULT_THREAD_NAME.to_string(),
            stack_size: None,
        }
    }
}

impl Launcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name given to every worker thread this launcher starts.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Stack size in bytes for worker threads. Platform default otherwise.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Run `f` on a new thread and return a handle to its outcome at once.
    ///
    /// Never fails here: if the thread cannot be started the returned handle
    /// is already completed with [`Error::Spawn`].
    pub fn spawn<F, T, E>(&self, f: F) -> PromiseOut<T, E>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let state = Arc::new(State::new());
        if self.name.contains('\0') {
            let err = io::Error::new(
                io::ErrorKind::InvalidInput,
                "thread name may not contain interior null bytes",
            );
            error!(name = ?self.name, error = %err, "failed to spawn worker thread");
            state.complete(Err(Error::Spawn(Arc::new(err))));
            return PromiseOut { state };
        }
        let worker = state.clone();

        let mut builder = thread::Builder::new().name(self.name.clone());
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }

        debug!(name = %self.name, "launching worker");
        if let Err(err) = builder.spawn(move || {
            worker.complete(run(f));
        }) {
            error!(name = %self.name, error = %err, "failed to spawn worker thread");
            state.complete(Err(Error::Spawn(Arc::new(err))));
        }

        PromiseOut { state }
    }
}

/// Run `f` on a new thread with the default [`Launcher`].
///
/// ```
/// use promise_run::{launch, Error, Promise};
///
/// let p = launch(|| Err::<u32, _>("reject!!"));
/// assert!(matches!(p.get_result(), Err(Error::Failed("reject!!"))));
/// ```
pub fn launch<F, T, E>(f: F) -> PromiseOut<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    Launcher::default().spawn(f)
}

/// Call `f`, turning a panic into [`Error::Panicked`].
fn run<F, T, E>(f: F) -> Outcome<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result.map_err(Error::Failed),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(%message, "computation panicked");
            // the payload's own Drop may panic too
            if let Err(again) = panic::catch_unwind(AssertUnwindSafe(move || drop(payload))) {
                std::mem::forget(again);
            }
            Err(Error::Panicked(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .or_else(|| {
            payload
                .downcast_ref::<Box<dyn std::error::Error + Send + Sync>>()
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| format!("unknown panic ({:?})", (*payload).type_id()))
}

#[cfg(test)]
mod tests {
    use super::{launch, run, Launcher};
    use crate::{Error, Promise};
    use futures::executor::block_on;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_run_passes_value_and_error_through() {
        assert_eq!(run(|| Ok::<_, ()>(5)).unwrap(), 5);
        let err = run(|| Err::<(), _>(String::from("💥"))).unwrap_err();
        assert_eq!(err.into_failure().as_deref(), Some("💥"));
    }

    #[test]
    fn test_run_catches_panics() {
        let err = run(|| -> Result<(), String> { panic!("boom {}", 1) }).unwrap_err();
        assert!(err.is_panic());
        assert_eq!(err.to_string(), "panic occurred: boom 1");

        let err = run(|| -> Result<(), ()> { std::panic::panic_any(17u8) }).unwrap_err();
        assert!(matches!(err, Error::Panicked(ref msg) if msg.starts_with("unknown panic (")));

        let boxed: Box<dyn std::error::Error + Send + Sync> = "io went away".into();
        let err = run(|| -> Result<(), ()> { std::panic::panic_any(boxed) }).unwrap_err();
        assert!(matches!(err, Error::Panicked(ref msg) if msg == "io went away"));
    }

    struct BadDrop;

    impl Drop for BadDrop {
        fn drop(&mut self) {
            panic!("drop panic");
        }
    }

    #[test]
    fn test_payload_drop_panic_still_completes() {
        let p = launch(|| -> Result<u8, ()> { std::panic::panic_any(BadDrop) });
        let err = p.get_result().unwrap_err();
        assert!(err.is_panic());
        assert!(p.is_completed());
    }

    #[test]
    fn test_nul_in_name_is_a_spawn_error() {
        let p = Launcher::new()
            .name("bad\0name")
            .spawn(|| Ok::<_, ()>(1));
        assert!(p.is_completed());
        match p.get_result() {
            Err(Error::Spawn(err)) => assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput),
            other => panic!("expected a spawn error, got {:?}", other),
        }
    }

    #[test]
    fn test_spawn_failure_completes_at_once() {
        let p = Launcher::new()
            .stack_size(usize::MAX / 2)
            .spawn(|| Ok::<_, ()>(1));
        assert!(p.is_completed());
        assert!(matches!(p.get_result(), Err(Error::Spawn(_))));
        p.wait();
    }

    #[test]
    fn test_launcher_names_thread() {
        let p = Launcher::new()
            .name("named-worker")
            .stack_size(256 * 1024)
            .spawn(|| Ok::<_, ()>(thread::current().name().map(String::from)));
        assert_eq!(p.get_result().unwrap().as_deref(), Some("named-worker"));

        let p = launch(|| Ok::<_, ()>(thread::current().name().map(String::from)));
        assert_eq!(p.get_result().unwrap().as_deref(), Some("promise-worker"));
    }

    #[test]
    fn test_try_get_result() {
        let p = launch(|| {
            thread::sleep(Duration::from_millis(50));
            Ok::<_, ()>(1)
        });
        assert!(p.try_get_result().is_none());
        p.wait();
        assert_eq!(p.try_get_result().unwrap().unwrap(), 1);
    }

    #[test]
    fn test_await_promise_out() {
        let p = launch(|| {
            thread::sleep(Duration::from_millis(10));
            Ok::<_, String>(String::from("🍓"))
        });
        let p2 = p.clone();
        let task1 = thread::spawn(move || block_on(p2));
        assert_eq!(block_on(p.clone()).unwrap(), "🍓");
        assert_eq!(
            task1.join().expect("The task1 thread has panicked").unwrap(),
            "🍓"
        );
        // awaiting a completed promise is immediate
        assert_eq!(block_on(p).unwrap(), "🍓");
    }

    #[test]
    fn test_await_panicked() {
        let p = launch(|| -> Result<u8, ()> { panic!("test panic") });
        let err = block_on(p).unwrap_err();
        assert!(err.is_panic());
    }
}
