//! Blocking helpers over many promises at once.
use crate::{Error, Promise};

/// Block until every promise in `promises` is completed.
///
/// ```
/// use promise_run::{launch, wait_all, Promise};
///
/// let ps: Vec<_> = (0..4).map(|i| launch(move || Ok::<_, ()>(i))).collect();
/// wait_all(&ps);
/// assert!(ps.iter().all(|p| p.is_completed()));
/// ```
pub fn wait_all<'a, P, I>(promises: I)
where
    P: Promise + 'a,
    I: IntoIterator<Item = &'a P>,
{
    for promise in promises {
        promise.wait();
    }
}

/// Block until every promise is completed and collect the outcomes, in the
/// order of `promises`.
///
/// A failed or panicked computation only shows up in its own slot; the others
/// are collected regardless.
///
/// ```
/// use promise_run::{launch, when_all, PromiseOut};
///
/// let ps: Vec<PromiseOut<i32, &str>> = vec![launch(|| Ok(1)), launch(|| Err("no")), launch(|| Ok(3))];
/// let results = when_all(&ps);
/// assert_eq!(results[0].as_ref().ok(), Some(&1));
/// assert!(results[1].is_err());
/// assert_eq!(results[2].as_ref().ok(), Some(&3));
/// ```
pub fn when_all<'a, P, I>(promises: I) -> Vec<Result<P::Output, Error<P::Error>>>
where
    P: Promise + 'a,
    I: IntoIterator<Item = &'a P>,
{
    promises
        .into_iter()
        .map(|promise| promise.get_result())
        .collect()
}
