use std::fmt;

use super::Middleware;
use crate::error::MiddlewareError;

type Hook<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Runs optional callbacks with the previous and then the next state.
pub struct DebugHooks<T> {
    before: Option<Hook<T>>,
    after: Option<Hook<T>>,
}

/// Create a middleware that hands `prev` to `before` and `next` to `after`.
///
/// Use [`DebugHooks::before`] or [`DebugHooks::after`] when only one side is
/// needed.
pub fn debug<T, B, A>(before: B, after: A) -> DebugHooks<T>
where
    B: Fn(&T) + Send + Sync + 'static,
    A: Fn(&T) + Send + Sync + 'static,
{
    DebugHooks {
        before: Some(Box::new(before)),
        after: Some(Box::new(after)),
    }
}

impl<T> DebugHooks<T> {
    pub fn before<F>(before: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self {
            before: Some(Box::new(before)),
            after: None,
        }
    }

    pub fn after<F>(after: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self {
            before: None,
            after: Some(Box::new(after)),
        }
    }
}

impl<T> fmt::Debug for DebugHooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugHooks")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

impl<T> Middleware<T> for DebugHooks<T> {
    fn call(&self, prev: &T, next: &mut T) -> Result<(), MiddlewareError> {
        if let Some(before) = &self.before {
            before(prev);
        }
        if let Some(after) = &self.after {
            after(next);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "debug"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn hooks_see_prev_then_next() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let before_seen = seen.clone();
        let after_seen = seen.clone();

        let middleware = debug(
            move |prev: &i32| before_seen.lock().unwrap().push(("before", *prev)),
            move |next: &i32| after_seen.lock().unwrap().push(("after", *next)),
        );
        middleware.call(&1, &mut 2).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![("before", 1), ("after", 2)]);
    }

    #[test]
    fn missing_hooks_are_skipped() {
        let seen = Arc::new(Mutex::new(None));
        let after_seen = seen.clone();

        let middleware = DebugHooks::after(move |next: &i32| *after_seen.lock().unwrap() = Some(*next));
        middleware.call(&1, &mut 7).unwrap();

        assert_eq!(*seen.lock().unwrap(), Some(7));
    }
}
