//! Critical section guarding shared supervision state.
//!
//! Client calls and timer callbacks both mutate the registry. Every such
//! access goes through [`CriticalSection::with`], so no caller can hold the
//! lock past the closure or observe a half-spliced list.

use parking_lot::Mutex;

/// Mutual exclusion with a closure-scoped access API.
///
/// The closure must not re-enter the same critical section.
pub struct CriticalSection<T> {
    inner: Mutex<T>,
}

impl<T> CriticalSection<T> {
    /// Wrap `value`.
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Run `f` with exclusive access to the protected value.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Check whether some thread is inside the section right now.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    /// Consume the section and return the protected value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Default> Default for CriticalSection<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> std::fmt::Debug for CriticalSection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CriticalSection")
            .field("locked", &self.is_locked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_with_returns_closure_result() {
        let section = CriticalSection::new(41);
        let value = section.with(|value| {
            *value += 1;
            *value
        });
        assert_eq!(value, 42);
        assert_eq!(section.into_inner(), 42);
    }

    #[test]
    fn test_concurrent_updates_are_serialized() -> Result<(), Box<dyn std::error::Error>> {
        let section = Arc::new(CriticalSection::new(0u64));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let section = Arc::clone(&section);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        section.with(|value| *value += 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle
                .join()
                .map_err(|panic| format!("worker panicked: {panic:?}"))?;
        }

        assert_eq!(section.with(|value| *value), 8000);
        Ok(())
    }
}
