use std::sync::{Mutex, OnceLock, PoisonError};

/// Lazily-initialized, process-wide model slot.
///
/// The first caller runs the loader while holding the init lock; concurrent
/// first callers wait on that lock and then see the loaded value. Once
/// loaded, reads go through the `OnceLock` without locking. A failed load
/// leaves the slot empty so the next call tries again.
pub struct ModelHandle<T> {
    cell: OnceLock<T>,
    init_lock: Mutex<()>,
}

impl<T> ModelHandle<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// The loaded model, if any.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Return the model, loading it with `init` on first use.
    pub fn get_or_try_init<E, F>(&self, init: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(model) = self.cell.get() {
            return Ok(model);
        }

        // The lock guards no data, so a poisoned lock is still usable.
        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(model) = self.cell.get() {
            return Ok(model);
        }

        let model = init()?;
        Ok(self.cell.get_or_init(|| model))
    }
}

impl<T> Default for ModelHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn loads_once_under_concurrent_first_use() {
        let handle: ModelHandle<String> = ModelHandle::new();
        let loads = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let model = handle
                        .get_or_try_init(|| {
                            loads.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(20));
                            Ok::<_, String>("whisper-base".to_string())
                        })
                        .unwrap();
                    assert_eq!(model, "whisper-base");
                });
            }
        });

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(handle.is_loaded());
    }

    #[test]
    fn failed_load_is_retried() {
        let handle: ModelHandle<u32> = ModelHandle::new();
        let first = handle.get_or_try_init(|| Err::<u32, _>("disk error"));
        assert_eq!(first, Err("disk error"));
        assert!(!handle.is_loaded());

        let second = handle.get_or_try_init(|| Ok::<_, &str>(7));
        assert_eq!(second, Ok(&7));
        assert_eq!(handle.get(), Some(&7));
    }

    #[test]
    fn loaded_value_is_not_replaced() {
        let handle = ModelHandle::new();
        handle.get_or_try_init(|| Ok::<_, ()>(1)).unwrap();
        let value = handle.get_or_try_init(|| Ok::<_, ()>(2)).unwrap();
        assert_eq!(*value, 1);
    }

    #[test]
    fn usable_as_static() {
        static HANDLE: ModelHandle<&str> = ModelHandle::new();
        let model = HANDLE.get_or_try_init(|| Ok::<_, ()>("base")).unwrap();
        assert_eq!(*model, "base");
    }
}
