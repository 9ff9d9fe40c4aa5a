//! Lock capability and the [`Guarded`] container.
//!
//! [`ReadWriteLock`] describes a lock that owns its value and hands it out
//! only for the duration of a closure: `read` may overlap with other reads,
//! `write` excludes everything. [`Guarded`] pairs a value with such a lock
//! and is the only way to reach that value.
//!
//! Two implementations are provided:
//!
//! | Lock | `read` | `write` |
//! |------|--------|---------|
//! | [`parking_lot::RwLock`] | shared | exclusive |
//! | [`parking_lot::Mutex`] | exclusive | exclusive |
//!
//! Neither lock poisons; a panic inside the closure unwinds through the guard
//! and releases the lock.

use std::{fmt, marker::PhantomData};

use parking_lot::{Mutex, RwLock};

/// A lock that owns a value of type `T` and grants scoped access to it.
///
/// The closure's return value is forwarded unchanged, so a `Result` produced
/// inside the critical section reaches the caller as-is.
pub trait ReadWriteLock<T> {
    /// Wraps `value` in a new lock.
    fn wrap(value: T) -> Self
    where
        Self: Sized;

    /// Runs `f` with shared access to the value.
    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R;

    /// Runs `f` with exclusive access to the value.
    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R;
}

impl<T> ReadWriteLock<T> for RwLock<T> {
    fn wrap(value: T) -> Self {
        RwLock::new(value)
    }

    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = RwLock::read(self);
        f(&*guard)
    }

    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = RwLock::write(self);
        f(&mut *guard)
    }
}

impl<T> ReadWriteLock<T> for Mutex<T> {
    fn wrap(value: T) -> Self {
        Mutex::new(value)
    }

    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.lock();
        f(&*guard)
    }

    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut *guard)
    }
}

/// A value reachable only through its lock.
///
/// The default lock is a [`parking_lot::RwLock`], letting readers proceed in
/// parallel. Use `Guarded<T, parking_lot::Mutex<T>>` for a fully exclusive
/// variant.
///
/// # Example
///
/// ```
/// use local_storage::Guarded;
///
/// let counter: Guarded<u32> = Guarded::new(0);
/// counter.write(|value| *value += 1);
/// assert_eq!(counter.read(|value| *value), 1);
/// ```
pub struct Guarded<T, L = RwLock<T>> {
    lock: L,
    _value: PhantomData<fn() -> T>,
}

impl<T, L: ReadWriteLock<T>> Guarded<T, L> {
    /// Takes ownership of `value` and protects it with a new lock.
    pub fn new(value: T) -> Self {
        Self { lock: L::wrap(value), _value: PhantomData }
    }

    /// Runs `f` with read-only access to the value.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.lock.read(f)
    }

    /// Runs `f` with mutable access to the value.
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.lock.write(f)
    }
}

impl<T: Default, L: ReadWriteLock<T>> Default for Guarded<T, L> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T, L> fmt::Debug for Guarded<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guarded").field("value", &std::any::type_name::<T>()).finish_non_exhaustive()
    }
}
