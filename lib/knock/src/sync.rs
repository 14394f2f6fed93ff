// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Reader/writer locking for state shared between packet hooks.
//!
//! Hooks run on whatever context the packet interception layer hands
//! them, possibly many at once. Every piece of shared engine state sits
//! behind a [`KRwLock`], and all access goes through the scoped guards
//! it hands out: the lock is released when the guard is dropped, on
//! every exit path.
//!
//! A poisoned lock is not treated as fatal. The values guarded here
//! are plain integers and booleans which are always written in a
//! single assignment, so a panic elsewhere can never leave them
//! half-updated.
use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

/// A reader/writer lock around a value of type `T`.
///
/// Any number of readers may hold the lock at once; a writer excludes
/// all readers and other writers.
#[derive(Debug, Default)]
pub struct KRwLock<T> {
    inner: RwLock<T>,
}

pub struct KRwLockReadGuard<'a, T: 'a> {
    guard: RwLockReadGuard<'a, T>,
}

pub struct KRwLockWriteGuard<'a, T: 'a> {
    guard: RwLockWriteGuard<'a, T>,
}

impl<T> Deref for KRwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.guard.deref()
    }
}

impl<T> Deref for KRwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.guard.deref()
    }
}

impl<T> DerefMut for KRwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.guard.deref_mut()
    }
}

impl<T> KRwLock<T> {
    pub const fn new(val: T) -> Self {
        KRwLock { inner: RwLock::new(val) }
    }

    /// Acquire a shared guard.
    pub fn read(&self) -> KRwLockReadGuard<'_, T> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        KRwLockReadGuard { guard }
    }

    /// Acquire an exclusive guard.
    pub fn write(&self) -> KRwLockWriteGuard<'_, T> {
        let guard =
            self.inner.write().unwrap_or_else(PoisonError::into_inner);
        KRwLockWriteGuard { guard }
    }
}

impl<T: Copy> KRwLock<T> {
    /// Take a copy of the guarded value under a shared guard.
    pub fn get(&self) -> T {
        *self.read()
    }

    /// Replace the guarded value under an exclusive guard.
    pub fn set(&self, val: T) {
        *self.write() = val;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn readers_share() {
        let lock = KRwLock::new(7u32);
        let r1 = lock.read();
        let r2 = lock.read();
        assert_eq!(*r1 + *r2, 14);
    }

    #[test]
    fn write_then_read() {
        let lock = KRwLock::new([0i64; 3]);
        lock.write()[1] = 42;
        assert_eq!(lock.get(), [0, 42, 0]);
        lock.set([1, 2, 3]);
        assert_eq!(*lock.read(), [1, 2, 3]);
    }

    #[test]
    fn survives_poison() {
        let lock = Arc::new(KRwLock::new(false));
        let lock2 = lock.clone();
        let res = std::thread::spawn(move || {
            let _guard = lock2.write();
            panic!("poison the lock");
        })
        .join();
        assert!(res.is_err());

        lock.set(true);
        assert!(lock.get());
    }
}
