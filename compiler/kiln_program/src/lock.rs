//! The process-wide build lock.
//!
//! Backends are not assumed to be reentrant, so every compile, link and build
//! call in the process runs under this one lock, across all programs. It is
//! reentrant so a build may trigger nested work on the same thread.

use parking_lot::{const_reentrant_mutex, ReentrantMutex, ReentrantMutexGuard};

static BUILD_LOCK: ReentrantMutex<()> = const_reentrant_mutex(());

/// Hold the build lock until the guard drops.
pub fn build_lock() -> ReentrantMutexGuard<'static, ()> {
    BUILD_LOCK.lock()
}
