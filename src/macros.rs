#![allow(unused_macros)]

// Lock helpers for the `RwLock`-guarded internals of proxies and properties.
//
// A poisoned lock only means another thread panicked while holding it; the guarded
// bookkeeping is still structurally valid, so the guard is recovered instead of
// propagating the panic.

/// Helper macro for reading locked items
///
/// ```rust, ignore
///  let state = read_lock!(self.state);
///  println!("{}", state.objects_created);
/// ```
macro_rules! read_lock {
    ($rwlock:expr) => {
        $rwlock
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Helper macro for writing to locked items
///
/// ```rust, ignore
///  let mut state = write_lock!(self.state);
///  state.objects_created = true;
/// ```
macro_rules! write_lock {
    ($rwlock:expr) => {
        $rwlock
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Helper macro for locking a mutex
///
/// ```rust, ignore
///  let mut transport = lock!(self.data_server);
///  transport.round_trip(&bytes)?;
/// ```
macro_rules! lock {
    ($mutex:expr) => {
        $mutex
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Helper macro for reading locked items
///
/// ```rust, ignore
///  let servers = with_read!(self.state, |state| state.servers);
/// ```
macro_rules! with_read {
    ($rwlock:expr, $closure:expr) => {{
        let guard = read_lock!($rwlock);
        $closure(&*guard)
    }};
}

/// Helper macro for writing to locked items
///
/// ```rust, ignore
///  with_write!(self.state, |state| state.needs_update = false);
/// ```
macro_rules! with_write {
    ($rwlock:expr, $closure:expr) => {{
        let mut guard = write_lock!($rwlock);
        $closure(&mut *guard)
    }};
}
