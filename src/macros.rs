#![allow(unused_macros)]

/// Helper macro for locking items
///
/// ```rust, ignore
///  let mut state = lock!(self.state);
///  state.current_time = 42;
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().expect("Failed to acquire lock")
    };
}

/// Helper macro for reading locked items
///
/// ```rust, ignore
///  let marker = read_lock!(self.main_thread);
/// ```
macro_rules! read_lock {
    ($arc_rwlock:expr) => {
        $arc_rwlock.read().expect("Failed to acquire read lock")
    };
}

/// Helper macro for writing to locked items
///
/// ```rust, ignore
///  let mut marker = write_lock!(self.main_thread);
///  *marker = Some(std::thread::current().id());
/// ```
macro_rules! write_lock {
    ($arc_rwlock:expr) => {
        $arc_rwlock.write().expect("Failed to acquire write lock")
    };
}
