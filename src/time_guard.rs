use std::{time::Instant, fmt::Debug};

/// Reports the time between its creation and its drop to stderr.
pub struct TimeGuard<S: Debug> {
    pub name: S,
    pub start: Instant
}

impl<S: Debug> Drop for TimeGuard<S> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        eprintln!("T: {:?}: {:?}", self.name, elapsed);
    }
}

/// Time the rest of the enclosing scope.
#[macro_export]
macro_rules! time_guard {
    ($namestr:expr) => {
        let _guard = $crate::time_guard::TimeGuard {
            name: $namestr,
            start: std::time::Instant::now()
        };
    }
}

#[macro_export]
macro_rules! notime_guard {
    ($namestr:expr) => {}
}
