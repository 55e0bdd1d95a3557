//! Clock abstraction (epoch milliseconds).

use crate::db::now_epoch_ms;

pub trait Clock {
    fn now_epoch_ms(&self) -> i64;
}

/// `Clock` backed by `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        now_epoch_ms()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_epoch_ms(&self) -> i64 {
        (**self).now_epoch_ms()
    }
}
