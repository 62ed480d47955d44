use portable_atomic::{AtomicBool, Ordering};

/// Something the run loop can ask whether it should stop.
///
/// Checked between poll iterations only, so a read that has started always finishes.
pub trait Cancellation {
    fn is_cancelled(&self) -> bool;
}

/// A flag that can be raised from a signal handler, another thread or an interrupt.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    pub const fn new() -> CancelToken {
        CancelToken {
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Lowers the flag so the token can drive another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

impl Cancellation for CancelToken {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Never cancels. Useful when the loop should only stop on a fatal error.
#[derive(Clone, Copy, Debug, Default)]
pub struct Never;

impl Cancellation for Never {
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl<T> Cancellation for &T
where
    T: Cancellation + ?Sized,
{
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}
