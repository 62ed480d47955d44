use std::cell::RefCell;
use std::rc::Rc;

/// Returns immediately and remembers every requested delay. Clones share the record.
#[derive(Clone, Debug, Default)]
pub struct Delay {
    delays_ns: Rc<RefCell<Vec<u32>>>,
}

impl Delay {
    pub fn new() -> Delay {
        Delay::default()
    }

    pub fn delays_ns(&self) -> Vec<u32> {
        self.delays_ns.borrow().clone()
    }

    pub fn total_ns(&self) -> u64 {
        self.delays_ns.borrow().iter().map(|ns| *ns as u64).sum()
    }
}

impl embedded_hal::delay::DelayNs for Delay {
    fn delay_ns(&mut self, ns: u32) {
        self.delays_ns.borrow_mut().push(ns);
    }
}

/// Sleeps on the tokio timer.
#[cfg(feature = "async")]
#[derive(Clone, Debug, Default)]
pub struct AsyncDelay {
    started: Rc<RefCell<u32>>,
}

#[cfg(feature = "async")]
impl AsyncDelay {
    pub fn new() -> AsyncDelay {
        AsyncDelay::default()
    }

    /// Delays begun so far, including ones cut short.
    pub fn started(&self) -> u32 {
        *self.started.borrow()
    }
}

#[cfg(feature = "async")]
impl embedded_hal_async::delay::DelayNs for AsyncDelay {
    async fn delay_ns(&mut self, ns: u32) {
        *self.started.borrow_mut() += 1;
        tokio::time::sleep(std::time::Duration::from_nanos(ns as u64)).await;
    }
}
