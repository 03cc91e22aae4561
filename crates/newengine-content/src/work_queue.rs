use crossbeam_channel::{Receiver, Sender};

pub type WorkItem = Box<dyn FnOnce() + Send + 'static>;

/// FIFO of closures executed by the thread that owns loaded assets.
///
/// Any thread may post; only the owner drains. Clones share the same queue.
#[derive(Clone)]
pub struct WorkQueue {
    tx: Sender<WorkItem>,
    rx: Receiver<WorkItem>,
}

impl Default for WorkQueue {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    #[inline]
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Fire-and-forget post.
    #[inline]
    pub fn post(&self, item: impl FnOnce() + Send + 'static) {
        let _ = self.tx.send(Box::new(item));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Runs queued items in order, including ones posted while draining.
    ///
    /// Returns the number of items executed.
    pub fn drain(&self) -> usize {
        let mut n = 0usize;
        while let Ok(item) = self.rx.try_recv() {
            item();
            n += 1;
        }
        n
    }

    /// Blocks until one item arrives (or the timeout passes), then drains.
    pub fn wait_and_drain(&self, timeout: std::time::Duration) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => {
                item();
                1 + self.drain()
            }
            Err(_) => 0,
        }
    }
}
