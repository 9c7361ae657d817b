use polling::{Event, Events, PollMode, Poller};
use std::fmt::{Debug, Formatter};
use std::io::{Error, ErrorKind};
use std::os::fd::{BorrowedFd, RawFd};
use std::time::Duration;

/// Edge-triggered readiness over the platform poller.
///
/// Every descriptor is registered once with interest in both directions plus
/// hangup, and stays registered until it is closed. Level-triggered backends
/// are refused: a connected socket is almost always writable.
pub(crate) struct Selector(Poller);

impl Debug for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("mode", &PollMode::Edge)
            .finish()
    }
}

impl Selector {
    pub(crate) fn new() -> std::io::Result<Selector> {
        let poller = Poller::new()?;
        if poller.supports_edge() {
            Ok(Selector(poller))
        } else {
            Err(Error::new(
                ErrorKind::Unsupported,
                "poller has no edge-triggered mode",
            ))
        }
    }

    /// Blocks until at least one edge arrives or `timeout` elapses.
    pub(crate) fn select(
        &self,
        events: &mut Events,
        timeout: Option<Duration>,
    ) -> std::io::Result<usize> {
        events.clear();
        self.0.wait(events, timeout)
    }

    pub(crate) fn register(&self, fd: RawFd, key: usize) -> std::io::Result<()> {
        // the fd stays open until deregister returns
        unsafe {
            self.0
                .add_with_mode(fd, Event::all(key).with_interrupt(), PollMode::Edge)
        }
    }

    pub(crate) fn deregister(&self, fd: RawFd) -> std::io::Result<()> {
        self.0.delete(unsafe { BorrowedFd::borrow_raw(fd) })
    }
}
