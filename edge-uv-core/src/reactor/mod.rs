use crate::config::Config;
use crate::descriptor::{Descriptor, PendingRead, PendingWrite, ReadState, Role, WriteState};
use crate::directory::{Directory, Token};
use crate::error::{Error, Result};
use crate::selector::Selector;
use crate::sockaddr;
use crate::socket::{read_until_blocked, write_until_blocked, Progress};
use crate::syscall::{NetSyscall, RawNetSyscall};
use polling::{Event, Events};
use std::fmt::{Debug, Formatter};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::os::fd::RawFd;
use std::time::Duration;

/// Invoked once per armed read with the buffer and the number of bytes
/// delivered into it. Zero bytes means the peer closed.
pub type ReadCallback<S> = Box<dyn FnOnce(&mut Reactor<S>, Token, Vec<u8>, usize)>;

/// Invoked once per write transaction with the buffer and the number of bytes
/// transferred, which is always the full buffer length.
pub type WriteCallback<S> = Box<dyn FnOnce(&mut Reactor<S>, Token, Vec<u8>, usize)>;

/// Invoked for every connection a listener accepts.
pub type AcceptCallback<S> = Box<dyn FnMut(&mut Reactor<S>, Token)>;

/// Single-threaded edge-triggered reactor.
///
/// Owns the readiness facility and every registered descriptor. Callbacks run
/// on the thread driving [`Reactor::run`] and receive the reactor itself, so
/// they can arm further operations, accept, or close.
pub struct Reactor<S: NetSyscall = RawNetSyscall> {
    config: Config,
    syscall: S,
    selector: Selector,
    directory: Directory<Descriptor<S>>,
    events: Events,
    ready: Vec<Event>,
}

impl<S: NetSyscall> Debug for Reactor<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactor")
            .field("name", &self.config.get_name())
            .field("syscall", &self.syscall)
            .field("selector", &self.selector)
            .field("registered", &self.directory.len())
            .finish_non_exhaustive()
    }
}

impl Reactor<RawNetSyscall> {
    /// A reactor with the default [`Config`].
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// A reactor talking straight to the OS.
    pub fn with_config(config: Config) -> Result<Self> {
        Self::with_syscall(config, RawNetSyscall::default())
    }
}

impl<S: NetSyscall> Reactor<S> {
    /// A reactor issuing its socket syscalls through `syscall`.
    ///
    /// # Errors
    /// if the readiness facility cannot be created or lacks edge-triggered
    /// mode.
    pub fn with_syscall(config: Config, syscall: S) -> Result<Self> {
        let selector = Selector::new().map_err(Error::Poll)?;
        let capacity = NonZeroUsize::new(config.get_event_capacity()).unwrap_or(NonZeroUsize::MIN);
        Ok(Reactor {
            events: Events::with_capacity(capacity),
            ready: Vec::with_capacity(capacity.get()),
            config,
            syscall,
            selector,
            directory: Directory::default(),
        })
    }

    /// The reactor name, from its [`Config`].
    #[must_use]
    pub fn name(&self) -> &str {
        self.config.get_name()
    }

    /// The configuration this reactor was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The syscall seam, for socket tuning outside the protocols.
    #[must_use]
    pub fn syscall(&self) -> &S {
        &self.syscall
    }

    /// Number of registered descriptors, listeners included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.directory.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }

    /// Whether `token` still names a registered descriptor.
    #[must_use]
    pub fn is_registered(&self, token: Token) -> bool {
        self.directory.contains(token)
    }

    /// Whether `token` names a listener.
    #[must_use]
    pub fn is_listener(&self, token: Token) -> bool {
        self.directory
            .get(token)
            .is_some_and(Descriptor::is_listener)
    }

    /// Whether a read is armed and its callback has not fired yet.
    #[must_use]
    pub fn is_reading(&self, token: Token) -> bool {
        self.directory.get(token).is_some_and(Descriptor::is_reading)
    }

    /// Whether a write is in flight.
    #[must_use]
    pub fn is_writing(&self, token: Token) -> bool {
        self.directory.get(token).is_some_and(Descriptor::is_writing)
    }

    fn descriptor(&self, token: Token) -> Result<&Descriptor<S>> {
        self.directory.get(token).ok_or(Error::Closed(token))
    }

    /// The OS descriptor behind `token`.
    pub fn raw_fd(&self, token: Token) -> Result<RawFd> {
        self.descriptor(token).map(|descriptor| descriptor.fd)
    }

    /// The address `token` is bound to.
    pub fn local_addr(&self, token: Token) -> Result<SocketAddr> {
        self.descriptor(token).map(|descriptor| descriptor.local_addr)
    }

    /// The peer address, resolved once when the connection was accepted.
    pub fn remote_addr(&self, token: Token) -> Result<SocketAddr> {
        self.descriptor(token)?
            .remote_addr
            .ok_or(Error::NotConnection(token))
    }

    /// Create a listening socket on `addr` and register it.
    ///
    /// The socket is non-blocking with `SO_REUSEADDR` set and listens with the
    /// configured backlog. Nothing is accepted until [`Reactor::accept`] arms
    /// a callback.
    pub fn register_listener(&mut self, addr: SocketAddr) -> Result<Token> {
        let fd = self
            .syscall
            .socket(sockaddr::domain(&addr))
            .map_err(Error::SocketCreate)?;
        let local_addr = match self.setup_listener(fd, &addr) {
            Ok(local_addr) => local_addr,
            Err(e) => {
                self.release(fd);
                return Err(e);
            }
        };
        let token = self.enroll(Descriptor::listener(fd, local_addr))?;
        crate::info!("{} listening on {local_addr} as {token}", self.name());
        Ok(token)
    }

    fn setup_listener(&self, fd: RawFd, addr: &SocketAddr) -> Result<SocketAddr> {
        self.syscall.set_reuse_addr(fd).map_err(Error::SetOption)?;
        self.syscall.bind(fd, addr).map_err(Error::Bind)?;
        self.syscall
            .listen(fd, self.config.get_backlog())
            .map_err(Error::Listen)?;
        Ok(self.syscall.local_addr(fd)?)
    }

    /// Arm `on_accept` on `listener` and drain whatever is already pending.
    ///
    /// The callback stays armed for the lifetime of the listener and is
    /// invoked once per accepted connection, both now and whenever the
    /// listener becomes readable again. Arming again replaces it. Returns how
    /// many connections this first pass accepted.
    pub fn accept(
        &mut self,
        listener: Token,
        on_accept: impl FnMut(&mut Reactor<S>, Token) + 'static,
    ) -> Result<usize> {
        match self.directory.get_mut(listener) {
            Some(Descriptor {
                role: Role::Listener { on_accept: slot },
                ..
            }) => *slot = Some(Box::new(on_accept)),
            Some(_) => return Err(Error::NotListener(listener)),
            None => return Err(Error::Closed(listener)),
        }
        self.drain_accept(listener)
    }

    fn drain_accept(&mut self, listener: Token) -> Result<usize> {
        let (fd, mut on_accept) = match self.directory.get_mut(listener) {
            Some(Descriptor {
                fd,
                role: Role::Listener { on_accept },
                ..
            }) => match on_accept.take() {
                Some(on_accept) => (*fd, on_accept),
                None => {
                    crate::debug!("{listener} is acceptable but nothing is armed");
                    return Ok(0);
                }
            },
            Some(_) => return Err(Error::NotListener(listener)),
            None => return Err(Error::Closed(listener)),
        };
        let mut accepted = 0;
        let result = loop {
            // the callback may have closed the listener
            if !self.directory.contains(listener) {
                break Ok(());
            }
            match self.syscall.accept(fd) {
                Ok((conn, remote_addr)) => match self.adopt(conn, remote_addr) {
                    Ok(token) => {
                        accepted += 1;
                        on_accept(self, token);
                    }
                    Err(e) => break Err(e),
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if accepted == 0 {
                        crate::debug!("{listener} spurious wakeup, nothing to accept");
                    } else {
                        crate::debug!("{listener} drained {accepted} connections");
                    }
                    break Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => break Err(Error::Io(e)),
            }
        };
        if let Some(Descriptor {
            role: Role::Listener { on_accept: slot },
            ..
        }) = self.directory.get_mut(listener)
        {
            // a callback armed during the drain wins
            if slot.is_none() {
                *slot = Some(on_accept);
            }
        }
        result.map(|()| accepted)
    }

    fn adopt(&mut self, fd: RawFd, remote_addr: SocketAddr) -> Result<Token> {
        let local_addr = match self.syscall.local_addr(fd) {
            Ok(local_addr) => local_addr,
            Err(e) => {
                self.release(fd);
                return Err(Error::Io(e));
            }
        };
        let token = self.enroll(Descriptor::connection(fd, local_addr, remote_addr))?;
        crate::debug!("accepted {remote_addr} as {token}");
        Ok(token)
    }

    /// Put `descriptor` in the directory and watch it. On failure nothing is
    /// left behind and the fd is released.
    fn enroll(&mut self, descriptor: Descriptor<S>) -> Result<Token> {
        let fd = descriptor.fd;
        let token = match self.directory.insert(descriptor) {
            Ok(token) => token,
            Err(_) => {
                self.release(fd);
                return Err(Error::Register(std::io::Error::new(
                    ErrorKind::OutOfMemory,
                    "descriptor directory is full",
                )));
            }
        };
        if let Err(e) = self.selector.register(fd, token.key()) {
            _ = self.directory.remove(token);
            self.release(fd);
            return Err(Error::Register(e));
        }
        Ok(token)
    }

    /// Arm a read into `buffer` and try it right away.
    ///
    /// `buffer.len()` is the initial capacity and must be non-zero; the
    /// buffer doubles whenever a single edge delivers more than fits.
    /// `on_read` fires exactly once, possibly before this returns, with the
    /// buffer and the byte count. An I/O error other than would-block is
    /// returned instead and disarms the read.
    pub fn read(
        &mut self,
        token: Token,
        buffer: Vec<u8>,
        on_read: impl FnOnce(&mut Reactor<S>, Token, Vec<u8>, usize) + 'static,
    ) -> Result<()> {
        let descriptor = self
            .directory
            .get_mut(token)
            .ok_or(Error::Closed(token))?;
        if descriptor.is_listener() {
            return Err(Error::NotConnection(token));
        }
        if buffer.is_empty() {
            return Err(Error::EmptyBuffer);
        }
        if descriptor.is_reading() {
            return Err(Error::OperationInProgress(token));
        }
        descriptor.read = ReadState::Pending(PendingRead {
            buffer,
            filled: 0,
            on_read: Box::new(on_read),
        });
        self.resume_read(token)
    }

    fn resume_read(&mut self, token: Token) -> Result<()> {
        let Some(descriptor) = self.directory.get_mut(token) else {
            return Ok(());
        };
        let fd = descriptor.fd;
        let ReadState::Pending(pending) = &mut descriptor.read else {
            return Ok(());
        };
        match read_until_blocked(&self.syscall, fd, &mut pending.buffer, &mut pending.filled) {
            Ok(Progress::WouldBlock) => Ok(()),
            Ok(Progress::Done(filled)) => {
                if let ReadState::Pending(PendingRead {
                    buffer, on_read, ..
                }) = std::mem::replace(&mut descriptor.read, ReadState::Idle)
                {
                    on_read(self, token, buffer, filled);
                }
                Ok(())
            }
            Err(e) => {
                descriptor.read = ReadState::Idle;
                Err(Error::Io(e))
            }
        }
    }

    /// Start a write transaction for all of `buffer` and try it right away.
    ///
    /// `on_write` fires exactly once, after every byte was handed to the
    /// kernel, with the buffer and its full length. Only one transaction may
    /// be in flight per connection.
    pub fn write(
        &mut self,
        token: Token,
        buffer: Vec<u8>,
        on_write: impl FnOnce(&mut Reactor<S>, Token, Vec<u8>, usize) + 'static,
    ) -> Result<()> {
        let descriptor = self
            .directory
            .get_mut(token)
            .ok_or(Error::Closed(token))?;
        if descriptor.is_listener() {
            return Err(Error::NotConnection(token));
        }
        if buffer.is_empty() {
            return Err(Error::EmptyWrite);
        }
        if descriptor.is_writing() {
            return Err(Error::OperationInProgress(token));
        }
        descriptor.write = WriteState::Pending(PendingWrite {
            buffer,
            cursor: 0,
            on_write: Box::new(on_write),
        });
        self.resume_write(token)
    }

    fn resume_write(&mut self, token: Token) -> Result<()> {
        let Some(descriptor) = self.directory.get_mut(token) else {
            return Ok(());
        };
        let fd = descriptor.fd;
        let WriteState::Pending(pending) = &mut descriptor.write else {
            return Ok(());
        };
        match write_until_blocked(&self.syscall, fd, &pending.buffer, &mut pending.cursor) {
            Ok(Progress::WouldBlock) => Ok(()),
            Ok(Progress::Done(written)) => {
                if let WriteState::Pending(PendingWrite {
                    buffer, on_write, ..
                }) = std::mem::replace(&mut descriptor.write, WriteState::Idle)
                {
                    on_write(self, token, buffer, written);
                }
                Ok(())
            }
            Err(e) => {
                descriptor.write = WriteState::Idle;
                Err(Error::Io(e))
            }
        }
    }

    /// Deregister and release `token`.
    ///
    /// Pending callbacks are dropped without being invoked. OS failures while
    /// tearing down are logged, never returned; an unknown or already closed
    /// token is reported as [`Error::Closed`].
    pub fn close(&mut self, token: Token) -> Result<()> {
        let descriptor = self.directory.remove(token).ok_or(Error::Closed(token))?;
        if let Err(e) = self.selector.deregister(descriptor.fd) {
            crate::warn!("deregister {token} failed: {e}");
        }
        self.release(descriptor.fd);
        crate::debug!("closed {token}");
        Ok(())
    }

    fn release(&self, fd: RawFd) {
        if let Err(e) = self.syscall.close(fd) {
            crate::warn!("close fd {fd} failed: {e}");
        }
    }

    /// Wait for one batch of readiness edges and dispatch it.
    ///
    /// Returns the number of events in the batch; zero on timeout or when the
    /// wait was interrupted by a signal.
    ///
    /// # Errors
    /// [`Error::Poll`] if the wait itself failed, the reactor cannot go on.
    pub fn run_once(&mut self, timeout: Option<Duration>) -> Result<usize> {
        let mut ready = std::mem::take(&mut self.ready);
        if let Err(e) = self.selector.select(&mut self.events, timeout) {
            self.ready = ready;
            if e.kind() == ErrorKind::Interrupted {
                return Ok(0);
            }
            return Err(Error::Poll(e));
        }
        ready.clear();
        ready.extend(self.events.iter());
        for event in &ready {
            self.dispatch(*event);
        }
        let count = ready.len();
        ready.clear();
        self.ready = ready;
        Ok(count)
    }

    /// Block on readiness and dispatch forever.
    ///
    /// # Errors
    /// only when the readiness wait fails.
    pub fn run(&mut self) -> Result<()> {
        crate::info!("{} started", self.name());
        loop {
            if let Err(e) = self.run_once(None) {
                crate::error!("{} stopped: {e}", self.name());
                return Err(e);
            }
        }
    }

    fn dispatch(&mut self, event: Event) {
        let token = Token::from_key(event.key);
        let Some(is_listener) = self.directory.get(token).map(Descriptor::is_listener) else {
            crate::debug!("stale event for {token}");
            return;
        };
        if event.is_interrupt() || event.is_err() == Some(true) {
            crate::warn!("{token} reported error or hangup, closing");
            _ = self.close(token);
            return;
        }
        if !event.readable && !event.writable {
            crate::info!("{token} woke without readiness");
            return;
        }
        if event.readable {
            let result = if is_listener {
                self.drain_accept(token).map(drop)
            } else {
                self.resume_read(token)
            };
            if let Err(e) = result {
                crate::error!("{token} {} failed: {e}", if is_listener { "accept" } else { "read" });
            }
        }
        if event.writable && !is_listener {
            if let Err(e) = self.resume_write(token) {
                crate::error!("{token} write failed: {e}");
            }
        }
    }
}

impl<S: NetSyscall> Drop for Reactor<S> {
    fn drop(&mut self) {
        let tokens: Vec<Token> = self.directory.tokens().collect();
        for token in tokens {
            _ = self.close(token);
        }
    }
}
