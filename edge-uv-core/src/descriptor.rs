use crate::reactor::{AcceptCallback, ReadCallback, WriteCallback};
use crate::syscall::NetSyscall;
use std::fmt::{Debug, Formatter};
use std::net::SocketAddr;
use std::os::fd::RawFd;

/// What a registered descriptor is for.
pub(crate) enum Role<S: NetSyscall> {
    Listener {
        /// Armed by the first accept, kept across drains.
        on_accept: Option<AcceptCallback<S>>,
    },
    Connection,
}

impl<S: NetSyscall> Debug for Role<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Listener { on_accept } => f
                .debug_struct("Listener")
                .field("accepting", &on_accept.is_some())
                .finish(),
            Role::Connection => write!(f, "Connection"),
        }
    }
}

pub(crate) struct PendingRead<S: NetSyscall> {
    pub(crate) buffer: Vec<u8>,
    pub(crate) filled: usize,
    pub(crate) on_read: ReadCallback<S>,
}

pub(crate) struct PendingWrite<S: NetSyscall> {
    pub(crate) buffer: Vec<u8>,
    pub(crate) cursor: usize,
    pub(crate) on_write: WriteCallback<S>,
}

/// Read direction. `Pending` between arming and the callback.
pub(crate) enum ReadState<S: NetSyscall> {
    Idle,
    Pending(PendingRead<S>),
}

/// Write direction, independent of reads.
pub(crate) enum WriteState<S: NetSyscall> {
    Idle,
    Pending(PendingWrite<S>),
}

impl<S: NetSyscall> Debug for ReadState<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadState::Idle => write!(f, "Idle"),
            ReadState::Pending(pending) => f
                .debug_struct("Pending")
                .field("capacity", &pending.buffer.len())
                .field("filled", &pending.filled)
                .finish_non_exhaustive(),
        }
    }
}

impl<S: NetSyscall> Debug for WriteState<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteState::Idle => write!(f, "Idle"),
            WriteState::Pending(pending) => f
                .debug_struct("Pending")
                .field("len", &pending.buffer.len())
                .field("cursor", &pending.cursor)
                .finish_non_exhaustive(),
        }
    }
}

/// Everything the reactor knows about one registered descriptor.
pub(crate) struct Descriptor<S: NetSyscall> {
    pub(crate) fd: RawFd,
    pub(crate) role: Role<S>,
    pub(crate) read: ReadState<S>,
    pub(crate) write: WriteState<S>,
    pub(crate) local_addr: SocketAddr,
    pub(crate) remote_addr: Option<SocketAddr>,
}

impl<S: NetSyscall> Debug for Descriptor<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("fd", &self.fd)
            .field("role", &self.role)
            .field("read", &self.read)
            .field("write", &self.write)
            .field("local_addr", &self.local_addr)
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}

impl<S: NetSyscall> Descriptor<S> {
    pub(crate) fn listener(fd: RawFd, local_addr: SocketAddr) -> Self {
        Descriptor {
            fd,
            role: Role::Listener { on_accept: None },
            read: ReadState::Idle,
            write: WriteState::Idle,
            local_addr,
            remote_addr: None,
        }
    }

    pub(crate) fn connection(fd: RawFd, local_addr: SocketAddr, remote_addr: SocketAddr) -> Self {
        Descriptor {
            fd,
            role: Role::Connection,
            read: ReadState::Idle,
            write: WriteState::Idle,
            local_addr,
            remote_addr: Some(remote_addr),
        }
    }

    pub(crate) fn is_listener(&self) -> bool {
        matches!(self.role, Role::Listener { .. })
    }

    pub(crate) fn is_reading(&self) -> bool {
        matches!(self.read, ReadState::Pending(_))
    }

    pub(crate) fn is_writing(&self) -> bool {
        matches!(self.write, WriteState::Pending(_))
    }
}
