use crate::directory::Token;
use std::fmt::{Display, Formatter};
use std::io;

/// Everything the reactor can report.
///
/// Would-block is never an error, it is handled inside the protocols.
#[derive(Debug)]
pub enum Error {
    /// Creating the listening socket failed.
    SocketCreate(io::Error),
    /// Setting a socket option on a new socket failed.
    SetOption(io::Error),
    /// Binding the listening socket failed.
    Bind(io::Error),
    /// Marking the socket as listening failed.
    Listen(io::Error),
    /// Adding a descriptor to the readiness facility failed.
    Register(io::Error),
    /// The readiness wait itself failed, the reactor cannot continue.
    Poll(io::Error),
    /// An accept, read or write failed with something other than would-block.
    Io(io::Error),
    /// A read was armed with a zero-length buffer.
    EmptyBuffer,
    /// A write was armed with nothing to write.
    EmptyWrite,
    /// The direction is already armed and its callback has not fired yet.
    OperationInProgress(Token),
    /// The token does not name a live descriptor.
    Closed(Token),
    /// Accept was called on a connection.
    NotListener(Token),
    /// Read or write was called on a listener.
    NotConnection(Token),
    /// An address string could not be turned into a socket address.
    InvalidAddress(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::SocketCreate(e) => write!(f, "socket create failed: {e}"),
            Error::SetOption(e) => write!(f, "setsockopt failed: {e}"),
            Error::Bind(e) => write!(f, "bind failed: {e}"),
            Error::Listen(e) => write!(f, "listen failed: {e}"),
            Error::Register(e) => write!(f, "register failed: {e}"),
            Error::Poll(e) => write!(f, "wait failed: {e}"),
            Error::Io(e) => write!(f, "{e}"),
            Error::EmptyBuffer => write!(f, "empty buf"),
            Error::EmptyWrite => write!(f, "nothing to write"),
            Error::OperationInProgress(token) => {
                write!(f, "operation already in progress on {token}")
            }
            Error::Closed(token) => write!(f, "{token} is closed"),
            Error::NotListener(token) => write!(f, "{token} is not a listener"),
            Error::NotConnection(token) => write!(f, "{token} is not a connection"),
            Error::InvalidAddress(reason) => write!(f, "invalid address: {reason}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SocketCreate(e)
            | Error::SetOption(e)
            | Error::Bind(e)
            | Error::Listen(e)
            | Error::Register(e)
            | Error::Poll(e)
            | Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
