use crate::addr::resolve;
use edge_uv_core::{NetSyscall, Reactor, Result, Token};
use std::net::SocketAddr;

/// A listening TCP socket registered with a [`Reactor`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TcpListener {
    token: Token,
}

impl TcpListener {
    /// Resolve `address` (`host:port`) and start listening on it.
    pub fn bind<S: NetSyscall>(reactor: &mut Reactor<S>, address: &str) -> Result<Self> {
        let addr = resolve(address)?;
        reactor
            .register_listener(addr)
            .map(|token| TcpListener { token })
    }

    /// Hand every accepted connection to `on_accept`.
    ///
    /// `TCP_NODELAY` is already set on the connection when the callback runs.
    /// Returns the number of connections that were waiting and got accepted
    /// right away.
    pub fn accept<S: NetSyscall + 'static>(
        &self,
        reactor: &mut Reactor<S>,
        mut on_accept: impl FnMut(&mut Reactor<S>, TcpConn) + 'static,
    ) -> Result<usize> {
        reactor.accept(self.token, move |reactor, token| {
            let conn = TcpConn::adopt(reactor, token);
            on_accept(reactor, conn);
        })
    }

    /// Stop listening. Connections already accepted are not affected.
    pub fn close<S: NetSyscall>(&self, reactor: &mut Reactor<S>) -> Result<()> {
        reactor.close(self.token)
    }

    /// The bound address, with the real port when bound to port 0.
    pub fn local_addr<S: NetSyscall>(&self, reactor: &Reactor<S>) -> Result<SocketAddr> {
        reactor.local_addr(self.token)
    }

    /// The reactor handle behind this listener.
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }
}

/// An accepted TCP connection.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TcpConn {
    token: Token,
}

impl TcpConn {
    fn adopt<S: NetSyscall>(reactor: &Reactor<S>, token: Token) -> Self {
        match reactor.raw_fd(token) {
            Ok(fd) => {
                if let Err(e) = reactor.syscall().set_nodelay(fd, true) {
                    edge_uv_core::warn!("set TCP_NODELAY on {token} failed: {e}");
                }
            }
            Err(e) => {
                edge_uv_core::warn!("{token} vanished before tuning: {e}");
            }
        }
        TcpConn { token }
    }

    /// Read into `buffer`, see [`Reactor::read`]. A zero count means the
    /// peer closed.
    pub fn read<S: NetSyscall + 'static>(
        &self,
        reactor: &mut Reactor<S>,
        buffer: Vec<u8>,
        on_read: impl FnOnce(&mut Reactor<S>, TcpConn, Vec<u8>, usize) + 'static,
    ) -> Result<()> {
        reactor.read(self.token, buffer, move |reactor, token, buffer, n| {
            on_read(reactor, TcpConn { token }, buffer, n);
        })
    }

    /// Write all of `buffer`, see [`Reactor::write`].
    pub fn write<S: NetSyscall + 'static>(
        &self,
        reactor: &mut Reactor<S>,
        buffer: Vec<u8>,
        on_write: impl FnOnce(&mut Reactor<S>, TcpConn, Vec<u8>, usize) + 'static,
    ) -> Result<()> {
        reactor.write(self.token, buffer, move |reactor, token, buffer, n| {
            on_write(reactor, TcpConn { token }, buffer, n);
        })
    }

    /// Close the connection, dropping any pending callbacks.
    pub fn close<S: NetSyscall>(&self, reactor: &mut Reactor<S>) -> Result<()> {
        reactor.close(self.token)
    }

    /// Local end of the connection.
    pub fn local_addr<S: NetSyscall>(&self, reactor: &Reactor<S>) -> Result<SocketAddr> {
        reactor.local_addr(self.token)
    }

    /// Peer end of the connection.
    pub fn remote_addr<S: NetSyscall>(&self, reactor: &Reactor<S>) -> Result<SocketAddr> {
        reactor.remote_addr(self.token)
    }

    /// The reactor handle behind this connection.
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_uv_core::{Config, Error, RawNetSyscall};
    use std::cell::{Cell, RefCell};
    use std::io::{Read, Write};
    use std::os::fd::RawFd;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    /// Counts `TCP_NODELAY` requests, everything else goes to the OS.
    #[derive(Debug, Default)]
    struct Counting {
        nodelay: Cell<usize>,
    }

    impl NetSyscall for Counting {
        fn set_nodelay(&self, fd: RawFd, on: bool) -> std::io::Result<()> {
            assert!(on);
            self.nodelay.set(self.nodelay.get() + 1);
            RawNetSyscall::default().set_nodelay(fd, on)
        }
    }

    fn run_until<S: NetSyscall>(
        reactor: &mut Reactor<S>,
        mut done: impl FnMut(&Reactor<S>) -> bool,
    ) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(reactor) {
            assert!(Instant::now() < deadline, "reactor made no progress");
            _ = reactor
                .run_once(Some(Duration::from_millis(20)))
                .unwrap();
        }
    }

    fn echo<S: NetSyscall + 'static>(reactor: &mut Reactor<S>, conn: TcpConn) {
        conn.read(reactor, vec![0; 8], |reactor, conn, buffer, n| {
            if n == 0 {
                conn.close(reactor).unwrap();
                return;
            }
            conn.write(reactor, buffer[..n].to_vec(), |reactor, conn, _, _| {
                echo(reactor, conn);
            })
            .unwrap();
        })
        .unwrap();
    }

    #[test]
    fn echo_over_adapters() -> Result<()> {
        let mut reactor = Reactor::with_syscall(Config::default(), Counting::default())?;
        let listener = TcpListener::bind(&mut reactor, "127.0.0.1:0")?;
        let addr = listener.local_addr(&reactor)?;
        assert!(addr.ip().is_loopback());

        let conns = Rc::new(RefCell::new(Vec::new()));
        let sink = conns.clone();
        assert_eq!(
            0,
            listener.accept(&mut reactor, move |reactor, conn| {
                sink.borrow_mut().push(conn);
                echo(reactor, conn);
            })?
        );

        let mut client = std::net::TcpStream::connect(addr)?;
        run_until(&mut reactor, |_| !conns.borrow().is_empty());
        let conn = conns.borrow()[0];
        assert_eq!(1, reactor.syscall().nodelay.get());
        assert_eq!(client.local_addr()?, conn.remote_addr(&reactor)?);
        assert_eq!(addr, conn.local_addr(&reactor)?);

        let message = b"hello, edge-triggered world";
        client.write_all(message)?;
        let mut echoed = vec![0u8; message.len()];
        let mut got = 0;
        let deadline = Instant::now() + Duration::from_secs(5);
        client.set_nonblocking(true)?;
        while got < echoed.len() {
            assert!(Instant::now() < deadline, "echo never arrived");
            _ = reactor.run_once(Some(Duration::from_millis(20)))?;
            match client.read(&mut echoed[got..]) {
                Ok(n) => got += n,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }
        }
        assert_eq!(message.as_slice(), echoed.as_slice());

        drop(client);
        run_until(&mut reactor, |reactor| !reactor.is_registered(conn.token()));
        listener.close(&mut reactor)?;
        assert!(matches!(listener.close(&mut reactor), Err(Error::Closed(_))));
        Ok(())
    }

    #[test]
    fn bind_rejects_bad_address() {
        let mut reactor = Reactor::new().unwrap();
        assert!(matches!(
            TcpListener::bind(&mut reactor, "127.0.0.1"),
            Err(Error::InvalidAddress(_))
        ));
        assert!(reactor.is_empty());
    }
}
