use crate::sockaddr;
use libc::{c_int, c_void, socklen_t, ssize_t};
use std::fmt::Debug;
use std::io::Error;
use std::mem::size_of;
use std::net::SocketAddr;
use std::os::fd::RawFd;

fn cvt(r: c_int) -> std::io::Result<c_int> {
    if r == -1 {
        Err(Error::last_os_error())
    } else {
        Ok(r)
    }
}

fn cvt_size(r: ssize_t) -> std::io::Result<usize> {
    usize::try_from(r).map_err(|_| Error::last_os_error())
}

#[allow(clippy::cast_possible_truncation)]
fn set_int_option(fd: RawFd, level: c_int, name: c_int, value: c_int) -> std::io::Result<()> {
    cvt(unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            std::ptr::addr_of!(value).cast::<c_void>(),
            size_of::<c_int>() as socklen_t,
        )
    })
    .map(drop)
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
fn set_non_blocking_cloexec(fd: RawFd) -> std::io::Result<()> {
    let flags = cvt(unsafe { libc::fcntl(fd, libc::F_GETFL) })?;
    _ = cvt(unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) })?;
    let flags = cvt(unsafe { libc::fcntl(fd, libc::F_GETFD) })?;
    _ = cvt(unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) })?;
    Ok(())
}

/// The socket syscalls the reactor is built on.
///
/// Every method has a default `libc` implementation, so an implementor only
/// overrides what it wants to intercept. All descriptors produced here are
/// non-blocking and close-on-exec.
pub trait NetSyscall: Debug {
    /// Create a stream socket for `domain`.
    fn socket(&self, domain: c_int) -> std::io::Result<RawFd> {
        cfg_if::cfg_if! {
            if #[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))] {
                cvt(unsafe {
                    libc::socket(
                        domain,
                        libc::SOCK_STREAM | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                        0,
                    )
                })
            } else {
                let fd = cvt(unsafe { libc::socket(domain, libc::SOCK_STREAM, 0) })?;
                if let Err(e) = set_non_blocking_cloexec(fd) {
                    _ = unsafe { libc::close(fd) };
                    return Err(e);
                }
                Ok(fd)
            }
        }
    }

    /// `SO_REUSEADDR`, only listeners need it.
    fn set_reuse_addr(&self, fd: RawFd) -> std::io::Result<()> {
        set_int_option(fd, libc::SOL_SOCKET, libc::SO_REUSEADDR, 1)
    }

    /// `TCP_NODELAY`.
    fn set_nodelay(&self, fd: RawFd, on: bool) -> std::io::Result<()> {
        set_int_option(fd, libc::IPPROTO_TCP, libc::TCP_NODELAY, c_int::from(on))
    }

    /// Bind `fd` to `addr`.
    fn bind(&self, fd: RawFd, addr: &SocketAddr) -> std::io::Result<()> {
        let (storage, len) = sockaddr::to_raw(addr);
        cvt(unsafe { libc::bind(fd, std::ptr::addr_of!(storage).cast(), len) }).map(drop)
    }

    /// Mark `fd` as listening.
    fn listen(&self, fd: RawFd, backlog: c_int) -> std::io::Result<()> {
        cvt(unsafe { libc::listen(fd, backlog) }).map(drop)
    }

    /// Take one pending connection off the backlog.
    #[allow(clippy::cast_possible_truncation)]
    fn accept(&self, fd: RawFd) -> std::io::Result<(RawFd, SocketAddr)> {
        let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len = size_of::<libc::sockaddr_storage>() as socklen_t;
        cfg_if::cfg_if! {
            if #[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))] {
                let conn = cvt(unsafe {
                    libc::accept4(
                        fd,
                        std::ptr::addr_of_mut!(storage).cast(),
                        &mut len,
                        libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                    )
                })?;
            } else {
                let conn = cvt(unsafe {
                    libc::accept(fd, std::ptr::addr_of_mut!(storage).cast(), &mut len)
                })?;
                if let Err(e) = set_non_blocking_cloexec(conn) {
                    _ = unsafe { libc::close(conn) };
                    return Err(e);
                }
            }
        }
        match sockaddr::from_raw(&storage) {
            Ok(addr) => Ok((conn, addr)),
            Err(e) => {
                _ = unsafe { libc::close(conn) };
                Err(e)
            }
        }
    }

    /// The address `fd` is bound to.
    #[allow(clippy::cast_possible_truncation)]
    fn local_addr(&self, fd: RawFd) -> std::io::Result<SocketAddr> {
        let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len = size_of::<libc::sockaddr_storage>() as socklen_t;
        _ = cvt(unsafe {
            libc::getsockname(fd, std::ptr::addr_of_mut!(storage).cast(), &mut len)
        })?;
        sockaddr::from_raw(&storage)
    }

    /// One `read(2)`.
    fn read(&self, fd: RawFd, buf: &mut [u8]) -> std::io::Result<usize> {
        cvt_size(unsafe { libc::read(fd, buf.as_mut_ptr().cast::<c_void>(), buf.len()) })
    }

    /// One `write(2)`.
    fn write(&self, fd: RawFd, buf: &[u8]) -> std::io::Result<usize> {
        cvt_size(unsafe { libc::write(fd, buf.as_ptr().cast::<c_void>(), buf.len()) })
    }

    /// Release `fd`.
    fn close(&self, fd: RawFd) -> std::io::Result<()> {
        cvt(unsafe { libc::close(fd) }).map(drop)
    }
}

/// Straight to the OS.
#[derive(Debug, Copy, Clone, Default)]
pub struct RawNetSyscall {}

impl NetSyscall for RawNetSyscall {}
