use libc::{c_int, sa_family_t, sockaddr_in, sockaddr_in6, sockaddr_storage, socklen_t};
use std::io::{Error, ErrorKind};
use std::mem::size_of;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

pub(crate) fn domain(addr: &SocketAddr) -> c_int {
    match addr {
        SocketAddr::V4(_) => libc::AF_INET,
        SocketAddr::V6(_) => libc::AF_INET6,
    }
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn to_raw(addr: &SocketAddr) -> (sockaddr_storage, socklen_t) {
    let mut storage: sockaddr_storage = unsafe { std::mem::zeroed() };
    let len = match addr {
        SocketAddr::V4(v4) => {
            let mut sin: sockaddr_in = unsafe { std::mem::zeroed() };
            sin.sin_family = libc::AF_INET as sa_family_t;
            sin.sin_port = v4.port().to_be();
            sin.sin_addr.s_addr = u32::from_ne_bytes(v4.ip().octets());
            cfg_if::cfg_if! {
                if #[cfg(any(
                    target_os = "macos",
                    target_os = "ios",
                    target_os = "freebsd",
                    target_os = "dragonfly",
                    target_os = "openbsd",
                    target_os = "netbsd"
                ))] {
                    sin.sin_len = size_of::<sockaddr_in>() as u8;
                }
            }
            unsafe {
                std::ptr::write(
                    std::ptr::addr_of_mut!(storage).cast::<sockaddr_in>(),
                    sin,
                );
            }
            size_of::<sockaddr_in>()
        }
        SocketAddr::V6(v6) => {
            let mut sin6: sockaddr_in6 = unsafe { std::mem::zeroed() };
            sin6.sin6_family = libc::AF_INET6 as sa_family_t;
            sin6.sin6_port = v6.port().to_be();
            sin6.sin6_flowinfo = v6.flowinfo();
            sin6.sin6_addr.s6_addr = v6.ip().octets();
            sin6.sin6_scope_id = v6.scope_id();
            cfg_if::cfg_if! {
                if #[cfg(any(
                    target_os = "macos",
                    target_os = "ios",
                    target_os = "freebsd",
                    target_os = "dragonfly",
                    target_os = "openbsd",
                    target_os = "netbsd"
                ))] {
                    sin6.sin6_len = size_of::<sockaddr_in6>() as u8;
                }
            }
            unsafe {
                std::ptr::write(
                    std::ptr::addr_of_mut!(storage).cast::<sockaddr_in6>(),
                    sin6,
                );
            }
            size_of::<sockaddr_in6>()
        }
    };
    (storage, len as socklen_t)
}

pub(crate) fn from_raw(storage: &sockaddr_storage) -> std::io::Result<SocketAddr> {
    match c_int::from(storage.ss_family) {
        libc::AF_INET => {
            let sin = unsafe { &*std::ptr::addr_of!(*storage).cast::<sockaddr_in>() };
            Ok(SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::from(sin.sin_addr.s_addr.to_ne_bytes()),
                u16::from_be(sin.sin_port),
            )))
        }
        libc::AF_INET6 => {
            let sin6 = unsafe { &*std::ptr::addr_of!(*storage).cast::<sockaddr_in6>() };
            Ok(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(sin6.sin6_addr.s6_addr),
                u16::from_be(sin6.sin6_port),
                sin6.sin6_flowinfo,
                sin6.sin6_scope_id,
            )))
        }
        family => Err(Error::new(
            ErrorKind::InvalidInput,
            format!("unsupported address family {family}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v4_survives_conversion() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let (storage, len) = to_raw(&addr);
        assert_eq!(size_of::<sockaddr_in>(), len as usize);
        assert_eq!(libc::AF_INET, domain(&addr));
        assert_eq!(addr, from_raw(&storage).unwrap());
    }

    #[test]
    fn v6_survives_conversion() {
        let addr: SocketAddr = "[::1]:443".parse().unwrap();
        let (storage, len) = to_raw(&addr);
        assert_eq!(size_of::<sockaddr_in6>(), len as usize);
        assert_eq!(libc::AF_INET6, domain(&addr));
        assert_eq!(addr, from_raw(&storage).unwrap());
    }

    #[test]
    fn unknown_family() {
        let storage: sockaddr_storage = unsafe { std::mem::zeroed() };
        assert_eq!(
            ErrorKind::InvalidInput,
            from_raw(&storage).unwrap_err().kind()
        );
    }
}
