use crate::syscall::NetSyscall;
use std::io::ErrorKind;
use std::os::fd::RawFd;

/// Where a non-blocking protocol stopped.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Progress {
    /// No progress was possible, wait for the next edge.
    WouldBlock,
    /// Finished with this many bytes.
    Done(usize),
}

/// Read until the kernel runs dry, the peer closes, or an error occurs.
///
/// `buffer[..filled]` is preserved across calls. When the buffer fills up it
/// is doubled so a single edge can deliver more than the initial capacity.
/// Returns `Done(filled)` as soon as anything has been read and the socket
/// would block, `Done` with whatever was read on end of stream, and
/// `WouldBlock` only when nothing at all is available.
pub(crate) fn read_until_blocked<S: NetSyscall + ?Sized>(
    syscall: &S,
    fd: RawFd,
    buffer: &mut Vec<u8>,
    filled: &mut usize,
) -> std::io::Result<Progress> {
    loop {
        if *filled == buffer.len() {
            let grown = (buffer.len() * 2).max(1);
            buffer.resize(grown, 0);
        }
        match syscall.read(fd, &mut buffer[*filled..]) {
            Ok(0) => return Ok(Progress::Done(*filled)),
            Ok(n) => *filled += n,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                return Ok(if *filled == 0 {
                    Progress::WouldBlock
                } else {
                    Progress::Done(*filled)
                });
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

/// Write `buffer[*cursor..]` until done or the kernel pushes back.
///
/// `cursor` only moves forward, so calling again after `WouldBlock` resumes
/// exactly where the previous attempt stopped.
pub(crate) fn write_until_blocked<S: NetSyscall + ?Sized>(
    syscall: &S,
    fd: RawFd,
    buffer: &[u8],
    cursor: &mut usize,
) -> std::io::Result<Progress> {
    while *cursor < buffer.len() {
        match syscall.write(fd, &buffer[*cursor..]) {
            Ok(0) => return Err(ErrorKind::WriteZero.into()),
            Ok(n) => *cursor += n,
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(Progress::WouldBlock),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(Progress::Done(*cursor))
}
