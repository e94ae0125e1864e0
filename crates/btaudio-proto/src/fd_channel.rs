//! Transport-fd handoff over the client socket using `SCM_RIGHTS` ancillary
//! data (§6.1's `NewStream` indication; §4.4's "fd delivered" step).

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use crate::error::{Result, WireError};

/// Send `bytes` on `sock`, with `fd` attached as `SCM_RIGHTS` ancillary data.
///
/// Used only for the `NewStream` indication; every other message on the
/// control socket is plain `send`. `MSG_NOSIGNAL` suppresses `SIGPIPE` on a
/// peer that has already gone away — the gateway treats that as an ordinary
/// I/O error, not a process-fatal signal.
pub fn send_with_fd(sock: RawFd, bytes: &[u8], fd: RawFd) -> Result<()> {
    let mut iov = libc::iovec {
        iov_base: bytes.as_ptr() as *mut libc::c_void,
        iov_len: bytes.len(),
    };

    let cmsg_space = unsafe { libc::CMSG_SPACE(std::mem::size_of::<libc::c_int>() as u32) } as usize;
    let mut cmsg_buf = vec![0u8; cmsg_space];

    let mut msg = libc::msghdr {
        msg_name: std::ptr::null_mut(),
        msg_namelen: 0,
        msg_iov: &mut iov,
        msg_iovlen: 1,
        msg_control: cmsg_buf.as_mut_ptr() as *mut libc::c_void,
        msg_controllen: cmsg_buf.len() as _,
        msg_flags: 0,
    };

    unsafe {
        let cmsg = libc::CMSG_FIRSTHDR(&msg);
        (*cmsg).cmsg_level = libc::SOL_SOCKET;
        (*cmsg).cmsg_type = libc::SCM_RIGHTS;
        (*cmsg).cmsg_len = libc::CMSG_LEN(std::mem::size_of::<libc::c_int>() as u32) as _;
        std::ptr::write_unaligned(libc::CMSG_DATA(cmsg) as *mut libc::c_int, fd);
        msg.msg_controllen = libc::CMSG_SPACE(std::mem::size_of::<libc::c_int>() as u32) as _;
    }

    let n = unsafe { libc::sendmsg(sock, &msg, libc::MSG_NOSIGNAL) };
    if n < 0 {
        return Err(WireError::Io(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Receive up to `max_bytes` from `sock`, capturing any fds passed via
/// `SCM_RIGHTS`. Returns the payload bytes and the fds received alongside
/// them, in order. A zero-length result with no fds means the peer closed
/// the socket.
pub fn recv_with_fds(sock: RawFd, max_bytes: usize) -> Result<(Vec<u8>, Vec<OwnedFd>)> {
    let mut data_buf = vec![0u8; max_bytes];
    let cmsg_space = unsafe { libc::CMSG_SPACE(std::mem::size_of::<libc::c_int>() as u32) } as usize;
    let mut cmsg_buf = vec![0u8; cmsg_space];

    let mut iov = libc::iovec {
        iov_base: data_buf.as_mut_ptr() as *mut libc::c_void,
        iov_len: data_buf.len(),
    };
    let mut msg = libc::msghdr {
        msg_name: std::ptr::null_mut(),
        msg_namelen: 0,
        msg_iov: &mut iov,
        msg_iovlen: 1,
        msg_control: cmsg_buf.as_mut_ptr() as *mut libc::c_void,
        msg_controllen: cmsg_buf.len() as _,
        msg_flags: 0,
    };

    let n = unsafe { libc::recvmsg(sock, &mut msg, 0) };
    if n < 0 {
        return Err(WireError::Io(std::io::Error::last_os_error()));
    }
    data_buf.truncate(n as usize);

    let mut fds = Vec::new();
    unsafe {
        let mut cmsg = libc::CMSG_FIRSTHDR(&msg);
        while !cmsg.is_null() {
            if (*cmsg).cmsg_level == libc::SOL_SOCKET && (*cmsg).cmsg_type == libc::SCM_RIGHTS {
                let data = libc::CMSG_DATA(cmsg);
                let fd_count = ((*cmsg).cmsg_len as usize - libc::CMSG_LEN(0) as usize)
                    / std::mem::size_of::<libc::c_int>();
                for i in 0..fd_count {
                    let fd: libc::c_int = std::ptr::read_unaligned(
                        data.add(i * std::mem::size_of::<libc::c_int>()) as *const libc::c_int,
                    );
                    fds.push(OwnedFd::from_raw_fd(fd));
                }
            }
            cmsg = libc::CMSG_NXTHDR(&msg, cmsg);
        }
    }

    Ok((data_buf, fds))
}

/// Thin, testable wrapper binding `send_with_fd`/`recv_with_fds` to one socket.
pub struct FdChannel<'a> {
    sock: &'a dyn AsRawFd,
}

impl<'a> FdChannel<'a> {
    pub fn new(sock: &'a dyn AsRawFd) -> Self {
        FdChannel { sock }
    }

    pub fn send(&self, bytes: &[u8], fd: RawFd) -> Result<()> {
        send_with_fd(self.sock.as_raw_fd(), bytes, fd)
    }

    pub fn recv(&self, max_bytes: usize) -> Result<(Vec<u8>, Vec<OwnedFd>)> {
        recv_with_fds(self.sock.as_raw_fd(), max_bytes)
    }
}
