//! Low-level blocking netlink socket operations.

use std::io;
use std::mem;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};
use tracing::{debug, warn};

use super::error::{Error, Result};

/// `NETLINK_GET_STRICT_CHK` from `linux/netlink.h`; libc has no binding.
const NETLINK_GET_STRICT_CHK: libc::c_int = 12;

/// Netlink protocol families used for ipset management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Family {
    /// Routing/device hook (link lookups for set-by-interface matching)
    Route,
    /// IPsec transformations
    Xfrm,
    /// Netfilter (the ipset subsystem itself)
    Netfilter,
}

impl Family {
    /// The families a default [`Handle`](super::Handle) opens sockets for.
    pub const SUPPORTED: [Family; 3] = [Family::Route, Family::Xfrm, Family::Netfilter];

    fn as_isize(self) -> isize {
        match self {
            Family::Route => protocols::NETLINK_ROUTE,
            Family::Xfrm => protocols::NETLINK_XFRM,
            Family::Netfilter => protocols::NETLINK_NETFILTER,
        }
    }
}

/// Socket timeout as whole seconds plus microseconds.
///
/// This is the value layout of the `SO_SNDTIMEO`/`SO_RCVTIMEO` socket
/// options. `usec` is the sub-second remainder in `0..=999_999`; durations
/// below one microsecond truncate to the zero value, which the kernel reads
/// as "no timeout".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timeval {
    /// Whole seconds.
    pub sec: i64,
    /// Microseconds, `0..=999_999`.
    pub usec: i64,
}

impl Timeval {
    /// Convert back to a [`Duration`].
    pub fn to_duration(self) -> Duration {
        Duration::new(self.sec as u64, self.usec as u32 * 1000)
    }

    fn as_raw(self) -> libc::timeval {
        libc::timeval {
            tv_sec: self.sec as libc::time_t,
            tv_usec: self.usec as libc::suseconds_t,
        }
    }

    fn from_raw(tv: libc::timeval) -> Self {
        Self {
            sec: tv.tv_sec as i64,
            usec: tv.tv_usec as i64,
        }
    }
}

impl From<Duration> for Timeval {
    fn from(timeout: Duration) -> Self {
        Self {
            sec: timeout.as_secs() as i64,
            usec: i64::from(timeout.subsec_micros()),
        }
    }
}

/// A bound blocking netlink socket for one protocol family.
///
/// Owned exclusively by the [`Handle`](super::Handle) that opened it. The
/// socket stays in blocking mode; the timeouts configured through
/// [`set_send_timeout`](Self::set_send_timeout) and
/// [`set_receive_timeout`](Self::set_receive_timeout) bound how long
/// [`send`](Self::send) and [`recv`](Self::recv) may block.
pub struct SocketHandle {
    /// The underlying kernel socket.
    socket: Socket,
    /// Protocol family this socket is bound to.
    family: Family,
    /// Local port ID (assigned by the kernel).
    pid: u32,
}

impl SocketHandle {
    /// Open and bind a socket for the given family.
    pub(crate) fn open(family: Family) -> Result<Self> {
        let mut socket = Socket::new(family.as_isize())?;

        // Bind to get a port ID
        let mut addr = SocketAddr::new(0, 0);
        socket.bind(&addr)?;
        socket.get_address(&mut addr)?;
        let pid = addr.port_number();

        // Enable extended ACK for better error messages
        socket.set_ext_ack(true).ok(); // Ignore if not supported

        debug!(?family, pid, "opened netlink socket");

        Ok(Self {
            socket,
            family,
            pid,
        })
    }

    /// Get the protocol family.
    pub fn family(&self) -> Family {
        self.family
    }

    /// Get the local port ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Set the send timeout (`SO_SNDTIMEO`).
    pub fn set_send_timeout(&self, timeout: Timeval) -> Result<()> {
        setsockopt(
            self.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_SNDTIMEO,
            &timeout.as_raw(),
            "set send timeout",
        )
    }

    /// Set the receive timeout (`SO_RCVTIMEO`).
    pub fn set_receive_timeout(&self, timeout: Timeval) -> Result<()> {
        setsockopt(
            self.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_RCVTIMEO,
            &timeout.as_raw(),
            "set receive timeout",
        )
    }

    /// Read the send timeout back from the kernel.
    pub fn send_timeout(&self) -> Result<Timeval> {
        let tv: libc::timeval = getsockopt(
            self.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_SNDTIMEO,
            "get send timeout",
        )?;
        Ok(Timeval::from_raw(tv))
    }

    /// Read the receive timeout back from the kernel.
    pub fn receive_timeout(&self) -> Result<Timeval> {
        let tv: libc::timeval = getsockopt(
            self.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_RCVTIMEO,
            "get receive timeout",
        )?;
        Ok(Timeval::from_raw(tv))
    }

    /// Request a receive-buffer size in bytes.
    ///
    /// With `force` the request uses `SO_RCVBUFFORCE`, bypassing the
    /// `net.core.rmem_max` limit (requires `CAP_NET_ADMIN`); otherwise the
    /// kernel clamps the request to that limit. The granted size is
    /// advisory; the kernel doubles the request for its own bookkeeping.
    pub fn set_receive_buffer_size(&self, size: usize, force: bool) -> Result<()> {
        let value = size as libc::c_int;
        let (option, operation) = if force {
            (libc::SO_RCVBUFFORCE, "set receive buffer size (forced)")
        } else {
            (libc::SO_RCVBUF, "set receive buffer size")
        };
        setsockopt(self.as_raw_fd(), libc::SOL_SOCKET, option, &value, operation)
    }

    /// Read the granted receive-buffer size back from the kernel.
    pub fn receive_buffer_size(&self) -> Result<usize> {
        let value: libc::c_int = getsockopt(
            self.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_RCVBUF,
            "get receive buffer size",
        )?;
        Ok(value as usize)
    }

    /// Toggle strict input checking (`NETLINK_GET_STRICT_CHK`).
    ///
    /// With strict checking the kernel rejects malformed dump requests
    /// instead of silently ignoring unknown fields.
    pub fn set_strict_check(&self, enabled: bool) -> Result<()> {
        let value: libc::c_int = enabled.into();
        setsockopt(
            self.as_raw_fd(),
            libc::SOL_NETLINK,
            NETLINK_GET_STRICT_CHK,
            &value,
            "set strict check",
        )
    }

    /// Send a raw netlink message, blocking until accepted by the kernel.
    pub fn send(&self, msg: &[u8]) -> Result<()> {
        self.socket.send(msg, 0)?;
        Ok(())
    }

    /// Receive a raw netlink datagram, allocating a buffer.
    ///
    /// Blocks until data arrives or the configured receive timeout expires.
    pub fn recv(&self) -> Result<Vec<u8>> {
        // Allocate buffer with capacity - don't resize, let recv fill it
        let mut buf = BytesMut::with_capacity(32768);
        self.socket.recv(&mut buf, 0)?;
        Ok(buf.to_vec())
    }

    /// Close the socket, reporting (but not propagating) failures.
    pub(crate) fn close(self) {
        let family = self.family;
        let fd = self.socket.as_raw_fd();
        mem::forget(self.socket);

        // SAFETY: `fd` belonged to the socket forgotten above, so this is
        // the only close of that descriptor.
        let rc = unsafe { libc::close(fd) };
        if rc < 0 {
            warn!(
                ?family,
                error = %io::Error::last_os_error(),
                "failed to close netlink socket"
            );
        } else {
            debug!(?family, "closed netlink socket");
        }
    }
}

impl AsRawFd for SocketHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

fn setsockopt<T>(
    fd: RawFd,
    level: libc::c_int,
    option: libc::c_int,
    value: &T,
    operation: &'static str,
) -> Result<()> {
    // SAFETY: `value` points to a live `T` and the length passed to the
    // kernel matches its size.
    let rc = unsafe {
        libc::setsockopt(
            fd,
            level,
            option,
            value as *const T as *const libc::c_void,
            mem::size_of::<T>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        return Err(Error::SocketOption {
            operation,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

fn getsockopt<T>(
    fd: RawFd,
    level: libc::c_int,
    option: libc::c_int,
    operation: &'static str,
) -> Result<T> {
    let mut value = mem::MaybeUninit::<T>::zeroed();
    let mut len = mem::size_of::<T>() as libc::socklen_t;

    // SAFETY: `value` provides `len` writable bytes for the kernel to fill.
    let rc = unsafe {
        libc::getsockopt(
            fd,
            level,
            option,
            value.as_mut_ptr() as *mut libc::c_void,
            &mut len,
        )
    };
    if rc < 0 {
        return Err(Error::SocketOption {
            operation,
            source: io::Error::last_os_error(),
        });
    }

    // SAFETY: the kernel initialized `value` on success.
    Ok(unsafe { value.assume_init() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeval_from_duration() {
        let tv = Timeval::from(Duration::from_secs(2) + Duration::from_millis(8));
        assert_eq!(tv, Timeval { sec: 2, usec: 8000 });
    }

    #[test]
    fn timeval_zero() {
        assert_eq!(Timeval::from(Duration::ZERO), Timeval::default());
    }

    #[test]
    fn timeval_truncates_below_microsecond() {
        assert_eq!(Timeval::from(Duration::from_nanos(900)), Timeval::default());
    }

    #[test]
    fn timeval_round_trip() {
        let timeout = Duration::new(7, 250_000_000);
        assert_eq!(Timeval::from(timeout).to_duration(), timeout);
    }

    #[test]
    fn timeval_usec_in_range() {
        let tv = Timeval::from(Duration::new(1, 999_999_999));
        assert_eq!(tv, Timeval { sec: 1, usec: 999_999 });
    }

    #[test]
    fn supported_families_are_distinct() {
        let mut raw: Vec<isize> = Family::SUPPORTED.iter().map(|f| f.as_isize()).collect();
        raw.sort_unstable();
        raw.dedup();
        assert_eq!(raw.len(), Family::SUPPORTED.len());
    }
}
