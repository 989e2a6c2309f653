//! Per-family socket pool with uniform configuration fan-out.

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::mem;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use std::time::Duration;

use tracing::warn;

use super::error::{Error, Result};
use super::socket::{Family, SocketHandle, Timeval};

/// A pool of netlink sockets, one per protocol family.
///
/// The pool is created atomically (all sockets open, or none) and torn down
/// as a unit by [`delete`](Self::delete) or on drop. Configuration calls fan
/// out identically over every pooled socket; the first failure aborts the
/// fan-out and is surfaced with the failing operation named. After
/// [`delete`](Self::delete), every configuration or lookup call fails with
/// [`Error::HandleDeleted`].
///
/// A handle is single-owner; sharing one across threads requires external
/// synchronization.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use nlset::netlink::{Family, Handle};
///
/// let mut handle = Handle::new()?;
/// handle.set_socket_timeout(Duration::from_secs(2))?;
///
/// // Hand the netfilter socket to the message layer
/// let socket = handle.socket(Family::Netfilter)?;
/// socket.send(&request)?;
/// let reply = socket.recv()?;
///
/// handle.delete();
/// ```
pub struct Handle {
    /// Family -> socket mapping; empty once the handle is deleted.
    sockets: BTreeMap<Family, SocketHandle>,
}

impl Handle {
    /// Open one socket per family in [`Family::SUPPORTED`].
    pub fn new() -> Result<Self> {
        Self::with_families(&Family::SUPPORTED)
    }

    /// Open one socket per requested family.
    ///
    /// Construction is all-or-nothing: if any open fails, the sockets opened
    /// so far are closed and the error is returned. An empty `families` list
    /// yields a handle indistinguishable from a deleted one.
    pub fn with_families(families: &[Family]) -> Result<Self> {
        let mut sockets = BTreeMap::new();
        for &family in families {
            // On error, dropping the partial map closes what was opened.
            sockets.insert(family, SocketHandle::open(family)?);
        }
        Ok(Self { sockets })
    }

    /// Open the pool inside a network namespace.
    ///
    /// The namespace is specified by an open file descriptor to a namespace
    /// file (e.g., `/proc/<pid>/ns/net` or `/var/run/netns/<name>`). The
    /// calling thread temporarily switches to the target namespace, opens
    /// every socket there, then restores the original namespace. The sockets
    /// keep operating in the target namespace afterwards.
    ///
    /// # Safety considerations
    ///
    /// `setns()` affects the calling thread. The original namespace is saved
    /// and restored, but a failed restoration leaves the thread in the
    /// target namespace; this is reported via the log rather than an error
    /// since the sockets themselves are usable.
    pub fn new_in_namespace(ns_fd: RawFd) -> Result<Self> {
        // Save the current namespace so we can restore it
        let current_ns = File::open("/proc/self/ns/net")?;

        // SAFETY: libc::setns switches the calling thread to the namespace
        // behind ns_fd, a caller-supplied namespace descriptor.
        let ret = unsafe { libc::setns(ns_fd, libc::CLONE_NEWNET) };
        if ret < 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }

        // Open the whole pool in the target namespace
        let result = Self::new();

        // Restore the original namespace (best effort)
        // SAFETY: current_ns_fd is valid (opened from /proc/self/ns/net above).
        let restore_ret = unsafe { libc::setns(current_ns.as_raw_fd(), libc::CLONE_NEWNET) };
        if restore_ret < 0 {
            warn!(
                error = %io::Error::last_os_error(),
                "failed to restore original network namespace"
            );
        }

        result
    }

    /// Open the pool inside a network namespace specified by path.
    ///
    /// Convenience wrapper around [`new_in_namespace`](Self::new_in_namespace)
    /// for named namespaces (`/var/run/netns/<name>`) and process namespaces
    /// (`/proc/<pid>/ns/net`).
    pub fn new_in_namespace_path<P: AsRef<Path>>(ns_path: P) -> Result<Self> {
        let ns_file = File::open(ns_path.as_ref())?;
        Self::new_in_namespace(ns_file.as_raw_fd())
    }

    /// Set send and receive timeouts on every pooled socket.
    ///
    /// The duration is decomposed into seconds plus microseconds once and
    /// applied as both `SO_SNDTIMEO` and `SO_RCVTIMEO` on each socket.
    pub fn set_socket_timeout(&self, timeout: Duration) -> Result<()> {
        let tv = Timeval::from(timeout);
        for socket in self.pool()?.values() {
            socket.set_send_timeout(tv)?;
            socket.set_receive_timeout(tv)?;
        }
        Ok(())
    }

    /// Request a receive-buffer size on every pooled socket.
    ///
    /// See [`SocketHandle::set_receive_buffer_size`] for the `force`
    /// semantics and the kernel's rounding behavior.
    pub fn set_socket_receive_buffer_size(&self, size: usize, force: bool) -> Result<()> {
        for socket in self.pool()?.values() {
            socket.set_receive_buffer_size(size, force)?;
        }
        Ok(())
    }

    /// Read the granted receive-buffer size of every pooled socket.
    ///
    /// Returns one size per socket in family order. The kernel typically
    /// grants up to double the requested size for its own accounting.
    pub fn socket_receive_buffer_sizes(&self) -> Result<Vec<usize>> {
        self.pool()?
            .values()
            .map(SocketHandle::receive_buffer_size)
            .collect()
    }

    /// Toggle strict input checking on every pooled socket.
    pub fn set_strict_check(&self, enabled: bool) -> Result<()> {
        for socket in self.pool()?.values() {
            socket.set_strict_check(enabled)?;
        }
        Ok(())
    }

    /// Get the pooled socket for a family.
    pub fn socket(&self, family: Family) -> Result<&SocketHandle> {
        self.pool()?
            .get(&family)
            .ok_or(Error::FamilyNotOpen { family })
    }

    /// Iterate over the pooled sockets in family order.
    pub fn sockets(&self) -> impl Iterator<Item = &SocketHandle> {
        self.sockets.values()
    }

    /// Whether [`delete`](Self::delete) has run (the pool is empty).
    pub fn is_deleted(&self) -> bool {
        self.sockets.is_empty()
    }

    /// Close every pooled socket and clear the pool.
    ///
    /// Close failures are logged and do not abort the remaining closes.
    /// Idempotent: a second call observes the empty pool and does nothing.
    pub fn delete(&mut self) {
        for (_, socket) in mem::take(&mut self.sockets) {
            socket.close();
        }
    }

    fn pool(&self) -> Result<&BTreeMap<Family, SocketHandle>> {
        if self.sockets.is_empty() {
            return Err(Error::HandleDeleted);
        }
        Ok(&self.sockets)
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.delete();
    }
}
