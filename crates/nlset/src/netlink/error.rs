//! Error types for handle and socket operations.

use std::io;
use std::time::Duration;

use super::socket::Family;

/// Result type for handle and socket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while opening or configuring netlink sockets.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A socket-option call failed on one of the pooled sockets.
    #[error("{operation}: {source}")]
    SocketOption {
        /// The option operation that failed.
        operation: &'static str,
        /// The underlying syscall error.
        source: io::Error,
    },

    /// The handle's sockets were already released by [`delete`](crate::netlink::Handle::delete).
    #[error("handle has been deleted")]
    HandleDeleted,

    /// The pool holds no socket for the requested family.
    #[error("no socket open for family {family:?}")]
    FamilyNotOpen {
        /// The family that was requested.
        family: Family,
    },

    /// Timeout below the microsecond resolution of a socket timeout.
    ///
    /// A sub-microsecond value truncates to a zero `timeval`, which the
    /// kernel interprets as "no timeout" rather than "time out immediately".
    #[error("timeout {timeout:?} is less than a microsecond")]
    InvalidTimeout {
        /// The rejected value.
        timeout: Duration,
    },
}

impl Error {
    /// Check if this is a permission error (EPERM, EACCES).
    ///
    /// Forced receive-buffer resizes fail this way without `CAP_NET_ADMIN`.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Io(err) | Self::SocketOption { source: err, .. } => {
                matches!(err.raw_os_error(), Some(libc::EPERM | libc::EACCES))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_permission_denied() {
        let err = Error::SocketOption {
            operation: "set receive buffer size (forced)",
            source: io::Error::from_raw_os_error(libc::EPERM),
        };
        assert!(err.is_permission_denied());

        let err = Error::Io(io::Error::from_raw_os_error(libc::EACCES));
        assert!(err.is_permission_denied());

        assert!(!Error::HandleDeleted.is_permission_denied());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::SocketOption {
            operation: "set send timeout",
            source: io::Error::from_raw_os_error(libc::EBADF),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("set send timeout: "));

        let err = Error::FamilyNotOpen {
            family: Family::Netfilter,
        };
        assert_eq!(err.to_string(), "no socket open for family Netfilter");

        assert_eq!(Error::HandleDeleted.to_string(), "handle has been deleted");
    }
}
