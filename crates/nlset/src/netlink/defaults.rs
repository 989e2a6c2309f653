//! Process-wide default socket timeout.
//!
//! Callers that never construct their own [`Handle`](super::Handle) share a
//! single process-wide socket. The functions here configure and inspect its
//! timeout; the socket is opened lazily on first use and lives for the
//! process lifetime with no teardown.
//!
//! Individual calls are serialized internally, but a get-then-set sequence
//! is not atomic; callers needing that must synchronize externally.

use std::sync::Mutex;
use std::time::Duration;

use super::error::{Error, Result};
use super::socket::{Family, SocketHandle, Timeval};

/// The default socket, opened on first use.
static DEFAULT_SOCKET: Mutex<Option<SocketHandle>> = Mutex::new(None);

fn with_default_socket<T>(f: impl FnOnce(&SocketHandle) -> Result<T>) -> Result<T> {
    let mut guard = DEFAULT_SOCKET.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(socket) = guard.as_ref() {
        return f(socket);
    }
    // First use; a failed open leaves the slot empty so the next call retries.
    let socket = guard.insert(SocketHandle::open(Family::Netfilter)?);
    f(socket)
}

/// Set the send and receive timeout of the process-wide default socket.
///
/// Rejects durations below one microsecond (including zero): they truncate
/// to a zero `timeval`, which the kernel reads as "no timeout".
pub fn set_socket_timeout(timeout: Duration) -> Result<()> {
    if timeout < Duration::from_micros(1) {
        return Err(Error::InvalidTimeout { timeout });
    }
    let tv = Timeval::from(timeout);
    with_default_socket(|socket| {
        socket.set_send_timeout(tv)?;
        socket.set_receive_timeout(tv)
    })
}

/// Read the timeout of the process-wide default socket back from the kernel.
///
/// Send and receive timeouts are always set together, so the send timeout
/// stands in for both. Returns zero if no timeout has been set.
pub fn socket_timeout() -> Result<Duration> {
    with_default_socket(|socket| Ok(socket.send_timeout()?.to_duration()))
}
