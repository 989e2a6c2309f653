//! Netlink transport handles for Linux ipset management.
//!
//! This crate provides the socket layer under an ipset management stack: a
//! [`Handle`] owning one blocking netlink socket per supported protocol
//! family, with uniform configuration (timeouts, receive-buffer sizing,
//! strict checking) fanned out across the pool and deterministic teardown.
//! The ipset message protocol itself is encoded by higher layers; they
//! borrow sockets from the handle and exchange raw netlink datagrams.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use nlset::netlink::{Family, Handle};
//!
//! fn main() -> nlset::Result<()> {
//!     let mut handle = Handle::new()?;
//!     handle.set_socket_timeout(Duration::from_secs(2))?;
//!
//!     let socket = handle.socket(Family::Netfilter)?;
//!     socket.send(&request)?;
//!     let reply = socket.recv()?;
//!
//!     handle.delete();
//!     Ok(())
//! }
//! ```
//!
//! Callers that skip constructing a handle can configure the process-wide
//! default socket via [`netlink::set_socket_timeout`].

pub mod netlink;

// Re-export common types at crate root for convenience
pub use netlink::{Error, Family, Handle, Result};
