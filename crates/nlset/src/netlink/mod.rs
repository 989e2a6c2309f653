//! Blocking netlink transport for ipset management.
//!
//! This module provides the socket pool that carries ipset protocol
//! messages: one bound netlink socket per supported protocol family, with
//! uniform timeout, receive-buffer, and strict-checking configuration
//! applied across the pool. Message encoding lives in the layer above; this
//! module only guarantees the sockets it hands out are open, correctly
//! timed out, and correctly buffered.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use nlset::netlink::{Family, Handle};
//!
//! let mut handle = Handle::new()?;
//! handle.set_socket_timeout(Duration::from_secs(2))?;
//! handle.set_socket_receive_buffer_size(65536, false)?;
//!
//! let socket = handle.socket(Family::Netfilter)?;
//! // ... send/recv ipset messages on `socket` ...
//!
//! handle.delete();
//! ```

mod defaults;
mod error;
mod handle;
mod socket;

pub use defaults::{set_socket_timeout, socket_timeout};
pub use error::{Error, Result};
pub use handle::Handle;
pub use socket::{Family, SocketHandle, Timeval};
