//! Handle lifecycle and socket-configuration tests.
//!
//! These tests exercise real netlink sockets. Opening, binding, and
//! configuring them needs no privileges (forced buffer resizes would, so
//! nothing here uses `force`); no test sends a netlink message.

use std::time::Duration;

use nlset::netlink::{self, Family, Handle, Timeval};
use nlset::{Error, Result};

#[test]
fn test_handle_create_delete() -> Result<()> {
    let mut handle = Handle::new()?;

    // One open socket per supported family
    for family in Family::SUPPORTED {
        let socket = handle.socket(family)?;
        assert_eq!(socket.family(), family);
    }
    assert_eq!(handle.sockets().count(), Family::SUPPORTED.len());

    handle.delete();
    assert!(handle.is_deleted(), "pool should be empty after delete");
    assert_eq!(handle.sockets().count(), 0);

    // Deleting twice is a no-op
    handle.delete();
    assert!(handle.is_deleted());

    Ok(())
}

#[test]
fn test_configuration_after_delete_fails() -> Result<()> {
    let mut handle = Handle::new()?;
    handle.delete();

    match handle.set_socket_timeout(Duration::from_secs(1)) {
        Err(Error::HandleDeleted) => {}
        other => panic!("expected HandleDeleted, got {:?}", other),
    }
    match handle.socket_receive_buffer_sizes() {
        Err(Error::HandleDeleted) => {}
        other => panic!("expected HandleDeleted, got {:?}", other),
    }
    match handle.socket(Family::Route) {
        Err(Error::HandleDeleted) => {}
        Err(other) => panic!("expected HandleDeleted, got {:?}", other),
        Ok(_) => panic!("expected HandleDeleted, got a socket"),
    }

    Ok(())
}

#[test]
fn test_handle_timeout() -> Result<()> {
    let handle = Handle::new()?;

    // A fresh socket has no timeout configured
    for socket in handle.sockets() {
        assert_eq!(socket.send_timeout()?, Timeval::default());
        assert_eq!(socket.receive_timeout()?, Timeval::default());
    }

    handle.set_socket_timeout(Duration::from_secs(2) + Duration::from_millis(8))?;

    // Both directions on every socket report the decomposed value
    let expected = Timeval { sec: 2, usec: 8000 };
    for socket in handle.sockets() {
        assert_eq!(socket.send_timeout()?, expected);
        assert_eq!(socket.receive_timeout()?, expected);
    }

    Ok(())
}

#[test]
fn test_handle_receive_buffer() -> Result<()> {
    let handle = Handle::new()?;
    handle.set_socket_receive_buffer_size(65536, false)?;

    let sizes = handle.socket_receive_buffer_sizes()?;
    assert_eq!(sizes.len(), handle.sockets().count());
    for size in sizes {
        // The kernel doubles the request for bookkeeping
        assert!(
            (65536..=2 * 65536).contains(&size),
            "granted size {} outside expected range",
            size
        );
    }

    Ok(())
}

#[test]
fn test_default_socket_timeout() -> Result<()> {
    match netlink::set_socket_timeout(Duration::from_nanos(100)) {
        Err(Error::InvalidTimeout { .. }) => {}
        other => panic!("expected InvalidTimeout, got {:?}", other),
    }

    netlink::set_socket_timeout(Duration::from_secs(10))?;
    assert_eq!(netlink::socket_timeout()?, Duration::from_secs(10));

    Ok(())
}

#[test]
fn test_subset_pool() -> Result<()> {
    let handle = Handle::with_families(&[Family::Route])?;
    assert_eq!(handle.sockets().count(), 1);
    assert_eq!(handle.socket(Family::Route)?.family(), Family::Route);

    match handle.socket(Family::Netfilter) {
        Err(Error::FamilyNotOpen {
            family: Family::Netfilter,
        }) => {}
        other => panic!("expected FamilyNotOpen, got {:?}", other.map(|_| ())),
    }

    Ok(())
}
