//! Instance port pool.
//!
//! Ports are handed out from `[base, base + span)`, always the lowest free
//! one, and tracked in an explicit in-use set so a released port becomes
//! eligible again. The pool itself is not synchronized; the registry owns it
//! behind its lock so reservation is atomic with the free-port scan.

use std::collections::BTreeSet;
use std::net::{Ipv4Addr, TcpListener};

#[derive(Debug, Clone)]
pub struct PortPool {
    base: u16,
    span: u16,
    in_use: BTreeSet<u16>,
    /// Skip ports some other process on the host is already bound to.
    probe_bind: bool,
}

impl PortPool {
    pub fn new(base: u16, span: u16) -> Self {
        Self {
            base,
            span,
            in_use: BTreeSet::new(),
            probe_bind: true,
        }
    }

    /// Disable the local bind probe (reservation then only consults the
    /// in-use set).
    pub fn without_bind_probe(mut self) -> Self {
        self.probe_bind = false;
        self
    }

    /// Reserve the lowest free port, or `None` when the range is exhausted.
    pub fn reserve(&mut self) -> Option<u16> {
        let end = (u32::from(self.base) + u32::from(self.span)).min(u32::from(u16::MAX) + 1);

        let port = (u32::from(self.base)..end)
            .map(|p| p as u16)
            .filter(|p| !self.in_use.contains(p))
            .find(|p| !self.probe_bind || is_bindable(*p))?;

        self.in_use.insert(port);
        Some(port)
    }

    /// Return `port` to the pool. Returns `false` if it was not reserved.
    pub fn release(&mut self, port: u16) -> bool {
        self.in_use.remove(&port)
    }

    pub fn is_reserved(&self, port: u16) -> bool {
        self.in_use.contains(&port)
    }

    pub fn reserved_count(&self) -> usize {
        self.in_use.len()
    }
}

fn is_bindable(port: u16) -> bool {
    TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).is_ok()
}
