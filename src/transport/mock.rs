//! In-memory register bus for tests and hardware-free runs

use super::RegisterBus;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Mock register bus
///
/// Clones share the same register file, so a test can keep one handle and
/// hand the other to a monitor thread.
#[derive(Clone)]
pub struct MockBus {
    address: u16,
    inner: Arc<Mutex<MockBusInner>>,
}

#[derive(Default)]
struct MockBusInner {
    registers: HashMap<u8, u8>,
    failing: HashSet<u8>,
    reads: Vec<u8>,
}

impl MockBus {
    /// Create a mock device at `address` with no registers mapped
    pub fn new(address: u16) -> Self {
        Self {
            address,
            inner: Arc::new(Mutex::new(MockBusInner::default())),
        }
    }

    /// Set a register value
    pub fn set_register(&self, register: u8, value: u8) {
        self.inner.lock().registers.insert(register, value);
    }

    /// Set several registers at once
    pub fn set_registers(&self, values: &[(u8, u8)]) {
        let mut inner = self.inner.lock();
        for &(register, value) in values {
            inner.registers.insert(register, value);
        }
    }

    /// Make reads of `register` fail until [`MockBus::clear_failures`]
    pub fn fail_register(&self, register: u8) {
        self.inner.lock().failing.insert(register);
    }

    pub fn clear_failures(&self) {
        self.inner.lock().failing.clear();
    }

    /// Registers read so far, in order
    pub fn reads(&self) -> Vec<u8> {
        self.inner.lock().reads.clone()
    }

    pub fn clear_reads(&self) {
        self.inner.lock().reads.clear();
    }
}

impl RegisterBus for MockBus {
    fn read_register(&mut self, register: u8) -> Result<u8> {
        let mut inner = self.inner.lock();
        inner.reads.push(register);

        if inner.failing.contains(&register) {
            return Err(Error::Bus {
                register,
                reason: "injected failure".to_string(),
            });
        }

        inner.registers.get(&register).copied().ok_or(Error::Bus {
            register,
            reason: "register not mapped".to_string(),
        })
    }

    fn address(&self) -> u16 {
        self.address
    }
}
