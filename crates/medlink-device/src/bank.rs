//! Simulated device register memory.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::DeviceError;

/// Number of 16-bit register slots a simulated device exposes.
pub const BANK_SIZE: usize = 128;

/// A bank of unsigned 16-bit registers.
///
/// This is the simulated device's memory: the telemetry generator stores
/// fresh values into it and the wire server answers block reads from it.
#[derive(Debug)]
pub struct RegisterBank {
    regs: [u16; BANK_SIZE],
}

impl RegisterBank {
    pub fn new() -> Self {
        Self {
            regs: [0; BANK_SIZE],
        }
    }

    /// Shareable bank for use between the refresh loop and the wire server.
    pub fn shared() -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Store one register value.
    pub fn store(&mut self, address: u16, value: u16) {
        if let Some(slot) = self.regs.get_mut(usize::from(address)) {
            *slot = value;
        }
    }

    /// Load one register value.
    pub fn load(&self, address: u16) -> u16 {
        self.regs.get(usize::from(address)).copied().unwrap_or(0)
    }

    /// Read a contiguous block of registers.
    pub fn load_block(&self, start: u16, count: u16) -> Result<Vec<u16>, DeviceError> {
        let from = usize::from(start);
        let to = from
            .checked_add(usize::from(count))
            .filter(|&to| to <= BANK_SIZE)
            .ok_or(DeviceError::OutOfBounds { start, count })?;
        Ok(self.regs[from..to].to_vec())
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_load_block() {
        let mut bank = RegisterBank::new();
        bank.store(0, 300);
        bank.store(2, 120);
        bank.store(6, 3650);

        let block = bank.load_block(0, 12).unwrap();
        assert_eq!(block[0], 300);
        assert_eq!(block[2], 120);
        assert_eq!(block[6], 3650);
        assert_eq!(block[1], 0);
    }

    #[test]
    fn out_of_bounds_read_is_rejected() {
        let bank = RegisterBank::new();
        assert!(matches!(
            bank.load_block(120, 12),
            Err(DeviceError::OutOfBounds { .. })
        ));
        assert!(matches!(
            bank.load_block(u16::MAX, u16::MAX),
            Err(DeviceError::OutOfBounds { .. })
        ));
    }
}
