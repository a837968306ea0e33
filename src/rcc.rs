use serde::{Deserialize, Serialize};

use crate::bus::Peripheral;

use self::registers::{ClockConfigRegister, ClockControlRegister};

pub mod registers;

const RCC_CR: u32 = 0x00;
const RCC_CFGR: u32 = 0x04;
const RCC_CIR: u32 = 0x08;
const RCC_APB2RSTR: u32 = 0x0c;
const RCC_APB1RSTR: u32 = 0x10;
const RCC_AHBENR: u32 = 0x14;
const RCC_APB2ENR: u32 = 0x18;
const RCC_APB1ENR: u32 = 0x1c;
const RCC_BDCR: u32 = 0x20;
const RCC_CSR: u32 = 0x24;

/// Reset and clock control block. Only CR and CFGR have side effects,
/// everything else is plain storage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Rcc {
  pub cr: ClockControlRegister,
  pub cfgr: ClockConfigRegister,
  pub cir: u32,
  pub apb2rstr: u32,
  pub apb1rstr: u32,
  pub ahbenr: u32,
  pub apb2enr: u32,
  pub apb1enr: u32,
  pub bdcr: u32,
  pub csr: u32
}

impl Rcc {
  pub fn new() -> Self {
    Self {
      cr: ClockControlRegister(0),
      cfgr: ClockConfigRegister(0),
      cir: 0,
      apb2rstr: 0,
      apb1rstr: 0,
      ahbenr: 0,
      apb2enr: 0,
      apb1enr: 0,
      bdcr: 0,
      csr: 0
    }
  }

  pub fn reset(&mut self) {
    *self = Self::new();
  }
}

impl Default for Rcc {
  fn default() -> Self {
    Self::new()
  }
}

impl Peripheral for Rcc {
  fn mmio_read(&mut self, offset: u32, _size: usize) -> u32 {
    match offset {
      RCC_CR => self.cr.0,
      RCC_CFGR => self.cfgr.0,
      RCC_CIR => self.cir,
      RCC_APB2RSTR => self.apb2rstr,
      RCC_APB1RSTR => self.apb1rstr,
      RCC_AHBENR => self.ahbenr,
      RCC_APB2ENR => self.apb2enr,
      RCC_APB1ENR => self.apb1enr,
      RCC_BDCR => self.bdcr,
      RCC_CSR => self.csr,
      _ => {
        warn!("RCC: bad read offset {:#x}", offset);
        0
      }
    }
  }

  fn mmio_write(&mut self, offset: u32, _size: usize, value: u32) {
    match offset {
      RCC_CR => self.cr.write(value),
      RCC_CFGR => self.cfgr.write(value),
      RCC_CIR => self.cir = value,
      RCC_APB2RSTR => self.apb2rstr = value,
      RCC_APB1RSTR => self.apb1rstr = value,
      RCC_AHBENR => self.ahbenr = value,
      RCC_APB2ENR => self.apb2enr = value,
      RCC_APB1ENR => self.apb1enr = value,
      RCC_BDCR => self.bdcr = value,
      RCC_CSR => self.csr = value,
      _ => warn!("RCC: bad write offset {:#x}", offset)
    }
  }

  fn reset(&mut self) {
    Rcc::reset(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_registers_store_values() {
    let mut rcc = Rcc::new();
    let offsets = [
      RCC_CIR, RCC_APB2RSTR, RCC_APB1RSTR, RCC_AHBENR, RCC_APB2ENR, RCC_APB1ENR, RCC_BDCR, RCC_CSR
    ];

    for (i, offset) in offsets.into_iter().enumerate() {
      rcc.mmio_write(offset, 4, 0x100 + i as u32);
    }

    for (i, offset) in offsets.into_iter().enumerate() {
      assert_eq!(rcc.mmio_read(offset, 4), 0x100 + i as u32);
    }
  }

  #[test]
  fn pll_reports_ready_once_enabled() {
    let mut rcc = Rcc::new();

    rcc.mmio_write(RCC_CR, 4, 1 << 24);

    assert_eq!(rcc.mmio_read(RCC_CR, 4), (1 << 24) | (1 << 25));
  }

  #[test]
  fn clock_switch_is_reported_in_status() {
    let mut rcc = Rcc::new();

    rcc.mmio_write(RCC_CFGR, 4, 0b10);

    assert_eq!(rcc.mmio_read(RCC_CFGR, 4), 0b1010);
  }

  #[test]
  fn bad_offsets_are_ignored() {
    let mut rcc = Rcc::new();

    rcc.mmio_write(0x28, 4, 0xffff_ffff);

    assert_eq!(rcc.mmio_read(0x28, 4), 0);
    assert_eq!(rcc, Rcc::new());
  }

  #[test]
  fn reset_clears_everything() {
    let mut rcc = Rcc::new();

    rcc.mmio_write(RCC_CR, 4, 0xffff_ffff);
    rcc.mmio_write(RCC_BDCR, 4, 0x8000);
    rcc.reset();

    assert_eq!(rcc, Rcc::new());
  }
}
