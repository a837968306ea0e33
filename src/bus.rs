use crate::{gpio::GpioPort, rcc::Rcc};

use self::memory::Memory;

pub mod memory;

/// Width in bytes of every access accepted by a peripheral register window.
pub const MMIO_ACCESS_SIZE: usize = 4;

pub const FLASH_ALIAS_BASE: u32 = 0x0000_0000;
pub const FLASH_BASE_ADDRESS: u32 = 0x0800_0000;
pub const FLASH_SIZE: usize = 512 * 1024;

pub const SRAM_BASE_ADDRESS: u32 = 0x2000_0000;
pub const SRAM_SIZE: usize = 64 * 1024;

pub const GPIO_BASE_ADDRESS: u32 = 0x4001_0800;
pub const GPIO_WINDOW_SIZE: u32 = 0x400;

pub const RCC_BASE_ADDRESS: u32 = 0x4002_1000;
pub const RCC_WINDOW_SIZE: u32 = 0x28;

/// Memory view a DMA engine moves data through.
///
/// Both accesses are 32 bits wide and little-endian. The address is not
/// required to be aligned.
pub trait AddressSpace {
  fn load_32(&mut self, address: u32) -> u32;
  fn store_32(&mut self, address: u32, value: u32);
}

/// A device exposing a memory-mapped register window.
///
/// Offsets are relative to the start of the window. Accesses of a width other
/// than [`MMIO_ACCESS_SIZE`] are filtered out by the bus before they get here.
pub trait Peripheral {
  fn mmio_read(&mut self, offset: u32, size: usize) -> u32;
  fn mmio_write(&mut self, offset: u32, size: usize, value: u32);
  fn reset(&mut self);
}

/// Checks an access width against the fixed register width.
pub fn mmio_access_valid(address: u32, size: usize) -> bool {
  if size != MMIO_ACCESS_SIZE {
    warn!("rejected {size}-byte register access at {:#010x}", address);
    return false;
  }

  true
}

pub fn mmio_read<P: Peripheral + ?Sized>(device: &mut P, base: u32, address: u32, size: usize) -> u32 {
  if !mmio_access_valid(address, size) {
    return 0;
  }

  device.mmio_read(address - base, size)
}

pub fn mmio_write<P: Peripheral + ?Sized>(device: &mut P, base: u32, address: u32, size: usize, value: u32) {
  if mmio_access_valid(address, size) {
    device.mmio_write(address - base, size, value);
  }
}

/// Flash, SRAM and the register windows of every peripheral except the DMA
/// controllers, which sit in front of the bus rather than on it.
pub struct SystemBus {
  pub flash: Memory,
  pub sram: Memory,
  pub gpio: Vec<GpioPort>,
  pub rcc: Rcc
}

enum Region {
  Flash(u32),
  Sram(u32),
  Gpio(usize, u32),
  Rcc(u32),
  Unmapped
}

impl SystemBus {
  pub fn new(gpio: Vec<GpioPort>) -> Self {
    Self {
      flash: Memory::rom(FLASH_SIZE),
      sram: Memory::new(SRAM_SIZE),
      gpio,
      rcc: Rcc::new()
    }
  }

  fn decode(&self, address: u32) -> Region {
    let flash_end = FLASH_SIZE as u32;
    let sram_end = SRAM_SIZE as u32;
    let gpio_end = GPIO_BASE_ADDRESS + GPIO_WINDOW_SIZE * self.gpio.len() as u32;

    match address {
      a if a.wrapping_sub(FLASH_ALIAS_BASE) < flash_end => Region::Flash(a - FLASH_ALIAS_BASE),
      a if a.wrapping_sub(FLASH_BASE_ADDRESS) < flash_end => Region::Flash(a - FLASH_BASE_ADDRESS),
      a if a.wrapping_sub(SRAM_BASE_ADDRESS) < sram_end => Region::Sram(a - SRAM_BASE_ADDRESS),
      a if a >= GPIO_BASE_ADDRESS && a < gpio_end => {
        let port = (a - GPIO_BASE_ADDRESS) / GPIO_WINDOW_SIZE;
        Region::Gpio(port as usize, GPIO_BASE_ADDRESS + port * GPIO_WINDOW_SIZE)
      }
      a if a.wrapping_sub(RCC_BASE_ADDRESS) < RCC_WINDOW_SIZE => Region::Rcc(RCC_BASE_ADDRESS),
      _ => Region::Unmapped
    }
  }

  /// Sized read. Memory accepts 1, 2 and 4 byte accesses, register windows
  /// only accept 4.
  pub fn read(&mut self, address: u32, size: usize) -> u32 {
    match self.decode(address) {
      Region::Flash(offset) => Self::memory_read(&self.flash, offset, size),
      Region::Sram(offset) => Self::memory_read(&self.sram, offset, size),
      Region::Gpio(port, base) => mmio_read(&mut self.gpio[port], base, address, size),
      Region::Rcc(base) => mmio_read(&mut self.rcc, base, address, size),
      Region::Unmapped => {
        warn!("read from unmapped address {:#010x}", address);
        0
      }
    }
  }

  pub fn write(&mut self, address: u32, size: usize, value: u32) {
    match self.decode(address) {
      Region::Flash(offset) => Self::memory_write(&mut self.flash, offset, size, value),
      Region::Sram(offset) => Self::memory_write(&mut self.sram, offset, size, value),
      Region::Gpio(port, base) => mmio_write(&mut self.gpio[port], base, address, size, value),
      Region::Rcc(base) => mmio_write(&mut self.rcc, base, address, size, value),
      Region::Unmapped => warn!("write of {:#x} to unmapped address {:#010x}", value, address)
    }
  }

  fn memory_read(memory: &Memory, offset: u32, size: usize) -> u32 {
    match size {
      1 => memory.read_8(offset) as u32,
      2 => memory.read_16(offset) as u32,
      4 => memory.read_32(offset),
      _ => {
        warn!("unsupported {size}-byte memory read");
        0
      }
    }
  }

  fn memory_write(memory: &mut Memory, offset: u32, size: usize, value: u32) {
    match size {
      1 => memory.write_8(offset, value as u8),
      2 => memory.write_16(offset, value as u16),
      4 => memory.write_32(offset, value),
      _ => warn!("unsupported {size}-byte memory write")
    }
  }

  /// Resets every register window on the bus. Memory contents are kept.
  pub fn reset(&mut self) {
    for port in self.gpio.iter_mut() {
      port.reset();
    }
    self.rcc.reset();
  }
}

impl AddressSpace for SystemBus {
  fn load_32(&mut self, address: u32) -> u32 {
    self.read(address, 4)
  }

  fn store_32(&mut self, address: u32, value: u32) {
    self.write(address, 4, value)
  }
}

#[cfg(test)]
mod tests {
  use crate::gpio::PortId;

  use super::*;

  fn bus() -> SystemBus {
    SystemBus::new(vec![GpioPort::new(PortId::A), GpioPort::new(PortId::B)])
  }

  #[test]
  fn sram_is_little_endian() {
    let mut bus = bus();

    bus.store_32(SRAM_BASE_ADDRESS, 0x4433_2211);

    assert_eq!(bus.read(SRAM_BASE_ADDRESS, 1), 0x11);
    assert_eq!(bus.read(SRAM_BASE_ADDRESS + 1, 2), 0x3322);
    assert_eq!(bus.load_32(SRAM_BASE_ADDRESS + 1), 0x0044_3322);
  }

  #[test]
  fn flash_alias_mirrors_flash_and_rejects_writes() {
    let mut bus = bus();

    bus.flash.load(&[0xaa, 0xbb, 0xcc, 0xdd]);
    bus.store_32(FLASH_BASE_ADDRESS, 0);

    assert_eq!(bus.load_32(FLASH_ALIAS_BASE), 0xddcc_bbaa);
    assert_eq!(bus.load_32(FLASH_BASE_ADDRESS), 0xddcc_bbaa);
  }

  #[test]
  fn gpio_windows_are_decoded_per_port() {
    let mut bus = bus();

    bus.store_32(GPIO_BASE_ADDRESS + GPIO_WINDOW_SIZE + 0x0c, 0b101);

    assert_eq!(bus.load_32(GPIO_BASE_ADDRESS + 0x0c), 0);
    assert_eq!(bus.load_32(GPIO_BASE_ADDRESS + GPIO_WINDOW_SIZE + 0x0c), 0b101);
  }

  #[test]
  fn narrow_register_access_is_rejected() {
    let mut bus = bus();

    bus.write(RCC_BASE_ADDRESS + 0x14, 2, 0xffff);

    assert_eq!(bus.read(RCC_BASE_ADDRESS + 0x14, 4), 0);
    assert_eq!(bus.read(RCC_BASE_ADDRESS + 0x14, 1), 0);
  }

  #[test]
  fn unmapped_addresses_read_zero() {
    let mut bus = bus();

    bus.store_32(0x6000_0000, 0x1234);

    assert_eq!(bus.load_32(0x6000_0000), 0);
  }
}
