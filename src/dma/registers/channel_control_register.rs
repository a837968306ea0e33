use strum_macros::FromRepr;

const PERIPHERAL_SIZE_SHIFT: u32 = 8;
const MEMORY_SIZE_SHIFT: u32 = 10;
const PRIORITY_SHIFT: u32 = 12;

bitflags! {
  #[derive(Copy, Clone, Debug, PartialEq, Eq)]
  pub struct ChannelControlRegister: u32 {
    const ENABLE = 0b1;
    const TRANSFER_COMPLETE_IRQ_ENABLE = 0b1 << 1;
    const HALF_TRANSFER_IRQ_ENABLE = 0b1 << 2;
    const TRANSFER_ERROR_IRQ_ENABLE = 0b1 << 3;
    const DIRECTION = 0b1 << 4;
    const CIRCULAR = 0b1 << 5;
    const PERIPHERAL_INCREMENT = 0b1 << 6;
    const MEMORY_INCREMENT = 0b1 << 7;
    const MEMORY_TO_MEMORY = 0b1 << 14;
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
  PeripheralToMemory,
  MemoryToPeripheral
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum ElementSize {
  Byte = 0,
  HalfWord = 1,
  Word = 2
}

impl ElementSize {
  /// Decodes a 2-bit size field. The reserved encoding 0b11 behaves as a word.
  pub fn from_bits(bits: u32) -> Self {
    Self::from_repr(bits & 0b11).unwrap_or(ElementSize::Word)
  }

  /// Mask applied to an address register before the 32-bit window access.
  pub fn address_mask(&self) -> u32 {
    match self {
      ElementSize::Byte => 0xffff_ffff,
      ElementSize::HalfWord => 0xffff_fffe,
      ElementSize::Word => 0xffff_fffc
    }
  }

  /// Byte lanes of a 32-bit window occupied by one element.
  pub fn lane_mask(&self) -> u32 {
    match self {
      ElementSize::Byte => 0xff,
      ElementSize::HalfWord => 0xffff,
      ElementSize::Word => 0xffff_ffff
    }
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum Priority {
  Low = 0,
  Medium = 1,
  High = 2,
  VeryHigh = 3
}

impl ChannelControlRegister {
  pub fn direction(&self) -> Direction {
    if self.contains(Self::DIRECTION) {
      Direction::MemoryToPeripheral
    } else {
      Direction::PeripheralToMemory
    }
  }

  pub fn peripheral_size(&self) -> ElementSize {
    ElementSize::from_bits(self.bits() >> PERIPHERAL_SIZE_SHIFT)
  }

  pub fn memory_size(&self) -> ElementSize {
    ElementSize::from_bits(self.bits() >> MEMORY_SIZE_SHIFT)
  }

  // stored and reported only, channels are never arbitrated
  pub fn priority(&self) -> Priority {
    Priority::from_repr((self.bits() >> PRIORITY_SHIFT) & 0b11).unwrap_or(Priority::Low)
  }
}
