use super::registers::channel_control_register::{ChannelControlRegister, Direction, ElementSize};

/// One transfer lane: CCR, CNDTR, CPAR and CMAR plus the CNDTR value last
/// written by software.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DmaChannel {
  pub control: ChannelControlRegister,
  pub count: u32,
  pub reload_count: u32,
  pub peripheral_address: u32,
  pub memory_address: u32
}

/// Addresses and widths of one element move, already masked.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ElementTransfer {
  pub source: u32,
  pub source_size: ElementSize,
  pub destination: u32,
  pub destination_size: ElementSize
}

impl ElementTransfer {
  /// Replaces the destination lanes of `destination_word` with the source
  /// lanes of `source_word`. Lanes the destination element does not cover
  /// are kept.
  pub fn merge(&self, source_word: u32, destination_word: u32) -> u32 {
    (destination_word & !self.destination_size.lane_mask()) | (source_word & self.source_size.lane_mask())
  }
}

impl DmaChannel {
  pub fn new() -> Self {
    Self {
      control: ChannelControlRegister::from_bits_retain(0),
      count: 0,
      reload_count: 0,
      peripheral_address: 0,
      memory_address: 0
    }
  }

  /// CNDTR write. Also captures the value circular mode reloads from.
  pub fn set_count(&mut self, value: u32) {
    self.count = value;
    self.reload_count = value;
  }

  pub fn is_enabled(&self) -> bool {
    self.control.contains(ChannelControlRegister::ENABLE)
  }

  pub fn element_transfer(&self) -> ElementTransfer {
    let peripheral_size = self.control.peripheral_size();
    let memory_size = self.control.memory_size();

    let peripheral_address = self.peripheral_address & peripheral_size.address_mask();
    let memory_address = self.memory_address & memory_size.address_mask();

    match self.control.direction() {
      Direction::PeripheralToMemory => ElementTransfer {
        source: peripheral_address,
        source_size: peripheral_size,
        destination: memory_address,
        destination_size: memory_size
      },
      Direction::MemoryToPeripheral => ElementTransfer {
        source: memory_address,
        source_size: memory_size,
        destination: peripheral_address,
        destination_size: peripheral_size
      }
    }
  }

  /// Post-transfer bookkeeping: address increments (always by one), count
  /// decrement and circular reload.
  pub fn advance(&mut self) {
    if self.control.contains(ChannelControlRegister::MEMORY_INCREMENT) {
      self.memory_address = self.memory_address.wrapping_add(1);
    }
    if self.control.contains(ChannelControlRegister::PERIPHERAL_INCREMENT) {
      self.peripheral_address = self.peripheral_address.wrapping_add(1);
    }

    self.count = self.count.saturating_sub(1);

    if self.count == 0 && self.control.contains(ChannelControlRegister::CIRCULAR) {
      self.count = self.reload_count;
    }
  }
}

impl Default for DmaChannel {
  fn default() -> Self {
    Self::new()
  }
}
