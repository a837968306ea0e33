use super::AddressSpace;

/// Byte-addressed linear memory. Offsets past the end read 0 and drop writes.
pub struct Memory {
  bytes: Vec<u8>,
  read_only: bool
}

impl Memory {
  pub fn new(size: usize) -> Self {
    Self {
      bytes: vec![0; size],
      read_only: false
    }
  }

  /// Memory the bus can read but never write. Contents come from [`Memory::load`].
  pub fn rom(size: usize) -> Self {
    Self {
      bytes: vec![0; size],
      read_only: true
    }
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  /// Copies `image` to the start of the region, bypassing the read-only flag.
  /// Bytes beyond the region are dropped.
  pub fn load(&mut self, image: &[u8]) {
    let len = image.len().min(self.bytes.len());
    self.bytes[..len].copy_from_slice(&image[..len]);
  }

  pub fn read_8(&self, offset: u32) -> u8 {
    self.bytes.get(offset as usize).copied().unwrap_or(0)
  }

  pub fn read_16(&self, offset: u32) -> u16 {
    self.read_8(offset) as u16 | ((self.read_8(offset.wrapping_add(1)) as u16) << 8)
  }

  pub fn read_32(&self, offset: u32) -> u32 {
    self.read_16(offset) as u32 | ((self.read_16(offset.wrapping_add(2)) as u32) << 16)
  }

  pub fn write_8(&mut self, offset: u32, val: u8) {
    if self.read_only {
      warn!("write of {:#x} to read-only memory at offset {:#x}", val, offset);
      return;
    }

    if let Some(byte) = self.bytes.get_mut(offset as usize) {
      *byte = val;
    }
  }

  pub fn write_16(&mut self, offset: u32, val: u16) {
    let upper = (val >> 8) as u8;
    let lower = (val & 0xff) as u8;

    self.write_8(offset, lower);
    self.write_8(offset.wrapping_add(1), upper);
  }

  pub fn write_32(&mut self, offset: u32, val: u32) {
    let upper = (val >> 16) as u16;
    let lower = (val & 0xffff) as u16;

    self.write_16(offset, lower);
    self.write_16(offset.wrapping_add(2), upper);
  }
}

/// A bare memory is an address space whose addresses are its offsets.
impl AddressSpace for Memory {
  fn load_32(&mut self, address: u32) -> u32 {
    self.read_32(address)
  }

  fn store_32(&mut self, address: u32, value: u32) {
    self.write_32(address, value)
  }
}
