use serde::{Deserialize, Serialize};

/// A contiguous bit range inside a 32-bit register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegisterField {
  pub shift: u32,
  pub width: u32
}

impl RegisterField {
  pub const fn new(shift: u32, width: u32) -> Self {
    Self { shift, width }
  }

  pub fn mask(&self) -> u32 {
    (((1u64 << self.width) - 1) as u32) << self.shift
  }

  pub fn get(&self, value: u32) -> u32 {
    (value & self.mask()) >> self.shift
  }

  /// Returns `value` with this field replaced by the low bits of `field`.
  pub fn set(&self, value: u32, field: u32) -> u32 {
    (value & !self.mask()) | ((field << self.shift) & self.mask())
  }
}

/// RCC_CR
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct ClockControlRegister(pub u32);

impl ClockControlRegister {
  pub const HSI_ON: RegisterField = RegisterField::new(0, 1);
  pub const HSI_READY: RegisterField = RegisterField::new(1, 1);
  pub const HSE_ON: RegisterField = RegisterField::new(16, 1);
  pub const HSE_READY: RegisterField = RegisterField::new(17, 1);
  pub const PLL_ON: RegisterField = RegisterField::new(24, 1);
  pub const PLL_READY: RegisterField = RegisterField::new(25, 1);

  pub fn get(&self, field: RegisterField) -> u32 {
    field.get(self.0)
  }

  pub fn set(&mut self, field: RegisterField, value: u32) {
    self.0 = field.set(self.0, value);
  }

  /// Oscillators and the PLL lock as soon as they are switched on.
  pub fn write(&mut self, value: u32) {
    self.0 = value;

    self.set(Self::HSI_READY, self.get(Self::HSI_ON));
    self.set(Self::HSE_READY, self.get(Self::HSE_ON));
    self.set(Self::PLL_READY, self.get(Self::PLL_ON));
  }
}

/// RCC_CFGR
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct ClockConfigRegister(pub u32);

impl ClockConfigRegister {
  pub const SYSTEM_CLOCK_SWITCH: RegisterField = RegisterField::new(0, 2);
  pub const SYSTEM_CLOCK_STATUS: RegisterField = RegisterField::new(2, 2);

  pub fn get(&self, field: RegisterField) -> u32 {
    field.get(self.0)
  }

  pub fn set(&mut self, field: RegisterField, value: u32) {
    self.0 = field.set(self.0, value);
  }

  /// The clock switch takes effect immediately.
  pub fn write(&mut self, value: u32) {
    self.0 = value;

    self.set(Self::SYSTEM_CLOCK_STATUS, self.get(Self::SYSTEM_CLOCK_SWITCH));
  }
}
