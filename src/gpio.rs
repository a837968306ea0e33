use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, FromRepr};

use crate::bus::Peripheral;

use self::pin_mode::{PinMode, CNF_FLOATING_INPUT, MODE_INPUT};

pub mod pin_mode;

pub const PIN_COUNT: usize = 16;

const GPIO_CRL: u32 = 0x00;
const GPIO_CRH: u32 = 0x04;
const GPIO_IDR: u32 = 0x08;
const GPIO_ODR: u32 = 0x0c;
const GPIO_BSRR: u32 = 0x10;
const GPIO_BRR: u32 = 0x14;
const GPIO_LCKR: u32 = 0x18;

const LCKK_BIT: u32 = 0b1 << 16;

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Display, EnumIter, FromRepr)]
#[repr(u8)]
pub enum PortId {
  A = 0,
  B = 1,
  C = 2,
  D = 3,
  E = 4,
  F = 5,
  G = 6
}

/// Output level change on one pin, for the host to observe.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PinChange {
  pub port: PortId,
  pub pin: u8,
  pub level: bool
}

/// 16-pin GPIO port.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GpioPort {
  pub cnf: [u8; PIN_COUNT],
  pub mode: [u8; PIN_COUNT],
  pub outputs: [bool; PIN_COUNT],
  pub idr: u16,
  pub lck: u16,
  pub lckk: bool,
  pub port_id: PortId,
  #[serde(skip_serializing, skip_deserializing)]
  events: VecDeque<PinChange>
}

impl GpioPort {
  pub fn new(port_id: PortId) -> Self {
    let mut port = Self {
      cnf: [0; PIN_COUNT],
      mode: [0; PIN_COUNT],
      outputs: [false; PIN_COUNT],
      idr: 0,
      lck: 0,
      lckk: false,
      port_id,
      events: VecDeque::new()
    };

    port.reset();

    port
  }

  pub fn reset(&mut self) {
    self.cnf = [CNF_FLOATING_INPUT; PIN_COUNT];
    self.mode = [MODE_INPUT; PIN_COUNT];
    self.outputs = [false; PIN_COUNT];
    self.idr = 0;
    self.lck = 0;
    self.lckk = false;
    self.events.clear();
  }

  pub fn pin_mode(&self, pin: usize) -> PinMode {
    PinMode::decode(self.mode[pin], self.cnf[pin])
  }

  /// Drives an input pin from outside the chip.
  pub fn set_input(&mut self, pin: usize, level: bool) {
    if pin < PIN_COUNT {
      let mask = 1 << pin;
      if level {
        self.idr |= mask;
      } else {
        self.idr &= !mask;
      }
    }
  }

  pub fn output(&self, pin: usize) -> bool {
    self.outputs[pin]
  }

  /// Takes every pin change recorded since the last call, oldest first.
  pub fn drain_events(&mut self) -> Vec<PinChange> {
    self.events.drain(..).collect()
  }

  /// CRL covers pins 0-7, CRH pins 8-15. Each pin owns a nibble: CNF in its
  /// low two bits, MODE in the high two.
  fn control_register_read(&self, first_pin: usize) -> u32 {
    let mut value = 0;

    for i in 0..PIN_COUNT / 2 {
      value |= ((self.cnf[first_pin + i] & 0b11) as u32) << (i * 4);
      value |= ((self.mode[first_pin + i] & 0b11) as u32) << (i * 4 + 2);
    }

    value
  }

  fn control_register_write(&mut self, first_pin: usize, value: u32) {
    for i in 0..PIN_COUNT / 2 {
      self.cnf[first_pin + i] = ((value >> (i * 4)) & 0b11) as u8;
      self.mode[first_pin + i] = ((value >> (i * 4 + 2)) & 0b11) as u8;
    }
  }

  fn read_output_data(&self) -> u32 {
    (0..PIN_COUNT)
      .filter(|&pin| self.outputs[pin])
      .fold(0, |value, pin| value | (1 << pin))
  }

  fn set_output(&mut self, pin: usize, level: bool) {
    if self.outputs[pin] != level {
      trace!("GPIO{} pin {pin} -> {}", self.port_id, level as u8);

      self.events.push_back(PinChange {
        port: self.port_id,
        pin: pin as u8,
        level
      });
    }
    self.outputs[pin] = level;
  }

  fn write_output_data(&mut self, value: u32) {
    for pin in 0..PIN_COUNT {
      self.set_output(pin, (value >> pin) & 0b1 == 1);
    }
  }

  /// Set bits win over reset bits for the same pin.
  fn write_set_reset(&mut self, reset: u16, set: u16) {
    for pin in 0..PIN_COUNT {
      if (set >> pin) & 0b1 == 1 {
        self.set_output(pin, true);
      } else if (reset >> pin) & 0b1 == 1 {
        self.set_output(pin, false);
      }
    }
  }
}

impl Peripheral for GpioPort {
  fn mmio_read(&mut self, offset: u32, _size: usize) -> u32 {
    match offset {
      GPIO_CRL => self.control_register_read(0),
      GPIO_CRH => self.control_register_read(PIN_COUNT / 2),
      GPIO_IDR => self.idr as u32,
      GPIO_ODR => self.read_output_data(),
      // write only
      GPIO_BSRR | GPIO_BRR => 0,
      GPIO_LCKR => (if self.lckk { LCKK_BIT } else { 0 }) | self.lck as u32,
      _ => 0
    }
  }

  fn mmio_write(&mut self, offset: u32, _size: usize, value: u32) {
    match offset {
      GPIO_CRL => self.control_register_write(0, value),
      GPIO_CRH => self.control_register_write(PIN_COUNT / 2, value),
      GPIO_ODR => self.write_output_data(value),
      GPIO_BSRR => self.write_set_reset((value >> 16) as u16, value as u16),
      GPIO_BRR => self.write_set_reset(value as u16, 0),
      GPIO_LCKR => {
        self.lckk = value & LCKK_BIT != 0;
        self.lck = value as u16;
      }
      // IDR is read only
      _ => ()
    }
  }

  fn reset(&mut self) {
    GpioPort::reset(self)
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::pin_mode::{InputConfig, OutputConfig, OutputSpeed};
  use super::*;

  #[test]
  fn reset_leaves_floating_inputs() {
    let port = GpioPort::new(PortId::C);

    for pin in 0..PIN_COUNT {
      assert_eq!(port.pin_mode(pin), PinMode::Input(InputConfig::Floating));
    }
  }

  #[test]
  fn control_registers_round_trip() {
    let mut port = GpioPort::new(PortId::A);

    port.mmio_write(GPIO_CRL, 4, 0x1234_5678);
    port.mmio_write(GPIO_CRH, 4, 0x8765_4321);

    assert_eq!(port.mmio_read(GPIO_CRL, 4), 0x1234_5678);
    assert_eq!(port.mmio_read(GPIO_CRH, 4), 0x8765_4321);

    // pin 8 nibble is 0x1: CNF 1, MODE 0
    assert_eq!(port.pin_mode(8), PinMode::Input(InputConfig::Floating));
    // pin 1 nibble is 0x7: CNF 3, MODE 1
    assert_eq!(port.pin_mode(1), PinMode::Output(OutputSpeed::Mhz10, OutputConfig::AlternateOpenDrain));
  }

  #[test]
  fn output_data_write_reports_changed_pins() {
    let mut port = GpioPort::new(PortId::B);

    port.mmio_write(GPIO_ODR, 4, 0b1010);
    port.mmio_write(GPIO_ODR, 4, 0b0010);

    assert_eq!(port.mmio_read(GPIO_ODR, 4), 0b0010);
    assert_eq!(
      port.drain_events(),
      vec![
        PinChange { port: PortId::B, pin: 1, level: true },
        PinChange { port: PortId::B, pin: 3, level: true },
        PinChange { port: PortId::B, pin: 3, level: false }
      ]
    );
    assert!(port.drain_events().is_empty());
  }

  #[test]
  fn set_wins_over_reset() {
    let mut port = GpioPort::new(PortId::A);

    port.mmio_write(GPIO_BSRR, 4, (0b11 << 16) | 0b01);

    assert!(port.output(0));
    assert!(!port.output(1));
    assert_eq!(port.drain_events().len(), 1);

    port.mmio_write(GPIO_BRR, 4, 0b1);
    assert!(!port.output(0));
    assert_eq!(port.drain_events(), vec![PinChange { port: PortId::A, pin: 0, level: false }]);

    assert_eq!(port.mmio_read(GPIO_BSRR, 4), 0);
    assert_eq!(port.mmio_read(GPIO_BRR, 4), 0);
  }

  #[test]
  fn input_data_follows_external_drive_only() {
    let mut port = GpioPort::new(PortId::D);

    port.set_input(15, true);
    port.set_input(2, true);
    port.set_input(2, false);
    port.mmio_write(GPIO_IDR, 4, 0xffff);

    assert_eq!(port.mmio_read(GPIO_IDR, 4), 0x8000);
  }

  #[test]
  fn lock_register_keeps_key_bit() {
    let mut port = GpioPort::new(PortId::A);

    port.mmio_write(GPIO_LCKR, 4, LCKK_BIT | 0x00f0);

    assert_eq!(port.mmio_read(GPIO_LCKR, 4), LCKK_BIT | 0x00f0);
  }

  #[test]
  fn port_ids_display_as_letters() {
    let names: Vec<String> = PortId::iter().map(|id| id.to_string()).collect();

    assert_eq!(names, ["A", "B", "C", "D", "E", "F", "G"]);
  }
}
