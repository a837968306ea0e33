use std::{cell::RefCell, collections::HashMap, rc::Rc};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::{
  bus::{self, AddressSpace, SystemBus, FLASH_SIZE},
  dma::{snapshot::DmaSnapshot, DmaConfig, DmaController, DmaError, DMA_WINDOW_SIZE},
  gpio::{GpioPort, PinChange, PortId},
  rcc::Rcc
};

pub const DMA_BASE_ADDRESSES: [u32; 2] = [0x4002_0000, 0x4002_0400];

/// Peripherals able to raise DMA requests.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum RequestSource {
  Adc1,
  Adc2,
  Adc3
}

/// Wires a request source to a named trigger input of one DMA controller.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RequestRoute {
  pub source: RequestSource,
  pub controller: usize,
  pub slot: String
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SocConfig {
  pub dma_channel_counts: Vec<u8>,
  pub request_map: Vec<RequestRoute>,
  pub gpio_port_count: usize
}

impl Default for SocConfig {
  fn default() -> Self {
    Self {
      dma_channel_counts: vec![7, 5],
      request_map: vec![
        RequestRoute {
          source: RequestSource::Adc1,
          controller: 0,
          slot: "dma-req-slots[0]".to_string()
        },
        RequestRoute {
          source: RequestSource::Adc3,
          controller: 1,
          slot: "dma-req-slots[4]".to_string()
        }
      ],
      gpio_port_count: 7
    }
  }
}

#[derive(Debug, Error)]
pub enum SocError {
  #[error(transparent)]
  Dma(#[from] DmaError),
  #[error("{count} DMA controllers configured but only {max} are mapped")]
  TooManyDmaControllers { count: usize, max: usize },
  #[error("{count} GPIO ports configured but only {max} exist")]
  TooManyGpioPorts { count: usize, max: usize },
  #[error("{request} is routed to DMA controller {controller}, which does not exist")]
  UnknownController { request: RequestSource, controller: usize },
  #[error("no DMA request slot named {0:?}")]
  UnknownRequestSlot(String),
  #[error("firmware image of {len} bytes does not fit in {max} bytes of flash")]
  FirmwareTooLarge { len: usize, max: usize },
  #[error("save state does not match this SoC: {0}")]
  StateMismatch(&'static str),
  #[error("save state could not be encoded or decoded: {0}")]
  State(#[from] bincode::Error)
}

#[derive(Copy, Clone, Debug)]
struct RequestLine {
  controller: usize,
  slot: i32
}

#[derive(Serialize, Deserialize)]
struct SocState {
  dma: Vec<DmaSnapshot>,
  gpio: Vec<GpioPort>,
  rcc: Rcc
}

/// The peripheral segment: system bus with memories, GPIO ports and the
/// clock block, plus the DMA controllers that move data across it.
pub struct Soc {
  pub bus: Rc<RefCell<SystemBus>>,
  pub dma: Vec<DmaController>,
  routes: HashMap<RequestSource, RequestLine>
}

impl Soc {
  pub fn new(config: SocConfig) -> Result<Self, SocError> {
    let max_ports = PortId::G as usize + 1;
    if config.gpio_port_count > max_ports {
      return Err(SocError::TooManyGpioPorts { count: config.gpio_port_count, max: max_ports });
    }
    if config.dma_channel_counts.len() > DMA_BASE_ADDRESSES.len() {
      return Err(SocError::TooManyDmaControllers {
        count: config.dma_channel_counts.len(),
        max: DMA_BASE_ADDRESSES.len()
      });
    }

    let gpio = (0..config.gpio_port_count)
      .filter_map(|i| PortId::from_repr(i as u8))
      .map(GpioPort::new)
      .collect();

    let bus = Rc::new(RefCell::new(SystemBus::new(gpio)));
    let target: Rc<RefCell<dyn AddressSpace>> = bus.clone();

    let dma = config
      .dma_channel_counts
      .iter()
      .map(|&channel_count| DmaController::new(DmaConfig { channel_count }, Some(target.clone())))
      .collect::<Result<Vec<_>, _>>()?;

    let mut routes = HashMap::new();

    for route in &config.request_map {
      let controller = dma.get(route.controller).ok_or(SocError::UnknownController {
        request: route.source,
        controller: route.controller
      })?;

      let slot = controller
        .router()
        .slot_by_name(&route.slot)
        .ok_or_else(|| SocError::UnknownRequestSlot(route.slot.clone()))?;

      routes.insert(route.source, RequestLine {
        controller: route.controller,
        slot: slot as i32
      });
    }

    Ok(Self { bus, dma, routes })
  }

  fn dma_window(&self, address: u32) -> Option<(usize, u32)> {
    DMA_BASE_ADDRESSES
      .iter()
      .take(self.dma.len())
      .position(|&base| address.wrapping_sub(base) < DMA_WINDOW_SIZE)
      .map(|index| (index, DMA_BASE_ADDRESSES[index]))
  }

  pub fn read(&mut self, address: u32, size: usize) -> u32 {
    match self.dma_window(address) {
      Some((index, base)) => bus::mmio_read(&mut self.dma[index], base, address, size),
      None => self.bus.borrow_mut().read(address, size)
    }
  }

  pub fn write(&mut self, address: u32, size: usize, value: u32) {
    match self.dma_window(address) {
      Some((index, base)) => bus::mmio_write(&mut self.dma[index], base, address, size, value),
      None => self.bus.borrow_mut().write(address, size, value)
    }
  }

  /// Delivers one request from `source`. Unrouted sources are dropped.
  pub fn raise_request(&mut self, source: RequestSource, level: bool) {
    if let Some(line) = self.routes.get(&source) {
      self.dma[line.controller].request(line.slot, level);
    }
  }

  pub fn load_firmware(&mut self, image: &[u8]) -> Result<(), SocError> {
    if image.len() > FLASH_SIZE {
      return Err(SocError::FirmwareTooLarge { len: image.len(), max: FLASH_SIZE });
    }

    self.bus.borrow_mut().flash.load(image);

    Ok(())
  }

  /// Resets every peripheral. Flash and SRAM keep their contents.
  pub fn reset(&mut self) {
    self.bus.borrow_mut().reset();

    for dma in self.dma.iter_mut() {
      dma.reset();
    }
  }

  pub fn drain_pin_events(&mut self) -> Vec<PinChange> {
    self
      .bus
      .borrow_mut()
      .gpio
      .iter_mut()
      .flat_map(|port| port.drain_events())
      .collect()
  }

  pub fn create_save_state(&self) -> Result<Vec<u8>, SocError> {
    let bus = self.bus.borrow();

    let state = SocState {
      dma: self.dma.iter().map(|dma| dma.snapshot()).collect(),
      gpio: bus.gpio.clone(),
      rcc: bus.rcc.clone()
    };

    debug!("creating save state for {} DMA controllers", state.dma.len());

    Ok(bincode::serialize(&state)?)
  }

  /// Loads a save state produced by a SoC built from the same configuration.
  /// Nothing is modified when the state does not fit.
  pub fn load_save_state(&mut self, data: &[u8]) -> Result<(), SocError> {
    let state: SocState = bincode::deserialize(data)?;

    if state.dma.len() != self.dma.len() {
      return Err(SocError::StateMismatch("DMA controller count differs"));
    }

    let mut bus = self.bus.borrow_mut();

    if state.gpio.len() != bus.gpio.len() {
      return Err(SocError::StateMismatch("GPIO port count differs"));
    }
    let mismatch = self
      .dma
      .iter()
      .zip(state.dma.iter())
      .find(|(dma, snapshot)| dma.channel_count() != snapshot.channel_count);

    if let Some((dma, snapshot)) = mismatch {
      return Err(DmaError::ChannelCountMismatch {
        expected: dma.channel_count(),
        found: snapshot.channel_count
      }.into());
    }

    for (dma, snapshot) in self.dma.iter_mut().zip(state.dma.iter()) {
      dma.restore(snapshot)?;
    }

    bus.gpio = state.gpio;
    bus.rcc = state.rcc;

    debug!("loaded save state");

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn default_config_builds_the_board() {
    let soc = Soc::new(SocConfig::default()).unwrap();

    assert_eq!(soc.dma.len(), 2);
    assert_eq!(soc.dma[0].channel_count(), 7);
    assert_eq!(soc.dma[1].channel_count(), 5);
    assert_eq!(soc.bus.borrow().gpio.len(), 7);
    assert!(soc.routes.get(&RequestSource::Adc2).is_none());
  }

  #[test]
  fn unknown_slot_names_are_rejected() {
    let mut config = SocConfig::default();
    config.request_map[0].slot = "dma-req-slots[9]".to_string();

    assert!(matches!(Soc::new(config), Err(SocError::UnknownRequestSlot(_))));
  }

  #[test]
  fn routes_to_missing_controllers_are_rejected() {
    let config = SocConfig {
      dma_channel_counts: vec![7],
      ..SocConfig::default()
    };

    assert!(matches!(
      Soc::new(config),
      Err(SocError::UnknownController { request: RequestSource::Adc3, controller: 1 })
    ));
  }

  #[test]
  fn bad_channel_counts_surface_as_dma_errors() {
    let config = SocConfig {
      dma_channel_counts: vec![7, 9],
      ..SocConfig::default()
    };

    assert!(matches!(Soc::new(config), Err(SocError::Dma(DmaError::InvalidChannelCount { count: 9, .. }))));
  }

  #[test]
  fn config_limits_are_checked() {
    let config = SocConfig {
      dma_channel_counts: vec![7, 5, 3],
      ..SocConfig::default()
    };
    assert!(matches!(Soc::new(config), Err(SocError::TooManyDmaControllers { count: 3, max: 2 })));

    let config = SocConfig {
      gpio_port_count: 8,
      ..SocConfig::default()
    };
    assert!(matches!(Soc::new(config), Err(SocError::TooManyGpioPorts { count: 8, max: 7 })));
  }

  #[test]
  fn request_sources_parse_from_names() {
    for source in RequestSource::iter() {
      assert_eq!(source.to_string().parse::<RequestSource>().unwrap(), source);
    }
  }

  #[test]
  fn oversized_firmware_is_rejected() {
    let mut soc = Soc::new(SocConfig::default()).unwrap();

    let result = soc.load_firmware(&vec![0; FLASH_SIZE + 1]);

    assert!(matches!(result, Err(SocError::FirmwareTooLarge { .. })));
  }
}
