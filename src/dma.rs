use std::{cell::RefCell, rc::Rc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bus::{AddressSpace, Peripheral};

use self::{
  dma_channel::DmaChannel,
  registers::channel_control_register::ChannelControlRegister,
  request_router::RequestRouter,
  snapshot::{ChannelState, DmaSnapshot}
};

pub mod dma_channel;
pub mod registers;
pub mod request_router;
pub mod snapshot;

pub const MAX_CHANNELS: usize = 7;

/// Size of the register window each controller decodes.
pub const DMA_WINDOW_SIZE: u32 = 0x400;

const DMA_ISR: u32 = 0x00;
const DMA_IFCR: u32 = 0x04;

const CHANNEL_BLOCK_BASE: u32 = 0x08;
const CHANNEL_BLOCK_SIZE: u32 = 20;

const DMA_CCR: u32 = 0x00;
const DMA_CNDTR: u32 = 0x04;
const DMA_CPAR: u32 = 0x08;
const DMA_CMAR: u32 = 0x0c;

#[derive(Debug, Error)]
pub enum DmaError {
  #[error("no target memory is bound to the DMA controller")]
  MissingTargetMemory,
  #[error("channel count {count} is outside 1..={max}")]
  InvalidChannelCount { count: u8, max: usize },
  #[error("saved state has {found} channels but the controller has {expected}")]
  ChannelCountMismatch { expected: u8, found: u8 },
  #[error("DMA save state could not be encoded or decoded: {0}")]
  State(#[from] bincode::Error)
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct DmaConfig {
  pub channel_count: u8
}

impl Default for DmaConfig {
  fn default() -> Self {
    Self {
      channel_count: MAX_CHANNELS as u8
    }
  }
}

/// Multi-channel DMA controller.
///
/// Every request moves exactly one element through the target address space.
/// Transfers never set ISR bits and IFCR writes never clear them: both global
/// registers are plain storage.
pub struct DmaController {
  pub channels: [DmaChannel; MAX_CHANNELS],
  pub isr: u32,
  pub ifcr: u32,
  channel_count: u8,
  router: RequestRouter,
  target: Rc<RefCell<dyn AddressSpace>>
}

impl DmaController {
  pub fn new(config: DmaConfig, target: Option<Rc<RefCell<dyn AddressSpace>>>) -> Result<Self, DmaError> {
    let count = config.channel_count;
    if count == 0 || count as usize > MAX_CHANNELS {
      return Err(DmaError::InvalidChannelCount { count, max: MAX_CHANNELS });
    }

    let target = target.ok_or(DmaError::MissingTargetMemory)?;

    let mut dma = Self {
      channels: [DmaChannel::new(); MAX_CHANNELS],
      isr: 0,
      ifcr: 0,
      channel_count: count,
      router: RequestRouter::new(count),
      target
    };

    dma.reset();

    Ok(dma)
  }

  pub fn channel_count(&self) -> u8 {
    self.channel_count
  }

  pub fn router(&self) -> &RequestRouter {
    &self.router
  }

  pub fn reset(&mut self) {
    debug!("resetting DMA controller with {} channels", self.channel_count);

    self.isr = 0;
    self.ifcr = 0;
    self.channels = [DmaChannel::new(); MAX_CHANNELS];
  }

  /// Splits a channel block offset into channel index and register offset.
  /// Offsets of unimplemented channels decode to `None`.
  fn decode_channel(&self, offset: u32) -> Option<(usize, u32)> {
    let relative = offset.checked_sub(CHANNEL_BLOCK_BASE)?;
    let channel_id = (relative / CHANNEL_BLOCK_SIZE) as usize;

    if channel_id >= self.channel_count as usize {
      return None;
    }

    Some((channel_id, relative % CHANNEL_BLOCK_SIZE))
  }

  pub fn read_register(&self, offset: u32) -> u32 {
    match offset {
      DMA_ISR => self.isr,
      DMA_IFCR => self.ifcr,
      _ => {
        let Some((channel_id, register)) = self.decode_channel(offset) else {
          return 0;
        };
        let channel = &self.channels[channel_id];

        match register {
          DMA_CCR => channel.control.bits(),
          DMA_CNDTR => channel.count,
          DMA_CPAR => channel.peripheral_address,
          DMA_CMAR => channel.memory_address,
          _ => 0
        }
      }
    }
  }

  pub fn write_register(&mut self, offset: u32, value: u32) {
    match offset {
      DMA_ISR => self.isr = value,
      DMA_IFCR => self.ifcr = value,
      _ => {
        let Some((channel_id, register)) = self.decode_channel(offset) else {
          return;
        };
        let channel = &mut self.channels[channel_id];

        match register {
          DMA_CCR => channel.control = ChannelControlRegister::from_bits_retain(value),
          DMA_CNDTR => channel.set_count(value),
          DMA_CPAR => channel.peripheral_address = value,
          DMA_CMAR => channel.memory_address = value,
          _ => ()
        }
      }
    }
  }

  /// Trigger input. Each call is one request, whatever `level` is.
  pub fn request(&mut self, slot: i32, _level: bool) {
    if let Some(channel_id) = self.router.route(slot) {
      self.transfer(channel_id);
    }
  }

  fn transfer(&mut self, channel_id: usize) {
    let channel = &mut self.channels[channel_id];

    if !channel.is_enabled() || channel.count == 0 {
      debug!("ignoring request on idle DMA channel {channel_id}");
      return;
    }

    let transfer = channel.element_transfer();

    let mut target = self.target.borrow_mut();

    let data = target.load_32(transfer.source);
    let previous = target.load_32(transfer.destination);
    let merged = transfer.merge(data, previous);

    target.store_32(transfer.destination, merged);

    trace!(
      "DMA channel {channel_id}: {:#010x} -> {:#010x} = {:#010x}",
      transfer.source, transfer.destination, merged
    );

    channel.advance();
  }

  pub fn snapshot(&self) -> DmaSnapshot {
    let mut channels = [ChannelState::default(); MAX_CHANNELS];

    for (state, channel) in channels.iter_mut().zip(self.channels.iter()) {
      *state = ChannelState::from(channel);
    }

    DmaSnapshot {
      isr: self.isr,
      ifcr: self.ifcr,
      channel_count: self.channel_count,
      channels
    }
  }

  pub fn restore(&mut self, snapshot: &DmaSnapshot) -> Result<(), DmaError> {
    if snapshot.channel_count != self.channel_count {
      return Err(DmaError::ChannelCountMismatch {
        expected: self.channel_count,
        found: snapshot.channel_count
      });
    }

    self.isr = snapshot.isr;
    self.ifcr = snapshot.ifcr;

    for (channel, state) in self.channels.iter_mut().zip(snapshot.channels.iter()) {
      *channel = DmaChannel::from(state);
    }

    Ok(())
  }

  pub fn save_state(&self) -> Result<Vec<u8>, DmaError> {
    Ok(bincode::serialize(&self.snapshot())?)
  }

  pub fn load_state(&mut self, data: &[u8]) -> Result<(), DmaError> {
    let snapshot: DmaSnapshot = bincode::deserialize(data)?;

    debug!("loading DMA state with {} channels", snapshot.channel_count);

    self.restore(&snapshot)
  }
}

impl Peripheral for DmaController {
  fn mmio_read(&mut self, offset: u32, _size: usize) -> u32 {
    self.read_register(offset)
  }

  fn mmio_write(&mut self, offset: u32, _size: usize, value: u32) {
    self.write_register(offset, value)
  }

  fn reset(&mut self) {
    DmaController::reset(self)
  }
}
