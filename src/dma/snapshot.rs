use serde::{Deserialize, Serialize};

use super::{dma_channel::DmaChannel, registers::channel_control_register::ChannelControlRegister, MAX_CHANNELS};

/// Saved registers of one channel, in save-state field order.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelState {
  pub ccr: u32,
  pub cndtr: u32,
  pub reload_cndtr: u32,
  pub cpar: u32,
  pub cmar: u32
}

/// Complete controller state. Every channel slot is saved, configured or not,
/// so the encoded image always has the same size.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DmaSnapshot {
  pub isr: u32,
  pub ifcr: u32,
  pub channel_count: u8,
  pub channels: [ChannelState; MAX_CHANNELS]
}

impl From<&DmaChannel> for ChannelState {
  fn from(channel: &DmaChannel) -> Self {
    Self {
      ccr: channel.control.bits(),
      cndtr: channel.count,
      reload_cndtr: channel.reload_count,
      cpar: channel.peripheral_address,
      cmar: channel.memory_address
    }
  }
}

impl From<&ChannelState> for DmaChannel {
  fn from(state: &ChannelState) -> Self {
    Self {
      control: ChannelControlRegister::from_bits_retain(state.ccr),
      count: state.cndtr,
      reload_count: state.reload_cndtr,
      peripheral_address: state.cpar,
      memory_address: state.cmar
    }
  }
}
