use super::MAX_CHANNELS;

/// Name of the trigger input group exposed by every DMA controller.
pub const DMA_REQUEST_SLOTS: &str = "dma-req-slots";

/// Maps named trigger inputs onto channel indices.
///
/// There is always one slot per possible channel. Slots past the configured
/// channel count exist but never route anywhere.
#[derive(Copy, Clone, Debug)]
pub struct RequestRouter {
  channel_count: usize
}

impl RequestRouter {
  pub fn new(channel_count: u8) -> Self {
    Self {
      channel_count: channel_count as usize
    }
  }

  pub fn slot_count(&self) -> usize {
    MAX_CHANNELS
  }

  pub fn slot_name(slot: usize) -> Option<String> {
    (slot < MAX_CHANNELS).then(|| format!("{DMA_REQUEST_SLOTS}[{slot}]"))
  }

  /// Looks up a slot by its `dma-req-slots[n]` name.
  pub fn slot_by_name(&self, name: &str) -> Option<usize> {
    let index = name
      .strip_prefix(DMA_REQUEST_SLOTS)?
      .strip_prefix('[')?
      .strip_suffix(']')?
      .parse::<usize>()
      .ok()?;

    (index < MAX_CHANNELS).then_some(index)
  }

  /// Channel a trigger on `slot` should be delivered to, or `None` when the
  /// slot is negative or past the configured channel count.
  pub fn route(&self, slot: i32) -> Option<usize> {
    usize::try_from(slot)
      .ok()
      .filter(|&channel| channel < self.channel_count)
  }
}
