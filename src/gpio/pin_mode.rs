use strum_macros::FromRepr;

pub const MODE_INPUT: u8 = 0;
pub const CNF_FLOATING_INPUT: u8 = 1;

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum InputConfig {
  Analog = 0,
  Floating = 1,
  PullUpDown = 2,
  Reserved = 3
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum OutputConfig {
  PushPull = 0,
  OpenDrain = 1,
  AlternatePushPull = 2,
  AlternateOpenDrain = 3
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum OutputSpeed {
  Mhz10 = 1,
  Mhz2 = 2,
  Mhz50 = 3
}

/// Pin function selected by a MODE/CNF pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PinMode {
  Input(InputConfig),
  Output(OutputSpeed, OutputConfig)
}

impl PinMode {
  pub fn decode(mode: u8, cnf: u8) -> Self {
    let cnf = cnf & 0b11;

    match OutputSpeed::from_repr(mode & 0b11) {
      Some(speed) => PinMode::Output(speed, OutputConfig::from_repr(cnf).unwrap_or(OutputConfig::PushPull)),
      None => PinMode::Input(InputConfig::from_repr(cnf).unwrap_or(InputConfig::Analog))
    }
  }
}
