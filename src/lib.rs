#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate log;

pub mod bus;
pub mod dma;
pub mod gpio;
pub mod rcc;
pub mod soc;
