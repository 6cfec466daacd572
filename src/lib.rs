//! Nintendo Switch Pro Controller emulation core: HID report state
//! machine, subcommand responder with simulated SPI ROM, periodic input
//! ticker, and input-state model with six-axis synthesis. Provisioning the
//! USB gadget device node, loading key-mapping configuration, and
//! discovering keyboard/mouse event sources are external concerns left to
//! callers of this crate.

pub mod controller;
pub mod error;
pub mod input;
pub mod report;
pub mod spi;
pub mod subcommand;
pub mod ticker;
pub mod transport;

pub use controller::Controller;
pub use error::GadgetError;
pub use input::{Input, InputCode};
