//! A Chip-8 virtual machine.
//!
//! The VM owns its memory, registers, stack, screen and keypad, and exposes
//! them as plain state. Hosts drive it through [`clock::Clock`] (or by calling
//! [`chip8::Chip8::step`] and [`chip8::Chip8::tick_timers`] themselves), feed
//! key events through [`chip8::Chip8::set_key_state`], and read back the
//! screen and tone signal after each step.

pub mod chip8;
pub mod clock;
pub mod error;
pub mod font;
pub mod inspect;
pub mod instr;
pub mod keypad;
pub mod rng;
pub mod screen;
pub mod state;

pub use chip8::{Chip8, Config, Rom};
pub use clock::Clock;
pub use error::{Fault, LoadError};
