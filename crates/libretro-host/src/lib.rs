#![doc = include_str!("../README.md")]

mod core;
mod environment;
mod game;
mod host;
mod input;
mod video;

/// Hand-maintained bindings for the subset of `libretro.h` the host uses.
#[allow(non_camel_case_types, non_snake_case, non_upper_case_globals)]
pub mod raw;

pub use crate::core::{
    Core, GameGeometry, HostCallbacks, LoadError, SystemAvInfo, SystemInfo, SystemTiming,
};
pub use crate::environment::NegotiatedState;
pub use crate::game::{GameError, load_game};
pub use crate::host::{Session, SessionError};
pub use crate::input::{BINDINGS, HostKey, InputSnapshot, InputState, PointerState};
pub use crate::video::{ConvertError, FrameBuffer, PixelFormat};

#[cfg(test)]
mod tests;
