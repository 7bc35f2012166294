//! Keyboard input: key decoding, modes, dispatch and completion

pub mod command;
pub mod completion;
pub mod key;
pub mod mode;
