//! Input handling: event types, key actions, and the input processor
//! that converts raw window events into viewer commands.

/// Commands produced by input and executed by the session.
pub mod command;
/// Platform-agnostic input events.
pub mod event;
/// Bindable keyboard actions.
pub mod keyboard;
/// Converts raw events into viewer commands.
pub mod processor;

pub use command::ViewerCommand;
pub use event::{InputEvent, MouseButton};
pub use keyboard::KeyAction;
pub use processor::InputProcessor;
