//! Converts raw platform events into viewer commands.
//!
//! The `InputProcessor` owns all transient input state (cursor tracking,
//! held buttons, modifier keys) and the key-binding map. It is the only
//! thing that sits between raw window events and the session's
//! [`execute`](crate::session::ViewerSession::execute) method.

use glam::Vec2;

use super::command::ViewerCommand;
use super::event::{InputEvent, MouseButton};
use crate::camera::PointerMode;
use crate::options::{KeybindingOptions, Options};

/// Zoom units per pixel of vertical middle-button drag.
const DRAG_ZOOM_SCALE: f32 = 0.02;

/// Buttons currently held down.
#[derive(Debug, Clone, Copy, Default)]
struct HeldButtons {
    left: bool,
    right: bool,
    middle: bool,
}

/// Converts raw window events into [`ViewerCommand`]s.
///
/// Gestures: left drag orbits, right drag or shift + left drag pans,
/// middle drag and the scroll wheel zoom.
///
/// # Usage
///
/// ```ignore
/// // In the event loop:
/// if let Some(cmd) = input_processor.handle_event(event) {
///     session.execute(cmd);
/// }
///
/// if let Some(cmd) = input_processor.handle_key_press("KeyF") {
///     session.execute(cmd);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct InputProcessor {
    /// Last cursor position in physical pixels.
    cursor: Option<Vec2>,
    held: HeldButtons,
    /// Whether the shift modifier is currently held.
    shift_pressed: bool,
    /// Key string → action mapping.
    key_bindings: KeybindingOptions,
    /// Whether the focus action keeps the current angle.
    focus_maintains_angle: bool,
}

impl InputProcessor {
    /// Create a processor with custom key bindings.
    #[must_use]
    pub fn new(key_bindings: KeybindingOptions, focus_maintains_angle: bool) -> Self {
        Self {
            cursor: None,
            held: HeldButtons::default(),
            shift_pressed: false,
            key_bindings,
            focus_maintains_angle,
        }
    }

    /// Create a processor from the key bindings and framing options.
    #[must_use]
    pub fn from_options(options: &Options) -> Self {
        Self::new(
            options.keybindings.clone(),
            options.framing.maintain_angle,
        )
    }

    /// Last cursor position in physical pixels.
    #[must_use]
    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor
    }

    /// Whether any mouse button is held.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.held.left || self.held.right || self.held.middle
    }

    /// Whether the shift modifier is held.
    #[must_use]
    pub fn shift_pressed(&self) -> bool {
        self.shift_pressed
    }

    /// Read-only access to the key bindings.
    #[must_use]
    pub fn key_bindings(&self) -> &KeybindingOptions {
        &self.key_bindings
    }

    /// Replace the key bindings and focus behavior after an options change.
    pub fn apply_options(&mut self, options: &Options) {
        self.key_bindings = options.keybindings.clone();
        self.focus_maintains_angle = options.framing.maintain_angle;
    }

    /// Forget held buttons, e.g. when the window loses focus mid-drag.
    pub fn release_buttons(&mut self) {
        self.held = HeldButtons::default();
    }

    /// Look up a key press and return the corresponding command, if bound.
    #[must_use]
    pub fn handle_key_press(&self, key: &str) -> Option<ViewerCommand> {
        self.key_bindings
            .lookup(key)
            .map(|action| action.to_command(self.focus_maintains_angle))
    }

    /// Process a raw input event and return zero or one commands.
    pub fn handle_event(&mut self, event: InputEvent) -> Option<ViewerCommand> {
        match event {
            InputEvent::CursorMoved { x, y } => {
                self.handle_cursor_moved(Vec2::new(x, y))
            }
            InputEvent::MouseButton { button, pressed } => {
                match button {
                    MouseButton::Left => self.held.left = pressed,
                    MouseButton::Right => self.held.right = pressed,
                    MouseButton::Middle => self.held.middle = pressed,
                }
                None
            }
            InputEvent::Scroll { delta } => (delta != 0.0 && delta.is_finite())
                .then(|| ViewerCommand::PointerDelta {
                    delta: Vec2::new(0.0, delta),
                    mode: PointerMode::Zoom,
                }),
            InputEvent::ModifiersChanged { shift } => {
                self.shift_pressed = shift;
                None
            }
            InputEvent::FocusLost => {
                self.release_buttons();
                self.shift_pressed = false;
                None
            }
        }
    }

    /// Cursor moved: compute the delta and, while dragging, turn it into a
    /// camera command.
    fn handle_cursor_moved(&mut self, position: Vec2) -> Option<ViewerCommand> {
        let previous = self.cursor.replace(position)?;
        let delta = position - previous;
        if delta == Vec2::ZERO {
            return None;
        }

        let (delta, mode) = if self.held.left {
            let mode = if self.shift_pressed {
                PointerMode::Pan
            } else {
                PointerMode::Rotate
            };
            (delta, mode)
        } else if self.held.right {
            (delta, PointerMode::Pan)
        } else if self.held.middle {
            // dragging up zooms in
            (Vec2::new(0.0, -delta.y * DRAG_ZOOM_SCALE), PointerMode::Zoom)
        } else {
            return None;
        };
        Some(ViewerCommand::PointerDelta { delta, mode })
    }
}

impl Default for InputProcessor {
    fn default() -> Self {
        Self::from_options(&Options::default())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::input::KeyAction;

    fn press(button: MouseButton) -> InputEvent {
        InputEvent::MouseButton {
            button,
            pressed: true,
        }
    }

    fn release(button: MouseButton) -> InputEvent {
        InputEvent::MouseButton {
            button,
            pressed: false,
        }
    }

    fn moved(x: f32, y: f32) -> InputEvent {
        InputEvent::CursorMoved { x, y }
    }

    fn drag(processor: &mut InputProcessor, button: MouseButton) -> Option<ViewerCommand> {
        let _ = processor.handle_event(moved(100.0, 100.0));
        let _ = processor.handle_event(press(button));
        let cmd = processor.handle_event(moved(110.0, 95.0));
        let _ = processor.handle_event(release(button));
        cmd
    }

    #[test]
    fn hover_without_buttons_produces_nothing() {
        let mut processor = InputProcessor::default();
        assert_eq!(processor.handle_event(moved(10.0, 10.0)), None);
        assert_eq!(processor.handle_event(moved(20.0, 30.0)), None);
        assert_eq!(processor.cursor_position(), Some(Vec2::new(20.0, 30.0)));
    }

    #[test]
    fn left_drag_rotates() {
        let mut processor = InputProcessor::default();
        assert_eq!(
            drag(&mut processor, MouseButton::Left),
            Some(ViewerCommand::PointerDelta {
                delta: Vec2::new(10.0, -5.0),
                mode: PointerMode::Rotate,
            })
        );
        assert!(!processor.is_dragging());
    }

    #[test]
    fn right_drag_and_shift_left_drag_pan() {
        let mut processor = InputProcessor::default();
        let right = drag(&mut processor, MouseButton::Right);
        assert!(matches!(
            right,
            Some(ViewerCommand::PointerDelta {
                mode: PointerMode::Pan,
                ..
            })
        ));

        let _ = processor.handle_event(InputEvent::ModifiersChanged { shift: true });
        let shifted = drag(&mut processor, MouseButton::Left);
        assert_eq!(
            shifted,
            Some(ViewerCommand::PointerDelta {
                delta: Vec2::new(10.0, -5.0),
                mode: PointerMode::Pan,
            })
        );
    }

    #[test]
    fn middle_drag_up_zooms_in() {
        let mut processor = InputProcessor::default();
        assert_eq!(
            drag(&mut processor, MouseButton::Middle),
            Some(ViewerCommand::PointerDelta {
                delta: Vec2::new(0.0, 5.0 * DRAG_ZOOM_SCALE),
                mode: PointerMode::Zoom,
            })
        );
    }

    #[test]
    fn scroll_zooms() {
        let mut processor = InputProcessor::default();
        assert_eq!(
            processor.handle_event(InputEvent::Scroll { delta: -2.0 }),
            Some(ViewerCommand::PointerDelta {
                delta: Vec2::new(0.0, -2.0),
                mode: PointerMode::Zoom,
            })
        );
        assert_eq!(processor.handle_event(InputEvent::Scroll { delta: 0.0 }), None);
    }

    #[test]
    fn default_keys_map_to_commands() {
        let processor = InputProcessor::default();
        assert_eq!(
            processor.handle_key_press("KeyF"),
            Some(ViewerCommand::FocusScene {
                maintain_angle: true
            })
        );
        assert_eq!(
            processor.handle_key_press("KeyR"),
            Some(ViewerCommand::FocusScene {
                maintain_angle: false
            })
        );
        assert_eq!(
            processor.handle_key_press("KeyP"),
            Some(ViewerCommand::TogglePostProcessing)
        );
        assert_eq!(
            processor.handle_key_press("KeyA"),
            Some(ViewerCommand::ToggleAutoRotate)
        );
        assert_eq!(processor.handle_key_press("KeyZ"), None);
    }

    #[test]
    fn applied_options_replace_key_bindings() {
        let mut processor = InputProcessor::default();
        assert_eq!(
            processor.key_bindings().lookup("KeyP"),
            Some(KeyAction::TogglePostProcessing)
        );

        let mut options = Options::default();
        options.keybindings = KeybindingOptions::from_bindings(HashMap::from([(
            KeyAction::TogglePostProcessing,
            "KeyX".to_owned(),
        )]));
        processor.apply_options(&options);
        assert_eq!(processor.key_bindings(), &options.keybindings);
        assert_eq!(processor.key_bindings().lookup("KeyP"), None);
        assert_eq!(
            processor.handle_key_press("KeyX"),
            Some(ViewerCommand::TogglePostProcessing)
        );
    }

    #[test]
    fn focus_angle_follows_framing_options() {
        let mut options = Options::default();
        options.framing.maintain_angle = false;
        let processor = InputProcessor::from_options(&options);
        assert_eq!(
            processor.handle_key_press("KeyF"),
            Some(ViewerCommand::FocusScene {
                maintain_angle: false
            })
        );
    }

    #[test]
    fn focus_loss_ends_drag_and_shift() {
        let mut processor = InputProcessor::default();
        let _ = processor.handle_event(moved(0.0, 0.0));
        let _ = processor.handle_event(InputEvent::ModifiersChanged { shift: true });
        let _ = processor.handle_event(press(MouseButton::Left));
        assert_eq!(processor.handle_event(InputEvent::FocusLost), None);
        assert!(!processor.shift_pressed());
        assert_eq!(processor.handle_event(moved(5.0, 5.0)), None);
    }

    #[test]
    fn released_buttons_stop_dragging() {
        let mut processor = InputProcessor::default();
        let _ = processor.handle_event(moved(0.0, 0.0));
        let _ = processor.handle_event(press(MouseButton::Left));
        processor.release_buttons();
        assert_eq!(processor.handle_event(moved(5.0, 5.0)), None);
    }
}
