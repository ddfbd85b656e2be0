use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Tracks input state for keyboard and mouse.
#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    keys_released: HashSet<KeyCode>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_buttons_pressed: HashSet<MouseButton>,
    mouse_buttons_released: HashSet<MouseButton>,
    mouse_position: Option<Vec2>,
    mouse_delta: Vec2,
    shift: bool,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the end of each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.mouse_buttons_pressed.clear();
        self.mouse_buttons_released.clear();
        self.mouse_delta = Vec2::ZERO;
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press_key(key),
                        ElementState::Released => self.release_key(key),
                    }
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.shift = modifiers.state().shift_key();
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.press_button(*button),
                ElementState::Released => self.release_button(*button),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => {
                self.mouse_position = None;
            }
            WindowEvent::Focused(false) => self.release_all(),
            _ => {}
        }
    }

    pub(crate) fn press_key(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub(crate) fn release_key(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
        self.keys_released.insert(key);
    }

    pub(crate) fn press_button(&mut self, button: MouseButton) {
        if self.mouse_buttons_down.insert(button) {
            self.mouse_buttons_pressed.insert(button);
        }
    }

    pub(crate) fn release_button(&mut self, button: MouseButton) {
        self.mouse_buttons_down.remove(&button);
        self.mouse_buttons_released.insert(button);
    }

    /// The first position after the cursor enters the window sets the
    /// reference point without producing a delta.
    pub(crate) fn move_cursor(&mut self, position: Vec2) {
        if let Some(previous) = self.mouse_position {
            self.mouse_delta += position - previous;
        }
        self.mouse_position = Some(position);
    }

    pub(crate) fn set_shift(&mut self, held: bool) {
        self.shift = held;
    }

    /// Drops every held key and button, e.g. when the window loses focus.
    fn release_all(&mut self) {
        self.keys_released.extend(self.keys_down.drain());
        self.mouse_buttons_released
            .extend(self.mouse_buttons_down.drain());
        self.shift = false;
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key was pressed this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Returns true if the key was released this frame.
    pub fn key_released(&self, key: KeyCode) -> bool {
        self.keys_released.contains(&key)
    }

    /// Returns true if the mouse button is currently held down.
    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons_down.contains(&button)
    }

    /// Returns true if the mouse button was pressed this frame.
    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons_pressed.contains(&button)
    }

    /// Returns true if the mouse button was released this frame.
    pub fn mouse_released(&self, button: MouseButton) -> bool {
        self.mouse_buttons_released.contains(&button)
    }

    /// Last known cursor position in window coordinates.
    pub fn mouse_position(&self) -> Option<Vec2> {
        self.mouse_position
    }

    /// Mouse movement delta this frame.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Returns true while either shift key is held.
    pub fn shift_down(&self) -> bool {
        self.shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_reported_once_until_release() {
        let mut input = Input::new();
        input.press_key(KeyCode::KeyA);
        assert!(input.key_pressed(KeyCode::KeyA));
        assert!(input.key_down(KeyCode::KeyA));

        input.begin_frame();
        // key repeat
        input.press_key(KeyCode::KeyA);
        assert!(!input.key_pressed(KeyCode::KeyA));
        assert!(input.key_down(KeyCode::KeyA));

        input.release_key(KeyCode::KeyA);
        assert!(input.key_released(KeyCode::KeyA));
        assert!(!input.key_down(KeyCode::KeyA));
    }

    #[test]
    fn first_cursor_position_produces_no_delta() {
        let mut input = Input::new();
        input.move_cursor(Vec2::new(100.0, 100.0));
        assert_eq!(input.mouse_delta(), Vec2::ZERO);

        input.move_cursor(Vec2::new(110.0, 95.0));
        input.move_cursor(Vec2::new(112.0, 95.0));
        assert_eq!(input.mouse_delta(), Vec2::new(12.0, -5.0));

        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
        assert_eq!(input.mouse_position(), Some(Vec2::new(112.0, 95.0)));
    }

    #[test]
    fn losing_focus_releases_everything() {
        let mut input = Input::new();
        input.press_key(KeyCode::ShiftLeft);
        input.press_button(MouseButton::Left);
        input.set_shift(true);

        input.handle_event(&WindowEvent::Focused(false));

        assert!(!input.key_down(KeyCode::ShiftLeft));
        assert!(!input.mouse_down(MouseButton::Left));
        assert!(input.mouse_released(MouseButton::Left));
        assert!(!input.shift_down());
    }
}
