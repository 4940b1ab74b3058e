//! Keyboard and mouse input state.
//!
//! [`ButtonState`] tracks which keys/buttons are currently held, pressed this
//! frame, or released this frame. [`InputSystem`] owns one per device, maps
//! named actions onto them, and accumulates the frame's mouse motion, scroll
//! and typed text.
//!
//! Updated by the engine once per frame from the window's events.
//!
//! ```ignore
//! input.bind_key("jump", Key::Space, Trigger::Pressed);
//! input.bind_mouse("fire", MouseButton::Left, Trigger::Down);
//!
//! if ctx.input.action_pressed("jump") { ... }
//! ```

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

use crate::math::Vec2;
use crate::platform::Event;

/// Physical keyboard key.
pub type Key = KeyCode;

/// Tracks the state of a set of inputs (keys or mouse buttons).
///
/// - `pressed`: currently held down
/// - `just_pressed`: pressed this frame (not held last frame)
/// - `just_released`: released this frame
#[derive(Debug, Clone)]
pub struct ButtonState<T: Eq + Hash + Copy> {
    pressed: HashSet<T>,
    just_pressed: HashSet<T>,
    just_released: HashSet<T>,
}

impl<T: Eq + Hash + Copy> ButtonState<T> {
    pub fn new() -> Self {
        Self {
            pressed: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    /// Returns `true` if the input is currently held down.
    pub fn pressed(&self, input: T) -> bool {
        self.pressed.contains(&input)
    }

    /// Returns `true` if the input was pressed this frame.
    pub fn just_pressed(&self, input: T) -> bool {
        self.just_pressed.contains(&input)
    }

    /// Returns `true` if the input was released this frame.
    pub fn just_released(&self, input: T) -> bool {
        self.just_released.contains(&input)
    }

    /// Record a press. Repeats while held are ignored.
    pub fn press(&mut self, input: T) {
        if self.pressed.insert(input) {
            self.just_pressed.insert(input);
        }
    }

    pub fn release(&mut self, input: T) {
        if self.pressed.remove(&input) {
            self.just_released.insert(input);
        }
    }

    /// Release everything that is held, as if every button went up.
    pub fn release_all(&mut self) {
        self.just_released.extend(self.pressed.drain());
    }

    /// Clear per-frame state. Called at the start of each frame.
    pub fn clear_just(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }

    fn fired(&self, input: T, trigger: Trigger) -> bool {
        match trigger {
            Trigger::Down => self.pressed(input),
            Trigger::Pressed => self.just_pressed(input),
            Trigger::Released => self.just_released(input),
        }
    }
}

impl<T: Eq + Hash + Copy> Default for ButtonState<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// When a binding counts as fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Every frame the button is held.
    Down,
    /// The frame the button goes down.
    Pressed,
    /// The frame the button comes up.
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Key(Key),
    Mouse(MouseButton),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Binding {
    source: Source,
    trigger: Trigger,
}

/// Device state plus named action bindings.
#[derive(Debug, Clone)]
pub struct InputSystem {
    keys: ButtonState<Key>,
    mouse: ButtonState<MouseButton>,
    bindings: HashMap<String, Vec<Binding>>,
    cursor: Option<Vec2>,
    mouse_delta: Vec2,
    scroll: Vec2,
    text: String,
    focused: bool,
}

impl Default for InputSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSystem {
    pub fn new() -> Self {
        Self {
            keys: ButtonState::new(),
            mouse: ButtonState::new(),
            bindings: HashMap::new(),
            cursor: None,
            mouse_delta: Vec2::ZERO,
            scroll: Vec2::ZERO,
            text: String::new(),
            focused: true,
        }
    }

    // ── Bindings ─────────────────────────────────────────────────────

    /// Bind `key` to `action`. An action may have any number of bindings.
    pub fn bind_key(&mut self, action: impl Into<String>, key: Key, trigger: Trigger) {
        self.bind(action.into(), Source::Key(key), trigger);
    }

    pub fn bind_mouse(&mut self, action: impl Into<String>, button: MouseButton, trigger: Trigger) {
        self.bind(action.into(), Source::Mouse(button), trigger);
    }

    fn bind(&mut self, action: String, source: Source, trigger: Trigger) {
        let list = self.bindings.entry(action).or_default();
        let binding = Binding { source, trigger };
        if !list.contains(&binding) {
            list.push(binding);
        }
    }

    /// Remove every binding of `action`.
    pub fn unbind(&mut self, action: &str) {
        self.bindings.remove(action);
    }

    pub fn is_bound(&self, action: &str) -> bool {
        self.bindings.contains_key(action)
    }

    // ── Per-frame update ─────────────────────────────────────────────

    /// Recompute this frame's state from the window's events.
    pub fn update(&mut self, events: &[Event]) {
        self.keys.clear_just();
        self.mouse.clear_just();
        self.mouse_delta = Vec2::ZERO;
        self.scroll = Vec2::ZERO;
        self.text.clear();

        for event in events {
            match *event {
                Event::KeyDown(key) => self.keys.press(key),
                Event::KeyUp(key) => self.keys.release(key),
                Event::TextInput(c) => self.text.push(c),
                Event::MouseButtonDown(button) => self.mouse.press(button),
                Event::MouseButtonUp(button) => self.mouse.release(button),
                Event::MouseMove { x, y } => {
                    let position = Vec2::new(x, y);
                    if let Some(previous) = self.cursor {
                        self.mouse_delta += position - previous;
                    }
                    self.cursor = Some(position);
                }
                Event::MouseScroll { dx, dy } => self.scroll += Vec2::new(dx, dy),
                Event::WindowFocus(focused) => {
                    self.focused = focused;
                    if !focused {
                        self.keys.release_all();
                        self.mouse.release_all();
                    }
                }
                Event::WindowResize { .. } | Event::WindowClose => {}
            }
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// True while any button bound to `action` is held, whatever the
    /// binding's trigger.
    pub fn action_down(&self, action: &str) -> bool {
        self.bindings_of(action).any(|b| match b.source {
            Source::Key(key) => self.keys.pressed(key),
            Source::Mouse(button) => self.mouse.pressed(button),
        })
    }

    /// True if any binding of `action` fired this frame according to its
    /// [`Trigger`].
    pub fn action_pressed(&self, action: &str) -> bool {
        self.bindings_of(action).any(|b| match b.source {
            Source::Key(key) => self.keys.fired(key, b.trigger),
            Source::Mouse(button) => self.mouse.fired(button, b.trigger),
        })
    }

    fn bindings_of(&self, action: &str) -> impl Iterator<Item = &Binding> {
        self.bindings.get(action).into_iter().flatten()
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys.pressed(key)
    }

    pub fn key_pressed(&self, key: Key) -> bool {
        self.keys.just_pressed(key)
    }

    pub fn key_released(&self, key: Key) -> bool {
        self.keys.just_released(key)
    }

    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse.pressed(button)
    }

    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse.just_pressed(button)
    }

    pub fn keys(&self) -> &ButtonState<Key> {
        &self.keys
    }

    pub fn mouse(&self) -> &ButtonState<MouseButton> {
        &self.mouse
    }

    /// Cursor motion accumulated this frame.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Scroll accumulated this frame, in lines.
    pub fn scroll_delta(&self) -> Vec2 {
        self.scroll
    }

    /// Last known cursor position, if the cursor has entered the window.
    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor
    }

    /// Text typed this frame.
    pub fn text_input(&self) -> &str {
        &self.text
    }

    pub fn has_focus(&self) -> bool {
        self.focused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_edge_then_level() {
        let mut input = InputSystem::new();
        input.update(&[Event::KeyDown(Key::Space)]);
        assert!(input.key_pressed(Key::Space));
        assert!(input.key_down(Key::Space));

        input.update(&[]);
        assert!(!input.key_pressed(Key::Space));
        assert!(input.key_down(Key::Space));

        input.update(&[Event::KeyUp(Key::Space)]);
        assert!(input.key_released(Key::Space));
        assert!(!input.key_down(Key::Space));
    }

    #[test]
    fn repeated_key_down_does_not_retrigger() {
        let mut input = InputSystem::new();
        input.update(&[Event::KeyDown(Key::KeyA)]);
        input.update(&[Event::KeyDown(Key::KeyA)]);
        assert!(!input.key_pressed(Key::KeyA));
        assert!(input.key_down(Key::KeyA));
    }

    #[test]
    fn action_triggers() {
        let mut input = InputSystem::new();
        input.bind_key("jump", Key::Space, Trigger::Pressed);
        input.bind_key("crouch", Key::ControlLeft, Trigger::Down);
        input.bind_mouse("fire", MouseButton::Left, Trigger::Released);

        input.update(&[
            Event::KeyDown(Key::Space),
            Event::KeyDown(Key::ControlLeft),
            Event::MouseButtonDown(MouseButton::Left),
        ]);
        assert!(input.action_pressed("jump"));
        assert!(input.action_pressed("crouch"));
        assert!(!input.action_pressed("fire"));
        assert!(input.action_down("fire"));

        input.update(&[Event::MouseButtonUp(MouseButton::Left)]);
        assert!(!input.action_pressed("jump"));
        assert!(input.action_down("jump"));
        assert!(input.action_pressed("crouch"));
        assert!(input.action_pressed("fire"));
        assert!(!input.action_down("fire"));
    }

    #[test]
    fn action_with_several_bindings() {
        let mut input = InputSystem::new();
        input.bind_key("left", Key::KeyA, Trigger::Down);
        input.bind_key("left", Key::ArrowLeft, Trigger::Down);
        input.update(&[Event::KeyDown(Key::ArrowLeft)]);
        assert!(input.action_down("left"));
        assert!(input.action_pressed("left"));
    }

    #[test]
    fn unbound_actions_are_inactive() {
        let mut input = InputSystem::new();
        input.bind_key("jump", Key::Space, Trigger::Down);
        input.unbind("jump");
        input.update(&[Event::KeyDown(Key::Space)]);
        assert!(!input.is_bound("jump"));
        assert!(!input.action_down("jump"));
        assert!(!input.action_pressed("never_bound"));
    }

    #[test]
    fn mouse_delta_accumulates_within_a_frame() {
        let mut input = InputSystem::new();
        input.update(&[Event::MouseMove { x: 10.0, y: 10.0 }]);
        // The first sample only establishes the position.
        assert_eq!(input.mouse_delta(), Vec2::ZERO);

        input.update(&[
            Event::MouseMove { x: 12.0, y: 10.0 },
            Event::MouseMove { x: 15.0, y: 6.0 },
        ]);
        assert_eq!(input.mouse_delta(), Vec2::new(5.0, -4.0));
        assert_eq!(input.cursor_position(), Some(Vec2::new(15.0, 6.0)));

        input.update(&[]);
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn scroll_and_text_reset_each_frame() {
        let mut input = InputSystem::new();
        input.update(&[
            Event::MouseScroll { dx: 0.0, dy: 1.0 },
            Event::MouseScroll { dx: 0.0, dy: 2.0 },
            Event::TextInput('h'),
            Event::TextInput('i'),
        ]);
        assert_eq!(input.scroll_delta(), Vec2::new(0.0, 3.0));
        assert_eq!(input.text_input(), "hi");

        input.update(&[]);
        assert_eq!(input.scroll_delta(), Vec2::ZERO);
        assert_eq!(input.text_input(), "");
    }

    #[test]
    fn losing_focus_releases_everything() {
        let mut input = InputSystem::new();
        input.update(&[
            Event::KeyDown(Key::KeyW),
            Event::MouseButtonDown(MouseButton::Right),
        ]);
        input.update(&[Event::WindowFocus(false)]);
        assert!(!input.has_focus());
        assert!(!input.key_down(Key::KeyW));
        assert!(input.key_released(Key::KeyW));
        assert!(!input.mouse_down(MouseButton::Right));
    }
}
