//! Window and platform events.
//!
//! The engine never talks to an OS window directly. It drives anything that
//! implements [`Window`]: poll, read the frame's [`Event`]s, clear them, and
//! swap buffers at the end of the frame.
//!
//! [`HeadlessWindow`] is the built-in implementation. With no OS window
//! behind it, it only reports events pushed into it, which makes it the
//! window for tests and servers, and the event buffer for a winit event
//! loop: feed it from `ApplicationHandler::window_event` through
//! [`translate_window_event`].

use std::cell::RefCell;
use std::rc::Rc;

use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::PhysicalKey;

use crate::input::{Key, MouseButton};

/// Scroll distance of one wheel "line" in pixels, for touchpads that report
/// pixel deltas.
const PIXELS_PER_LINE: f32 = 20.0;

/// A platform event, already stripped of OS details.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    KeyDown(Key),
    KeyUp(Key),
    TextInput(char),
    MouseButtonDown(MouseButton),
    MouseButtonUp(MouseButton),
    /// Cursor position in physical pixels from the top-left corner.
    MouseMove { x: f32, y: f32 },
    /// Scroll in lines; positive `dy` is away from the user.
    MouseScroll { dx: f32, dy: f32 },
    WindowFocus(bool),
    WindowResize { width: u32, height: u32 },
    WindowClose,
}

/// The engine's view of a window.
pub trait Window {
    /// Collect the OS events that arrived since the last poll.
    fn poll_events(&mut self);

    /// Events collected by the last poll.
    fn events(&self) -> &[Event];

    fn clear_events(&mut self);

    fn should_close(&self) -> bool;

    /// Framebuffer size in physical pixels.
    fn framebuffer_size(&self) -> (u32, u32);

    /// Physical pixels per logical pixel.
    fn content_scale(&self) -> f32;

    fn swap_buffers(&mut self);
}

#[derive(Debug)]
struct HeadlessState {
    queued: Vec<Event>,
    close_requested: bool,
    size: (u32, u32),
    scale: f32,
    swaps: u64,
}

/// A window with no OS surface.
///
/// Clones share one event queue, so a test or an event-loop adapter can keep
/// a handle and push events after the engine has taken ownership.
#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    shared: Rc<RefCell<HeadlessState>>,
    events: Vec<Event>,
}

impl HeadlessWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            shared: Rc::new(RefCell::new(HeadlessState {
                queued: Vec::new(),
                close_requested: false,
                size: (width, height),
                scale: 1.0,
                swaps: 0,
            })),
            events: Vec::new(),
        }
    }

    /// Queue an event for the next [`poll_events`](Window::poll_events).
    pub fn push_event(&self, event: Event) {
        self.shared.borrow_mut().queued.push(event);
    }

    /// Queue a [`Event::WindowClose`].
    pub fn request_close(&self) {
        self.push_event(Event::WindowClose);
    }

    pub fn set_content_scale(&self, scale: f32) {
        self.shared.borrow_mut().scale = scale;
    }

    /// Number of times [`swap_buffers`](Window::swap_buffers) was called.
    pub fn swap_count(&self) -> u64 {
        self.shared.borrow().swaps
    }
}

impl Window for HeadlessWindow {
    fn poll_events(&mut self) {
        let mut state = self.shared.borrow_mut();
        let queued = std::mem::take(&mut state.queued);
        for event in queued {
            match event {
                Event::WindowClose => state.close_requested = true,
                Event::WindowResize { width, height } => state.size = (width, height),
                _ => {}
            }
            self.events.push(event);
        }
    }

    fn events(&self) -> &[Event] {
        &self.events
    }

    fn clear_events(&mut self) {
        self.events.clear();
    }

    fn should_close(&self) -> bool {
        self.shared.borrow().close_requested
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.shared.borrow().size
    }

    fn content_scale(&self) -> f32 {
        self.shared.borrow().scale
    }

    fn swap_buffers(&mut self) {
        self.shared.borrow_mut().swaps += 1;
    }
}

/// Translate a winit window event into engine events.
///
/// Returns an empty list for events the engine does not consume. A key press
/// that produces text yields the key event followed by one
/// [`Event::TextInput`] per character.
pub fn translate_window_event(event: &WindowEvent) -> Vec<Event> {
    match event {
        WindowEvent::CloseRequested => vec![Event::WindowClose],
        WindowEvent::Resized(size) => vec![Event::WindowResize {
            width: size.width,
            height: size.height,
        }],
        WindowEvent::Focused(focused) => vec![Event::WindowFocus(*focused)],
        WindowEvent::KeyboardInput { event, .. } => {
            let mut out = Vec::new();
            if let PhysicalKey::Code(key) = event.physical_key {
                out.push(match event.state {
                    ElementState::Pressed => Event::KeyDown(key),
                    ElementState::Released => Event::KeyUp(key),
                });
            }
            if event.state == ElementState::Pressed {
                if let Some(text) = event.text.as_deref() {
                    out.extend(text.chars().filter(|c| !c.is_control()).map(Event::TextInput));
                }
            }
            out
        }
        WindowEvent::MouseInput { state, button, .. } => vec![match state {
            ElementState::Pressed => Event::MouseButtonDown(*button),
            ElementState::Released => Event::MouseButtonUp(*button),
        }],
        WindowEvent::CursorMoved { position, .. } => vec![Event::MouseMove {
            x: position.x as f32,
            y: position.y as f32,
        }],
        WindowEvent::MouseWheel { delta, .. } => {
            let (dx, dy) = match delta {
                MouseScrollDelta::LineDelta(x, y) => (*x, *y),
                MouseScrollDelta::PixelDelta(p) => {
                    (p.x as f32 / PIXELS_PER_LINE, p.y as f32 / PIXELS_PER_LINE)
                }
            };
            vec![Event::MouseScroll { dx, dy }]
        }
        _ => Vec::new(),
    }
}
