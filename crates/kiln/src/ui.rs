//! Immediate-mode UI bridge.
//!
//! A [`UiLayer`] sits between the window and the game: it sees every raw
//! event first, and once per rendered frame it hands the graphics device a
//! tessellated [`UiDrawData`]. The UI library behind it is up to the
//! embedding application.

use crate::graphics::{FrameInfo, TextureHandle};
use crate::platform::Event;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UiVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [u8; 4],
}

/// One draw call over a slice of [`UiDrawData::indices`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UiDrawCommand {
    pub texture: Option<TextureHandle>,
    /// Clip rectangle in physical pixels: x, y, width, height.
    pub clip_rect: [u32; 4],
    pub index_offset: u32,
    pub index_count: u32,
}

/// A frame's worth of UI geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiDrawData {
    pub vertices: Vec<UiVertex>,
    pub indices: Vec<u32>,
    pub commands: Vec<UiDrawCommand>,
}

impl UiDrawData {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

pub trait UiLayer {
    /// Offer a raw window event to the UI. Returns `true` if the UI wants
    /// the event for itself (e.g. a text field has focus). The engine still
    /// forwards every event to the input system.
    fn handle_event(&mut self, event: &Event) -> bool;

    /// Build this frame's draw data.
    fn build_frame(&mut self, frame: &FrameInfo) -> UiDrawData;

    /// Release backend resources. Called once during engine shutdown.
    fn shutdown(&mut self) {}
}
