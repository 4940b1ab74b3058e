//! Audio playback.
//!
//! [`AudioBackend`] is the device boundary: load clips, place the listener,
//! play sounds flat or at a world position. [`AudioSystem`] drives it from
//! the ECS once per frame, after the game's variable-rate update:
//!
//! 1. The first [`AudioListener`] with a transform sets the listener pose.
//! 2. [`AudioSource`]s with `auto_play` start once; spatial ones at their
//!    entity's position.
//! 3. Finished playbacks are cleared, and playbacks whose entity died or lost
//!    its source are stopped.

use std::collections::HashMap;
use std::path::Path;

use crate::ecs::{Component, Entity, World};
use crate::error::BackendError;
use crate::math::{GlobalTransform, Quat, Transform, Vec3};

/// A decoded clip owned by an [`AudioBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipHandle(pub u32);

/// One playing instance of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayParams {
    /// Linear amplitude; 1.0 is the clip's own level.
    pub volume: f32,
    pub looping: bool,
}

impl Default for PlayParams {
    fn default() -> Self {
        Self {
            volume: 1.0,
            looping: false,
        }
    }
}

pub trait AudioBackend {
    /// Decode a clip (OGG, WAV, MP3, FLAC, depending on the backend).
    fn load_clip(&mut self, path: &Path) -> Result<ClipHandle, BackendError>;

    fn set_listener_position(&mut self, position: Vec3);
    fn set_listener_rotation(&mut self, rotation: Quat);

    fn play(&mut self, clip: ClipHandle, params: &PlayParams) -> Result<PlaybackHandle, BackendError>;

    /// Play attenuated and panned relative to the listener.
    fn play_spatial(
        &mut self,
        clip: ClipHandle,
        position: Vec3,
        params: &PlayParams,
    ) -> Result<PlaybackHandle, BackendError>;

    /// Unknown or finished playbacks are ignored.
    fn stop(&mut self, playback: PlaybackHandle);

    /// False once a playback has finished or been stopped.
    fn is_playing(&self, playback: PlaybackHandle) -> bool;
}

// ── Components ──────────────────────────────────────────────────────────

/// Marks the entity whose transform is the listener (usually the camera).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioListener;

impl Component for AudioListener {}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    pub clip: ClipHandle,
    pub params: PlayParams,
    /// Start automatically the first time the audio system sees this source.
    pub auto_play: bool,
    /// Play at the entity's position instead of flat.
    pub spatial: bool,
    pub(crate) playing: Option<PlaybackHandle>,
    started: bool,
}

impl AudioSource {
    pub fn new(clip: ClipHandle) -> Self {
        Self {
            clip,
            params: PlayParams::default(),
            auto_play: false,
            spatial: false,
            playing: None,
            started: false,
        }
    }

    pub fn auto_play(mut self) -> Self {
        self.auto_play = true;
        self
    }

    pub fn looping(mut self) -> Self {
        self.params.looping = true;
        self
    }

    pub fn spatial(mut self) -> Self {
        self.spatial = true;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.params.volume = volume;
        self
    }

    pub fn playing(&self) -> Option<PlaybackHandle> {
        self.playing
    }
}

impl Component for AudioSource {}

fn world_pose(world: &World, entity: Entity) -> Option<(Vec3, Quat)> {
    if let Some(global) = world.get::<GlobalTransform>(entity) {
        let (_, rotation, translation) = global.matrix.to_scale_rotation_translation();
        return Some((translation, rotation));
    }
    world
        .get::<Transform>(entity)
        .map(|t| (t.translation, t.rotation))
}

// ── System ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct AudioSystem {
    active: HashMap<Entity, PlaybackHandle>,
}

impl AudioSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of playbacks started by this system that are still running.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn sync(&mut self, world: &mut World, backend: &mut dyn AudioBackend) {
        if let Some((position, rotation)) = world
            .view::<(AudioListener,)>()
            .into_iter()
            .find_map(|e| world_pose(world, e))
        {
            backend.set_listener_position(position);
            backend.set_listener_rotation(rotation);
        }

        self.active.retain(|&entity, &mut playback| {
            let owned = world
                .get::<AudioSource>(entity)
                .is_some_and(|s| s.playing == Some(playback));
            if !world.is_alive(entity) || !owned {
                backend.stop(playback);
                return false;
            }
            backend.is_playing(playback)
        });

        for entity in world.view::<(AudioSource,)>() {
            let position = world_pose(world, entity).map(|(p, _)| p);
            let source = world.component_mut::<AudioSource>(entity);
            if source.playing.is_some_and(|p| !self.active.contains_key(&entity) || !backend.is_playing(p)) {
                source.playing = None;
            }
            if !source.auto_play || source.started {
                continue;
            }
            source.started = true;

            let result = match (source.spatial, position) {
                (true, Some(position)) => backend.play_spatial(source.clip, position, &source.params),
                _ => backend.play(source.clip, &source.params),
            };
            match result {
                Ok(playback) => {
                    source.playing = Some(playback);
                    self.active.insert(entity, playback);
                }
                Err(err) => log::error!("failed to play audio for {entity:?}: {err}"),
            }
        }
    }

    /// Stop everything this system started.
    pub fn stop_all(&mut self, backend: &mut dyn AudioBackend) {
        for (_, playback) in self.active.drain() {
            backend.stop(playback);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum AudioCall {
        ListenerPosition(Vec3),
        ListenerRotation(Quat),
        Play(ClipHandle, PlayParams),
        PlaySpatial(ClipHandle, Vec3),
        Stop(PlaybackHandle),
    }

    /// Clones share state. Playbacks run until stopped or `finish`ed.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordingAudio {
        pub calls: Rc<RefCell<Vec<AudioCall>>>,
        pub playing: Rc<RefCell<HashSet<PlaybackHandle>>>,
        next: u32,
    }

    impl RecordingAudio {
        pub(crate) fn finish(&self, playback: PlaybackHandle) {
            self.playing.borrow_mut().remove(&playback);
        }

        fn start(&mut self, call: AudioCall) -> PlaybackHandle {
            self.calls.borrow_mut().push(call);
            self.next += 1;
            let handle = PlaybackHandle(self.next);
            self.playing.borrow_mut().insert(handle);
            handle
        }
    }

    impl AudioBackend for RecordingAudio {
        fn load_clip(&mut self, path: &Path) -> Result<ClipHandle, BackendError> {
            if path.extension().is_some_and(|e| e == "ogg") {
                self.next += 1;
                Ok(ClipHandle(self.next))
            } else {
                Err(BackendError::Load(path.display().to_string()))
            }
        }

        fn set_listener_position(&mut self, position: Vec3) {
            self.calls.borrow_mut().push(AudioCall::ListenerPosition(position));
        }

        fn set_listener_rotation(&mut self, rotation: Quat) {
            self.calls.borrow_mut().push(AudioCall::ListenerRotation(rotation));
        }

        fn play(&mut self, clip: ClipHandle, params: &PlayParams) -> Result<PlaybackHandle, BackendError> {
            Ok(self.start(AudioCall::Play(clip, *params)))
        }

        fn play_spatial(
            &mut self,
            clip: ClipHandle,
            position: Vec3,
            _params: &PlayParams,
        ) -> Result<PlaybackHandle, BackendError> {
            Ok(self.start(AudioCall::PlaySpatial(clip, position)))
        }

        fn stop(&mut self, playback: PlaybackHandle) {
            self.calls.borrow_mut().push(AudioCall::Stop(playback));
            self.playing.borrow_mut().remove(&playback);
        }

        fn is_playing(&self, playback: PlaybackHandle) -> bool {
            self.playing.borrow().contains(&playback)
        }
    }
}
