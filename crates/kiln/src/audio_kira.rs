//! [`AudioBackend`] backed by [kira](https://docs.rs/kira).
//!
//! Spatial playback is computed once at start: inverse-distance attenuation
//! and stereo panning relative to the listener's right axis.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use kira::sound::PlaybackState;
use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle};
use kira::{AudioManager, AudioManagerSettings, Decibels, DefaultBackend, Tween};

use crate::audio::{AudioBackend, ClipHandle, PlayParams, PlaybackHandle};
use crate::error::BackendError;
use crate::math::{Quat, Vec3};

/// Distance at which a spatial sound plays at full volume.
const REFERENCE_DISTANCE: f32 = 1.0;

/// Convert a linear amplitude (0.0 = silence, 1.0 = full) to decibels.
fn amplitude_to_db(amplitude: f32) -> Decibels {
    if amplitude <= 0.0 {
        Decibels::SILENCE
    } else {
        Decibels(20.0 * amplitude.log10())
    }
}

/// Gain and pan (-1 left, 1 right) of a source heard from the listener.
fn spatialize(listener: Vec3, listener_rotation: Quat, source: Vec3) -> (f32, f32) {
    let offset = source - listener;
    let gain = REFERENCE_DISTANCE / offset.length().max(REFERENCE_DISTANCE);
    let right = listener_rotation * Vec3::X;
    let pan = offset.normalize_or_zero().dot(right).clamp(-1.0, 1.0);
    (gain, pan)
}

pub struct KiraAudio {
    manager: AudioManager<DefaultBackend>,
    clips: Vec<StaticSoundData>,
    playing: HashMap<PlaybackHandle, StaticSoundHandle>,
    listener_position: Vec3,
    listener_rotation: Quat,
    next_playback: u32,
}

impl KiraAudio {
    pub fn new() -> Result<Self, BackendError> {
        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .map_err(|e| BackendError::Init(format!("audio backend: {e}")))?;
        Ok(Self {
            manager,
            clips: Vec::new(),
            playing: HashMap::new(),
            listener_position: Vec3::ZERO,
            listener_rotation: Quat::IDENTITY,
            next_playback: 0,
        })
    }

    /// Main volume for all sounds (amplitude scale, 1.0 = full).
    pub fn set_main_volume(&mut self, volume: f32) {
        self.manager
            .main_track()
            .set_volume(amplitude_to_db(volume), Tween::default());
    }

    fn start(
        &mut self,
        clip: ClipHandle,
        params: &PlayParams,
        gain: f32,
        pan: f32,
    ) -> Result<PlaybackHandle, BackendError> {
        let mut data = self
            .clips
            .get(clip.0 as usize)
            .cloned()
            .ok_or_else(|| BackendError::InvalidHandle(format!("{clip:?}")))?
            .volume(amplitude_to_db(params.volume * gain))
            .panning(pan);
        if params.looping {
            data = data.loop_region(..);
        }
        let sound = self
            .manager
            .play(data)
            .map_err(|e| BackendError::Load(format!("play {clip:?}: {e}")))?;

        self.playing
            .retain(|_, h| !matches!(h.state(), PlaybackState::Stopped));
        self.next_playback += 1;
        let handle = PlaybackHandle(self.next_playback);
        self.playing.insert(handle, sound);
        Ok(handle)
    }
}

impl fmt::Debug for KiraAudio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KiraAudio")
            .field("clips", &self.clips.len())
            .field("playing", &self.playing.len())
            .finish_non_exhaustive()
    }
}

impl AudioBackend for KiraAudio {
    fn load_clip(&mut self, path: &Path) -> Result<ClipHandle, BackendError> {
        let data = StaticSoundData::from_file(path)
            .map_err(|e| BackendError::Load(format!("{}: {e}", path.display())))?;
        self.clips.push(data);
        Ok(ClipHandle(self.clips.len() as u32 - 1))
    }

    fn set_listener_position(&mut self, position: Vec3) {
        self.listener_position = position;
    }

    fn set_listener_rotation(&mut self, rotation: Quat) {
        self.listener_rotation = rotation;
    }

    fn play(&mut self, clip: ClipHandle, params: &PlayParams) -> Result<PlaybackHandle, BackendError> {
        self.start(clip, params, 1.0, 0.0)
    }

    fn play_spatial(
        &mut self,
        clip: ClipHandle,
        position: Vec3,
        params: &PlayParams,
    ) -> Result<PlaybackHandle, BackendError> {
        let (gain, pan) = spatialize(self.listener_position, self.listener_rotation, position);
        self.start(clip, params, gain, pan)
    }

    fn stop(&mut self, playback: PlaybackHandle) {
        if let Some(mut sound) = self.playing.remove(&playback) {
            sound.stop(Tween::default());
        }
    }

    fn is_playing(&self, playback: PlaybackHandle) -> bool {
        self.playing
            .get(&playback)
            .is_some_and(|h| !matches!(h.state(), PlaybackState::Stopped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amplitude_conversion() {
        assert_eq!(amplitude_to_db(1.0), Decibels(0.0));
        assert_eq!(amplitude_to_db(0.0), Decibels::SILENCE);
    }

    #[test]
    fn nearby_sources_play_at_full_volume() {
        let (gain, pan) = spatialize(Vec3::ZERO, Quat::IDENTITY, Vec3::new(0.0, 0.0, -0.5));
        assert_eq!(gain, 1.0);
        assert!(pan.abs() < 1e-6);
    }

    #[test]
    fn distance_attenuates_and_side_pans() {
        let (gain, pan) = spatialize(Vec3::ZERO, Quat::IDENTITY, Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(gain, 0.25);
        assert_eq!(pan, 1.0);

        // Turned around, the same source is on the left.
        let turned = Quat::from_rotation_y(std::f32::consts::PI);
        let (_, pan) = spatialize(Vec3::ZERO, turned, Vec3::new(4.0, 0.0, 0.0));
        assert!((pan + 1.0).abs() < 1e-5);
    }
}
