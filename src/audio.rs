//! Audio playback capability consumed by the sequencer.
//!
//! The sequencer only ever needs load/play/stop/volume; hosts provide a
//! device for their platform. [`NullAudio`] keeps visuals running when no
//! playback is available, and the `audio` feature ships a kira-backed device.

use crate::error::CinecrawlResult;

pub trait AudioTrack {
    fn play(&mut self);

    fn stop(&mut self);

    /// Set playback volume as linear amplitude in `[0, 1]`.
    fn set_volume(&mut self, volume: f32);
}

pub trait AudioDevice {
    type Track: AudioTrack;

    fn load(&mut self, id: &str) -> CinecrawlResult<Self::Track>;
}

/// Device that plays nothing; every operation succeeds as a no-op.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAudio;

#[derive(Clone, Copy, Debug, Default)]
pub struct NullTrack;

impl AudioTrack for NullTrack {
    fn play(&mut self) {}

    fn stop(&mut self) {}

    fn set_volume(&mut self, _volume: f32) {}
}

impl AudioDevice for NullAudio {
    type Track = NullTrack;

    fn load(&mut self, _id: &str) -> CinecrawlResult<NullTrack> {
        Ok(NullTrack)
    }
}

#[cfg(feature = "audio")]
mod kira_backend {
    use kira::{
        AudioManager, AudioManagerSettings, Decibels, DefaultBackend, Tween,
        sound::static_sound::{StaticSoundData, StaticSoundHandle},
    };

    use super::{AudioDevice, AudioTrack};
    use crate::error::{CinecrawlError, CinecrawlResult};

    /// Audio device backed by a kira manager on the default backend.
    pub struct KiraAudio {
        manager: AudioManager<DefaultBackend>,
    }

    impl KiraAudio {
        pub fn new() -> CinecrawlResult<Self> {
            let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
                .map_err(|e| CinecrawlError::audio(format!("audio manager init failed: {e}")))?;
            Ok(Self { manager })
        }
    }

    impl AudioDevice for KiraAudio {
        type Track = KiraTrack;

        fn load(&mut self, id: &str) -> CinecrawlResult<KiraTrack> {
            let data = StaticSoundData::from_file(id)
                .map_err(|e| CinecrawlError::audio(format!("failed to load track '{id}': {e}")))?;
            // Start paused so the track trait's play() owns the actual start.
            let mut handle = self
                .manager
                .play(data)
                .map_err(|e| CinecrawlError::audio(format!("failed to start track '{id}': {e}")))?;
            handle.pause(Tween::default());
            Ok(KiraTrack { handle })
        }
    }

    pub struct KiraTrack {
        handle: StaticSoundHandle,
    }

    impl AudioTrack for KiraTrack {
        fn play(&mut self) {
            self.handle.resume(Tween::default());
        }

        fn stop(&mut self) {
            self.handle.stop(Tween::default());
        }

        fn set_volume(&mut self, volume: f32) {
            self.handle
                .set_volume(amplitude_to_db(volume), Tween::default());
        }
    }

    fn amplitude_to_db(amplitude: f32) -> Decibels {
        if amplitude <= 0.001 {
            Decibels::SILENCE
        } else {
            Decibels(20.0 * amplitude.log10())
        }
    }
}

#[cfg(feature = "audio")]
pub use kira_backend::{KiraAudio, KiraTrack};
