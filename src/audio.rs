//! Sound effects, synthesized into in-memory WAV files at startup.

use std::{f32::consts::TAU, sync::Arc};

use bevy::{audio::Volume, prelude::*};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::config::Settings;

pub(super) fn plugin(app: &mut App) {
    app.register_type::<SoundEffect>();
    app.add_systems(Startup, synthesize_sounds);
    app.add_systems(Update, scale_new_sound_effects);
}

/// An organizational marker component that should be added to a spawned [`AudioPlayer`] if it's in the
/// general "sound effect" category (e.g. footsteps, the sound of a magic spell, a door opening).
///
/// This can then be used to query for and operate on sounds in that category.
#[derive(Component, Reflect, Default)]
#[reflect(Component)]
pub struct SoundEffect;

/// A sound effect audio instance.
pub fn sound_effect(handle: Handle<AudioSource>) -> impl Bundle {
    (AudioPlayer(handle), PlaybackSettings::DESPAWN, SoundEffect)
}

#[derive(Resource, Debug, Clone)]
pub struct SoundLibrary {
    pub shot: Handle<AudioSource>,
    pub hit: Handle<AudioSource>,
    pub explosion: Handle<AudioSource>,
    pub pickup: Handle<AudioSource>,
    pub dash: Handle<AudioSource>,
    pub click: Handle<AudioSource>,
}

const SAMPLE_RATE: u32 = 22_050;

/// One synthesized effect: a tone sweeping between two pitches mixed with
/// white noise, under an exponential decay.
#[derive(Debug, Clone, Copy)]
pub struct Tone {
    pub duration: f32,
    pub start_hz: f32,
    pub end_hz: f32,
    /// 0 is a pure tone, 1 pure noise.
    pub noise: f32,
    /// Decay rate of the envelope, per second.
    pub decay: f32,
    pub gain: f32,
}

impl Tone {
    pub fn samples(&self, rng: &mut impl Rng) -> Vec<i16> {
        let count = (self.duration * SAMPLE_RATE as f32) as usize;
        let mut phase = 0.0_f32;
        (0..count)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let progress = i as f32 / count as f32;
                let hz = self.start_hz + (self.end_hz - self.start_hz) * progress;
                phase = (phase + TAU * hz / SAMPLE_RATE as f32) % TAU;

                let tone = phase.sin();
                let noise = rng.random_range(-1.0..=1.0);
                let envelope = (-self.decay * t).exp();
                let value = (tone * (1.0 - self.noise) + noise * self.noise) * envelope * self.gain;
                (value.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
            })
            .collect()
    }
}

/// 16-bit mono PCM in a RIFF container.
pub fn encode_wav(samples: &[i16]) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    bytes.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

const SHOT: Tone = Tone {
    duration: 0.12,
    start_hz: 900.0,
    end_hz: 200.0,
    noise: 0.6,
    decay: 30.0,
    gain: 0.5,
};
const HIT: Tone = Tone {
    duration: 0.15,
    start_hz: 300.0,
    end_hz: 120.0,
    noise: 0.3,
    decay: 20.0,
    gain: 0.6,
};
const EXPLOSION: Tone = Tone {
    duration: 0.6,
    start_hz: 120.0,
    end_hz: 40.0,
    noise: 0.85,
    decay: 6.0,
    gain: 0.8,
};
const PICKUP: Tone = Tone {
    duration: 0.18,
    start_hz: 520.0,
    end_hz: 1040.0,
    noise: 0.0,
    decay: 12.0,
    gain: 0.4,
};
const DASH: Tone = Tone {
    duration: 0.2,
    start_hz: 200.0,
    end_hz: 600.0,
    noise: 0.5,
    decay: 14.0,
    gain: 0.35,
};
const CLICK: Tone = Tone {
    duration: 0.05,
    start_hz: 1400.0,
    end_hz: 1200.0,
    noise: 0.1,
    decay: 60.0,
    gain: 0.3,
};

fn synthesize_sounds(mut commands: Commands, mut sources: ResMut<Assets<AudioSource>>) {
    // Fixed seed: the noise bursts sound the same every launch.
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut add = |tone: Tone| {
        let bytes = encode_wav(&tone.samples(&mut rng));
        sources.add(AudioSource {
            bytes: Arc::from(bytes),
        })
    };

    commands.insert_resource(SoundLibrary {
        shot: add(SHOT),
        hit: add(HIT),
        explosion: add(EXPLOSION),
        pickup: add(PICKUP),
        dash: add(DASH),
        click: add(CLICK),
    });
    debug!("Synthesized sound effects");
}

fn scale_new_sound_effects(
    settings: Res<Settings>,
    mut added: Query<&mut PlaybackSettings, Added<SoundEffect>>,
) {
    for mut playback in &mut added {
        playback.volume = Volume::Linear(settings.sfx_volume);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_header() {
        let bytes = encode_wav(&[0, 1, -1]);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 42);
        assert_eq!(u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]), 6);
        assert_eq!(bytes.len(), 50);
    }

    #[test]
    fn test_tones_fade_out() {
        let mut rng = StdRng::seed_from_u64(1);
        for tone in [SHOT, HIT, EXPLOSION, PICKUP, DASH, CLICK] {
            let samples = tone.samples(&mut rng);
            assert_eq!(samples.len(), (tone.duration * SAMPLE_RATE as f32) as usize);

            let peak = |part: &[i16]| part.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
            let quarter = samples.len() / 4;
            assert!(peak(&samples[..quarter]) > peak(&samples[samples.len() - quarter..]));
        }
    }
}
