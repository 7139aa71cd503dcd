//! Priority-scaled tone bursts.
//!
//! A burst is a short run of sine tones played ahead of speech as an
//! attention cue. Tones start `spacing` apart and may overlap; each one ramps
//! linearly up to `peak_gain` over `attack` and back down to silence at
//! `duration`.

use std::f32::consts::TAU;
use std::time::Duration;

use shelfcall_core::config::ToneConfig;
use shelfcall_core::types::Priority;

const CRITICAL_TONES: [f32; 3] = [800.0, 1000.0, 1200.0];
const HIGH_TONES: [f32; 2] = [600.0, 800.0];
const MEDIUM_TONES: [f32; 2] = [400.0, 600.0];
const LOW_TONES: [f32; 2] = [300.0, 400.0];

/// Longest stretch of audio `render` will produce.
pub const MAX_RENDER: Duration = Duration::from_secs(60);

/// Tone frequencies in Hz for a priority, in playback order.
pub fn frequencies_for(priority: Priority) -> &'static [f32] {
    match priority {
        Priority::Critical => &CRITICAL_TONES,
        Priority::High => &HIGH_TONES,
        Priority::Medium => &MEDIUM_TONES,
        Priority::Low => &LOW_TONES,
    }
}

/// A fully described tone burst, ready for a `ToneGenerator`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneBurst {
    pub priority: Priority,
    pub frequencies_hz: Vec<f32>,
    pub spacing: Duration,
    pub duration: Duration,
    pub attack: Duration,
    pub peak_gain: f32,
}

impl ToneBurst {
    pub fn for_priority(priority: Priority, shape: &ToneConfig) -> Self {
        Self {
            priority,
            frequencies_hz: frequencies_for(priority).to_vec(),
            spacing: Duration::from_millis(shape.spacing_ms),
            duration: Duration::from_millis(shape.duration_ms),
            attack: Duration::from_millis(shape.attack_ms),
            peak_gain: shape.peak_gain,
        }
    }

    /// Offset of tone `index` from the start of the burst. Saturates at
    /// `Duration::MAX`.
    pub fn start_of(&self, index: usize) -> Duration {
        u32::try_from(index)
            .ok()
            .and_then(|i| self.spacing.checked_mul(i))
            .unwrap_or(Duration::MAX)
    }

    /// Time from the first tone's start to the last tone's end.
    pub fn total_duration(&self) -> Duration {
        match self.frequencies_hz.len() {
            0 => Duration::ZERO,
            n => self.start_of(n - 1).saturating_add(self.duration),
        }
    }

    /// Envelope gain `t` seconds into a single tone.
    pub fn gain_at(&self, t: f32) -> f32 {
        let attack = self.attack.as_secs_f32();
        let duration = self.duration.as_secs_f32();
        if t < 0.0 || t >= duration {
            0.0
        } else if t < attack {
            self.peak_gain * t / attack
        } else {
            let release = duration - attack;
            if release <= 0.0 {
                self.peak_gain
            } else {
                self.peak_gain * (duration - t) / release
            }
        }
    }

    /// Render the burst as mono f32 PCM at `sample_rate`.
    ///
    /// Overlapping tones are summed and the result is clamped to [-1.0, 1.0].
    /// Output stops at `MAX_RENDER`.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let rate = sample_rate as f32;
        let total = samples_in(self.total_duration().min(MAX_RENDER), sample_rate);
        let per_tone = samples_in(self.duration, sample_rate);
        let mut samples = vec![0.0f32; total];

        for (index, freq) in self.frequencies_hz.iter().enumerate() {
            let offset = samples_in(self.start_of(index), sample_rate);
            if offset >= total {
                break;
            }
            for n in 0..per_tone {
                let Some(slot) = samples.get_mut(offset.saturating_add(n)) else {
                    break;
                };
                let t = n as f32 / rate;
                *slot += self.gain_at(t) * (TAU * freq * t).sin();
            }
        }

        for s in samples.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }
        samples
    }
}

fn samples_in(duration: Duration, sample_rate: u32) -> usize {
    let samples = duration.as_micros().saturating_mul(u128::from(sample_rate)) / 1_000_000;
    usize::try_from(samples).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burst(priority: Priority) -> ToneBurst {
        ToneBurst::for_priority(priority, &ToneConfig::default())
    }

    #[test]
    fn test_critical_uses_three_ascending_tones() {
        let freqs = frequencies_for(Priority::Critical);
        assert_eq!(freqs, &[800.0, 1000.0, 1200.0]);
        assert!(freqs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_lower_priorities_use_fewer_lower_tones() {
        assert_eq!(frequencies_for(Priority::High).len(), 2);
        assert_eq!(frequencies_for(Priority::Medium), &[400.0, 600.0]);
        assert_eq!(frequencies_for(Priority::Low), &[300.0, 400.0]);
        let top = |p: Priority| frequencies_for(p).iter().cloned().fold(0.0f32, f32::max);
        assert!(top(Priority::Critical) > top(Priority::High));
        assert!(top(Priority::High) > top(Priority::Medium));
        assert!(top(Priority::Medium) > top(Priority::Low));
    }

    #[test]
    fn test_total_duration() {
        // 2 x 200ms spacing + 500ms tone
        assert_eq!(burst(Priority::Critical).total_duration(), Duration::from_millis(900));
        assert_eq!(burst(Priority::Low).total_duration(), Duration::from_millis(700));

        let empty = ToneBurst {
            frequencies_hz: vec![],
            ..burst(Priority::Low)
        };
        assert_eq!(empty.total_duration(), Duration::ZERO);
    }

    #[test]
    fn test_envelope_shape() {
        let b = burst(Priority::High);
        assert_eq!(b.gain_at(-0.01), 0.0);
        assert_eq!(b.gain_at(0.0), 0.0);
        assert!((b.gain_at(0.05) - 0.15).abs() < 1e-5);
        assert!((b.gain_at(0.1) - 0.3).abs() < 1e-5);
        assert!((b.gain_at(0.3) - 0.15).abs() < 1e-5);
        assert_eq!(b.gain_at(0.5), 0.0);
        assert_eq!(b.gain_at(1.0), 0.0);
    }

    #[test]
    fn test_envelope_without_release() {
        let b = ToneBurst {
            attack: Duration::from_millis(500),
            ..burst(Priority::High)
        };
        assert!((b.gain_at(0.25) - 0.15).abs() < 1e-5);
    }

    #[test]
    fn test_render_length_and_bounds() {
        let b = burst(Priority::Critical);
        let pcm = b.render(8_000);
        assert_eq!(pcm.len(), 7_200);
        assert!(pcm.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(pcm.iter().any(|s| s.abs() > 0.1));
        // Envelope starts silent.
        assert!(pcm[0].abs() < 1e-6);
    }

    #[test]
    fn test_oversized_shape_saturates() {
        let b = ToneBurst {
            spacing: Duration::from_millis(u64::MAX),
            ..burst(Priority::Critical)
        };
        assert_eq!(b.start_of(0), Duration::ZERO);
        assert_eq!(b.start_of(2), Duration::MAX);
        assert_eq!(b.total_duration(), Duration::MAX);

        let pcm = b.render(8_000);
        assert_eq!(pcm.len(), 480_000);
        assert!(pcm.iter().all(|s| (-1.0..=1.0).contains(s)));
    }
}
