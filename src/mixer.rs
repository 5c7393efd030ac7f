//! Sample decoding/encoding and the fixed-point-free mixing core.
//!
//! Mixing always goes through an `f32` intermediate: decode each
//! contributing input's frame to `f32`, scale by its per-channel volume, sum,
//! clip, and re-encode in the sink's sample format. Formats with
//! non-fixed-width or non-linear encodings (A-law, mu-law, packed 24-bit)
//! are rejected at `Sink` construction time rather than partially supported
//! here — see `SampleSpec` validation in `crate::sink`.

use sink_proto::{CVolume, SampleFormat, SampleSpec, Volume};

/// Whether the mixer knows how to decode/encode this format. Sinks are
/// constructed only with formats for which this is `true`.
pub fn is_supported(format: SampleFormat) -> bool {
    use SampleFormat::*;
    matches!(
        format,
        U8 | S16Le | S16Be | S32Le | S32Be | Float32Le | Float32Be
    )
}

/// A `CVolume` at unity (0 dB) for every channel. Used by synthetic inputs
/// (ghost inputs, test fakes) that have no volume control of their own.
pub fn unity_volume(channels: u8) -> CVolume {
    let mut v = CVolume::new();
    for _ in 0..channels {
        v.push(Volume::NORM).unwrap();
    }
    v
}

fn decode_sample(format: SampleFormat, bytes: &[u8]) -> f32 {
    use SampleFormat::*;
    match format {
        U8 => (bytes[0] as f32 - 128.0) / 128.0,
        S16Le => i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / i16::MAX as f32,
        S16Be => i16::from_be_bytes([bytes[0], bytes[1]]) as f32 / i16::MAX as f32,
        S32Le => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32 / i32::MAX as f32,
        S32Be => i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32 / i32::MAX as f32,
        Float32Le => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        Float32Be => f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        other => unreachable!("unsupported sample format {:?} reached the mixer", other),
    }
}

fn encode_sample(format: SampleFormat, value: f32, out: &mut [u8]) {
    use SampleFormat::*;
    let clipped = value.max(-1.0).min(1.0);
    match format {
        U8 => out[0] = ((clipped * 128.0) + 128.0) as u8,
        S16Le => out[..2].copy_from_slice(&((clipped * i16::MAX as f32) as i16).to_le_bytes()),
        S16Be => out[..2].copy_from_slice(&((clipped * i16::MAX as f32) as i16).to_be_bytes()),
        S32Le => out[..4].copy_from_slice(&((clipped * i32::MAX as f32) as i32).to_le_bytes()),
        S32Be => out[..4].copy_from_slice(&((clipped * i32::MAX as f32) as i32).to_be_bytes()),
        Float32Le => out[..4].copy_from_slice(&clipped.to_le_bytes()),
        Float32Be => out[..4].copy_from_slice(&clipped.to_be_bytes()),
        other => unreachable!("unsupported sample format {:?} reached the mixer", other),
    }
}

/// One input's contribution to a mix: its raw samples (already in the
/// sink's sample format) and the per-channel volume to scale them by.
pub struct MixInput<'a> {
    pub samples: &'a [u8],
    pub volume: &'a CVolume,
}

/// Mixes `inputs` into `out`, which must already be sized to hold exactly
/// one input's worth of samples (`out.len()` bytes, a multiple of
/// `spec.frame_size()`). Every input slice must be the same length as `out`.
///
/// This is only called for 2+ simultaneous inputs, or a single input that
/// isn't at unity volume — the 0- and 1-input-at-unity-volume cases are
/// handled by the caller without going through `f32` at all.
pub fn mix(spec: &SampleSpec, inputs: &[MixInput], out: &mut [u8]) {
    let frame_size = spec.frame_size();
    let sample_size = spec.format().sample_size();
    let channels = spec.channels() as usize;
    debug_assert_eq!(out.len() % frame_size, 0);

    for frame in 0..out.len() / frame_size {
        for ch in 0..channels {
            let offset = frame * frame_size + ch * sample_size;
            let mut acc = 0.0f32;
            for input in inputs {
                let vol = input.volume.volumes().get(ch).copied().unwrap_or(sink_proto::Volume::NORM);
                let sample = decode_sample(spec.format(), &input.samples[offset..offset + sample_size]);
                acc += sample * vol.to_linear();
            }
            encode_sample(spec.format(), acc, &mut out[offset..offset + sample_size]);
        }
    }
}

/// Scales `buf` in place by `volume` (used to apply a sink's own master
/// volume to an already-mixed or passed-through chunk).
pub fn apply_volume(spec: &SampleSpec, volume: &CVolume, buf: &mut [u8]) {
    let frame_size = spec.frame_size();
    let sample_size = spec.format().sample_size();
    let channels = spec.channels() as usize;
    if volume.volumes().iter().all(|v| v.as_u32() == sink_proto::Volume::NORM.as_u32()) {
        return;
    }
    for frame in 0..buf.len() / frame_size {
        for ch in 0..channels {
            let offset = frame * frame_size + ch * sample_size;
            let vol = volume.volumes().get(ch).copied().unwrap_or(sink_proto::Volume::NORM);
            let sample = decode_sample(spec.format(), &buf[offset..offset + sample_size]);
            let scaled = sample * vol.to_linear();
            encode_sample(spec.format(), scaled, &mut buf[offset..offset + sample_size]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sink_proto::{CVolume, SampleSpec, Volume};

    fn stereo_spec() -> SampleSpec {
        SampleSpec::new_checked(SampleFormat::S16Le, 2, 44100).unwrap()
    }

    #[test]
    fn mixing_two_inputs_sums_samples() {
        let spec = stereo_spec();
        let half_vol = {
            let mut v = CVolume::new();
            v.push(Volume::from_linear(0.5)).unwrap();
            v.push(Volume::from_linear(0.5)).unwrap();
            v
        };
        let a = 1000i16.to_le_bytes();
        let mut frame_a = Vec::new();
        frame_a.extend_from_slice(&a);
        frame_a.extend_from_slice(&a);
        let frame_b = frame_a.clone();

        let mut out = vec![0u8; 4];
        mix(
            &spec,
            &[
                MixInput { samples: &frame_a, volume: &half_vol },
                MixInput { samples: &frame_b, volume: &half_vol },
            ],
            &mut out,
        );
        let left = i16::from_le_bytes([out[0], out[1]]);
        // Each input contributes 1000 * 0.5, summed = 1000 (within rounding).
        assert!((left - 1000).abs() <= 2, "left={}", left);
    }

    #[test]
    fn apply_volume_is_noop_at_unity() {
        let spec = stereo_spec();
        let mut buf = vec![1, 2, 3, 4];
        let before = buf.clone();
        apply_volume(&spec, &unity_volume(2), &mut buf);
        assert_eq!(buf, before);
    }

    #[test]
    fn apply_volume_mutes_to_zero() {
        let spec = stereo_spec();
        let mut buf = 1000i16.to_le_bytes().repeat(2);
        let muted = {
            let mut v = CVolume::new();
            v.push(Volume::MUTED).unwrap();
            v.push(Volume::MUTED).unwrap();
            v
        };
        apply_volume(&spec, &muted, &mut buf);
        assert_eq!(i16::from_le_bytes([buf[0], buf[1]]), 0);
    }
}
