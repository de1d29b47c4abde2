use std::{io::Read, path::Path};

use anyhow::Context as _;

use crate::{
    foundation::{
        config::MediaConfig,
        error::{MediaError, MediaResult},
    },
    sample::Sample,
};

/// Longest blank sound that may be allocated, in seconds.
pub const MAX_BLANK_SECONDS: f64 = 400.0;

pub const NO_FILE_NAME: &str = "noFileName";
pub const BLANK_SOUND_NAME: &str = "noname";

/// A mono buffer of signed 16-bit samples at a fixed sample rate.
#[derive(Clone, Debug, PartialEq)]
pub struct Sound {
    sample_rate: u32,
    samples: Vec<i16>,
    filename: String,
}

impl Sound {
    /// Decode a WAV file. Multi-channel audio keeps only its first channel.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("open wav '{}'", path.display()))?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let samples = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 8) => {
                first_channel(&mut reader, channels, |v: i8| i16::from(v) << 8)?
            }
            (hound::SampleFormat::Int, 16) => first_channel(&mut reader, channels, |v: i16| v)?,
            (hound::SampleFormat::Int, bits @ 17..=32) => {
                first_channel(&mut reader, channels, |v: i32| (v >> (bits - 16)) as i16)?
            }
            (hound::SampleFormat::Float, 32) => first_channel(&mut reader, channels, |v: f32| {
                (v.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16
            })?,
            (format, bits) => {
                return Err(MediaError::unsupported_format(format!(
                    "'{}' uses {bits}-bit {format:?} samples",
                    path.display()
                )));
            }
        };

        tracing::debug!(
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            samples = samples.len(),
            "opened sound"
        );
        Ok(Self {
            sample_rate: spec.sample_rate,
            samples,
            filename: path.display().to_string(),
        })
    }

    /// Silent sound of `num_samples` samples.
    pub fn blank(num_samples: i64, sample_rate: i64) -> MediaResult<Self> {
        if num_samples <= 0 || sample_rate <= 0 {
            return Err(MediaError::invalid_argument(format!(
                "blank sound needs num_samples > 0 and sample_rate > 0, got {num_samples} and {sample_rate}"
            )));
        }
        let rate = checked_rate(sample_rate)?;
        let seconds = num_samples as f64 / f64::from(rate);
        if seconds > MAX_BLANK_SECONDS {
            return Err(MediaError::invalid_argument(format!(
                "blank sound length must not exceed {MAX_BLANK_SECONDS} seconds, got {seconds:.3}"
            )));
        }
        Ok(Self::silent(num_samples as usize, rate))
    }

    /// Silent sound lasting `duration` seconds.
    pub fn blank_by_duration(duration: f64, sample_rate: i64) -> MediaResult<Self> {
        if sample_rate <= 0 {
            return Err(MediaError::invalid_argument(format!(
                "blank sound needs sample_rate > 0, got {sample_rate}"
            )));
        }
        if !duration.is_finite() {
            return Err(MediaError::invalid_argument(
                "blank sound duration must be finite",
            ));
        }
        if duration > MAX_BLANK_SECONDS {
            return Err(MediaError::invalid_argument(format!(
                "blank sound length must not exceed {MAX_BLANK_SECONDS} seconds, got {duration}"
            )));
        }
        let rate = checked_rate(sample_rate)?;
        let num_samples = (duration * f64::from(rate)).trunc() as i64;
        if num_samples <= 0 {
            return Err(MediaError::invalid_argument(format!(
                "blank sound of {duration} seconds at {rate} Hz has no samples"
            )));
        }
        Ok(Self::silent(num_samples as usize, rate))
    }

    /// [`Sound::blank`] at the configured default sample rate.
    pub fn blank_default(num_samples: i64, cfg: &MediaConfig) -> MediaResult<Self> {
        Self::blank(num_samples, i64::from(cfg.default_sample_rate))
    }

    /// [`Sound::blank_by_duration`] at the configured default sample rate.
    pub fn blank_by_duration_default(duration: f64, cfg: &MediaConfig) -> MediaResult<Self> {
        Self::blank_by_duration(duration, i64::from(cfg.default_sample_rate))
    }

    pub fn from_samples(
        sample_rate: u32,
        samples: Vec<i16>,
        filename: impl Into<String>,
    ) -> MediaResult<Self> {
        if sample_rate == 0 {
            return Err(MediaError::invalid_argument("sample_rate must be > 0"));
        }
        Ok(Self {
            sample_rate,
            samples,
            filename: filename.into(),
        })
    }

    fn silent(len: usize, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples: vec![0; len],
            filename: BLANK_SOUND_NAME.to_string(),
        }
    }

    /// Independent copy with the same rate and no filename.
    pub fn duplicate(&self) -> Self {
        Self {
            sample_rate: self.sample_rate,
            samples: self.samples.clone(),
            filename: NO_FILE_NAME.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn num_samples(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    pub fn as_slice(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_value_at(&self, index: usize) -> MediaResult<i16> {
        self.samples
            .get(index)
            .copied()
            .ok_or_else(|| index_error(index, self.samples.len()))
    }

    pub fn set_sample_value_at(&mut self, index: usize, value: i16) -> MediaResult<()> {
        let len = self.samples.len();
        let slot = self
            .samples
            .get_mut(index)
            .ok_or_else(|| index_error(index, len))?;
        *slot = value;
        Ok(())
    }

    /// Handle for `index`. The index is not checked until the handle is used.
    pub fn sample_object_at(&self, index: usize) -> Sample {
        Sample::new(index)
    }

    pub fn samples(&self) -> Vec<Sample> {
        (0..self.samples.len()).map(Sample::new).collect()
    }

    /// New sound holding `self[start..end]`, at this sound's rate (not the
    /// 22050 Hz default), with the length limit applied at that rate.
    pub fn clip(&self, start: usize, end: usize) -> MediaResult<Sound> {
        let len = end as i64 - start as i64;
        let mut target = Sound::blank(len, i64::from(self.sample_rate))?;
        for (target_index, source_index) in (start..end).enumerate() {
            let value = self.sample_value_at(source_index)?;
            target.set_sample_value_at(target_index, value)?;
        }
        Ok(target)
    }

    /// Overwrite `target` from `start` onward with every sample of `self`.
    ///
    /// Samples are written one at a time. If `target` runs out of room the
    /// call fails, and the samples already written stay written.
    pub fn copy_into(&self, target: &mut Sound, start: usize) -> MediaResult<()> {
        for (offset, &value) in self.samples.iter().enumerate() {
            target.set_sample_value_at(start + offset, value)?;
        }
        Ok(())
    }

    /// Write a mono 16-bit PCM WAV file.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> MediaResult<()> {
        let path = path.as_ref();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("create wav '{}'", path.display()))?;
        for &s in &self.samples {
            writer
                .write_sample(s)
                .with_context(|| format!("write wav samples to '{}'", path.display()))?;
        }
        writer
            .finalize()
            .with_context(|| format!("finalize wav '{}'", path.display()))?;
        Ok(())
    }
}

impl std::fmt::Display for Sound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sound, filename {}\n   number of samples {} sample rate {}",
            self.filename,
            self.samples.len(),
            self.sample_rate
        )
    }
}

fn index_error(index: usize, len: usize) -> MediaError {
    MediaError::out_of_range(format!("sample index {index} is outside 0..{len}"))
}

fn checked_rate(sample_rate: i64) -> MediaResult<u32> {
    u32::try_from(sample_rate).map_err(|_| {
        MediaError::invalid_argument(format!("sample_rate {sample_rate} is too large"))
    })
}

fn first_channel<R, T>(
    reader: &mut hound::WavReader<R>,
    channels: usize,
    convert: impl Fn(T) -> i16,
) -> MediaResult<Vec<i16>>
where
    R: Read,
    T: hound::Sample,
{
    let samples = reader
        .samples::<T>()
        .step_by(channels)
        .map(|s| s.map(&convert))
        .collect::<Result<Vec<_>, _>>()
        .context("decode wav samples")?;
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sound_of(values: &[i16]) -> Sound {
        Sound::from_samples(22_050, values.to_vec(), "test").unwrap()
    }

    #[test]
    fn default_constructors_follow_configured_rate() {
        let mut cfg = MediaConfig::default();
        assert_eq!(Sound::blank_default(10, &cfg).unwrap().sample_rate(), 22_050);

        cfg.default_sample_rate = 8_000;
        let s = Sound::blank_by_duration_default(0.5, &cfg).unwrap();
        assert_eq!((s.sample_rate(), s.len()), (8_000, 4_000));

        // 400 s at 8 kHz fits, at 22.05 kHz it would not.
        assert!(Sound::blank_default(3_200_000, &cfg).is_ok());
        cfg.default_sample_rate = 0;
        assert!(matches!(
            Sound::blank_default(10, &cfg),
            Err(MediaError::InvalidArgument(_))
        ));
    }

    #[test]
    fn clip_keeps_source_rate() {
        let src = Sound::from_samples(44_100, vec![1, 2, 3, 4, 5, 6], "hi-fi").unwrap();
        let c = src.clip(1, 4).unwrap();
        assert_eq!(c.sample_rate(), 44_100);
        assert_eq!(c.as_slice(), &[2, 3, 4]);
    }

    #[test]
    fn blank_validates_arguments() {
        let s = Sound::blank(100, 22_050).unwrap();
        assert_eq!(s.len(), 100);
        assert!(s.as_slice().iter().all(|&v| v == 0));
        assert_eq!(s.filename(), BLANK_SOUND_NAME);

        for (n, rate) in [(-1, 22_050), (0, 22_050), (100, 0), (100, -8000)] {
            assert!(
                matches!(Sound::blank(n, rate), Err(MediaError::InvalidArgument(_))),
                "{n} @ {rate}"
            );
        }
        assert!(Sound::blank(22_050 * 401, 22_050).is_err());
        assert!(Sound::blank(22_050 * 400, 22_050).is_ok());
    }

    #[test]
    fn blank_by_duration_enforces_ceiling() {
        assert!(matches!(
            Sound::blank_by_duration(401.0, 22_050),
            Err(MediaError::InvalidArgument(_))
        ));
        let s = Sound::blank_by_duration(399.0, 22_050).unwrap();
        assert_eq!(s.len(), 399 * 22_050);
        assert!((s.duration() - 399.0).abs() < 1e-9);

        assert!(Sound::blank_by_duration(1.0, 0).is_err());
        assert!(Sound::blank_by_duration(0.0, 22_050).is_err());
        assert!(Sound::blank_by_duration(f64::NAN, 22_050).is_err());
    }

    #[test]
    fn sample_access_is_checked_at_use() {
        let mut s = sound_of(&[1, 2, 3]);
        assert_eq!(s.sample_value_at(2).unwrap(), 3);
        assert!(matches!(s.sample_value_at(3), Err(MediaError::OutOfRange(_))));
        assert!(s.set_sample_value_at(3, 9).is_err());

        s.set_sample_value_at(0, -7).unwrap();
        assert_eq!(s.as_slice(), &[-7, 2, 3]);
    }

    #[test]
    fn clip_copies_sub_range_without_touching_source() {
        let source = sound_of(&[10, 20, 30, 40, 50]);
        let clipped = source.clip(2, 5).unwrap();
        assert_eq!(clipped.as_slice(), &[30, 40, 50]);
        assert_eq!(clipped.sample_rate(), source.sample_rate());
        assert_eq!(source.as_slice(), &[10, 20, 30, 40, 50]);
    }

    #[test]
    fn clip_rejects_bad_ranges() {
        let source = sound_of(&[10, 20, 30]);
        assert!(matches!(
            source.clip(2, 2),
            Err(MediaError::InvalidArgument(_))
        ));
        assert!(matches!(
            source.clip(3, 1),
            Err(MediaError::InvalidArgument(_))
        ));
        assert!(matches!(source.clip(1, 5), Err(MediaError::OutOfRange(_))));
    }

    #[test]
    fn copy_into_overwrites_in_place() {
        let source = sound_of(&[1, 2, 3]);
        let mut target = sound_of(&[0, 0, 0, 0, 0]);
        source.copy_into(&mut target, 1).unwrap();
        assert_eq!(target.as_slice(), &[0, 1, 2, 3, 0]);
    }

    #[test]
    fn copy_into_is_not_transactional() {
        let source = sound_of(&[1, 2, 3]);
        let mut target = sound_of(&[0, 0, 0, 0]);
        let err = source.copy_into(&mut target, 2).unwrap_err();
        assert!(matches!(err, MediaError::OutOfRange(_)));
        assert_eq!(target.as_slice(), &[0, 0, 1, 2]);
    }

    #[test]
    fn duplicate_is_independent() {
        let original = sound_of(&[5, 6]);
        let mut dup = original.duplicate();
        dup.set_sample_value_at(0, 99).unwrap();
        assert_eq!(original.as_slice(), &[5, 6]);
        assert_eq!(dup.sample_rate(), original.sample_rate());
        assert_eq!(dup.filename(), NO_FILE_NAME);
    }

    #[test]
    fn duration_is_samples_over_rate() {
        let s = Sound::blank(11_025, 22_050).unwrap();
        assert_eq!(s.duration(), 0.5);
        assert_eq!(s.num_samples(), 11_025);
    }

    #[test]
    fn wav_round_trip_keeps_rate_and_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let s = Sound::from_samples(8_000, vec![0, 1000, -1000, i16::MAX, i16::MIN], "x").unwrap();
        s.save(&path).unwrap();

        let back = Sound::open(&path).unwrap();
        assert_eq!(back.sample_rate(), 8_000);
        assert_eq!(back.as_slice(), s.as_slice());
        assert_eq!(back.filename(), path.display().to_string());
    }

    #[test]
    fn stereo_keeps_first_channel_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(&path, spec).unwrap();
        for (l, r) in [(1_i16, -1_i16), (2, -2), (3, -3)] {
            w.write_sample(l).unwrap();
            w.write_sample(r).unwrap();
        }
        w.finalize().unwrap();

        let s = Sound::open(&path).unwrap();
        assert_eq!(s.as_slice(), &[1, 2, 3]);
        assert_eq!(s.sample_rate(), 44_100);
    }

    #[test]
    fn wide_integer_samples_are_rescaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48_000,
            bits_per_sample: 24,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(&path, spec).unwrap();
        w.write_sample(0x12_3456_i32).unwrap();
        w.write_sample(-0x10_0000_i32).unwrap();
        w.finalize().unwrap();

        let s = Sound::open(&path).unwrap();
        assert_eq!(s.as_slice(), &[0x1234, -0x1000]);
    }

    #[test]
    fn display_reports_name_length_and_rate() {
        let s = Sound::blank(10, 8_000).unwrap();
        assert_eq!(
            s.to_string(),
            "Sound, filename noname\n   number of samples 10 sample rate 8000"
        );
    }
}
