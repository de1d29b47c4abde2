use crate::{foundation::error::MediaResult, sound::Sound};

/// An index into a sound's buffer.
///
/// Unlike [`crate::Pixel`], the index is not validated when the handle is
/// made; an out-of-range index fails on first read or write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Sample {
    index: usize,
}

impl Sample {
    pub(crate) fn new(index: usize) -> Self {
        Self { index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn value(&self, sound: &Sound) -> MediaResult<i16> {
        sound.sample_value_at(self.index)
    }

    pub fn set_value(&self, sound: &mut Sound, value: i16) -> MediaResult<()> {
        sound.set_sample_value_at(self.index, value)
    }

    pub fn describe(&self, sound: &Sound) -> MediaResult<String> {
        Ok(format!(
            "Sample at index {} with value {}",
            self.index,
            self.value(sound)?
        ))
    }
}
