//! SMPTE 時間碼
//!
//! Supports 24 and 30 base timecodes. Drop-frame counting follows the
//! 29.97 fps scheme: two frame numbers are skipped at the start of every
//! minute except each tenth minute.

use std::fmt;
use thiserror::Error;

/// Frames in ten minutes of 30-base drop-frame timecode.
const DROP_FRAMES_PER_10_MINUTES: i64 = 17_982;
/// Frames in one dropped minute of 30-base drop-frame timecode.
const DROP_FRAMES_PER_MINUTE: i64 = 1_798;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimecodeError {
    #[error("invalid timecode: {0}")]
    InvalidTimecode(String),

    #[error("unknown base for timecode: {0}")]
    UnsupportedBase(u32),

    #[error("timecode frame count overflow")]
    Overflow,

    #[error("timecode frame count would become negative: {0}")]
    Negative(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timecode {
    /// 時間碼的基準幀率，例如 23.976 fps 的基準是 24
    base: u32,
    drop_frame: bool,
    frames: i64,
}

impl Timecode {
    /// 解析 `HH:MM:SS:FF` 格式的時間碼
    ///
    /// The last separator may be `;`, which is how drop-frame codes are
    /// written. A 24-base code is never drop-frame, `drop_frame` is ignored
    /// for it.
    pub fn parse(code: &str, base: u32, drop_frame: bool) -> Result<Self, TimecodeError> {
        if base != 24 && base != 30 {
            return Err(TimecodeError::UnsupportedBase(base));
        }
        let drop_frame = drop_frame && base == 30;

        let bytes = code.as_bytes();
        if bytes.len() != 11 {
            return Err(TimecodeError::InvalidTimecode(code.to_string()));
        }
        let separators_ok =
            bytes[2] == b':' && bytes[5] == b':' && matches!(bytes[8], b':' | b';');
        if !separators_ok {
            return Err(TimecodeError::InvalidTimecode(code.to_string()));
        }

        let mut parts = [0i64; 4];
        for (i, part) in parts.iter_mut().enumerate() {
            let pair = &bytes[i * 3..i * 3 + 2];
            if !pair.iter().all(u8::is_ascii_digit) {
                return Err(TimecodeError::InvalidTimecode(code.to_string()));
            }
            *part = i64::from(pair[0] - b'0') * 10 + i64::from(pair[1] - b'0');
        }
        let [h, m, s, f] = parts;
        let base_frames = i64::from(base);

        let mut frames = 3600 * h * base_frames + 60 * m * base_frames + s * base_frames + f;
        if drop_frame {
            let total_minutes = 60 * h + m;
            frames -= 2 * (total_minutes - total_minutes / 10);
        }

        Ok(Self {
            base,
            drop_frame,
            frames,
        })
    }

    /// 增加幀數；結果不可小於 0，失敗時時間碼維持不變
    pub fn add(&mut self, n: i64) -> Result<(), TimecodeError> {
        let frames = self.frames.checked_add(n).ok_or(TimecodeError::Overflow)?;
        if frames < 0 {
            return Err(TimecodeError::Negative(frames));
        }
        self.frames = frames;
        Ok(())
    }

    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    #[must_use]
    pub const fn is_drop_frame(&self) -> bool {
        self.drop_frame
    }

    #[must_use]
    pub const fn frames(&self) -> i64 {
        self.frames
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = i64::from(self.base);
        let mut frame = self.frames;

        if self.drop_frame {
            // Put back the frame numbers the drop-frame count skips.
            let chunks = frame / DROP_FRAMES_PER_10_MINUTES;
            let remainder = frame % DROP_FRAMES_PER_10_MINUTES;
            // The first minute of each chunk keeps its frames 0 and 1.
            let minutes = (remainder - 2) / DROP_FRAMES_PER_MINUTE;
            frame += 18 * chunks + 2 * minutes;
        }

        let hours = frame / base / 60 / 60 % 24;
        let minutes = frame / base / 60 % 60;
        let seconds = frame / base % 60;
        let frames = frame % base;
        let last_separator = if self.drop_frame { ';' } else { ':' };

        write!(
            f,
            "{hours:02}:{minutes:02}:{seconds:02}{last_separator}{frames:02}"
        )
    }
}
