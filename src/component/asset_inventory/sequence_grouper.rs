//! 影像序列分組器
//!
//! Collapses a walk-ordered stream of image files into frame-numbered
//! sequences. Only the most recently opened sequence can grow: once another
//! pattern shows up, the earlier one is closed for good.

use log::debug;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Placeholder standing for the frame number in a sequence name.
pub const FRAME_TOKEN: &str = "{FRAME}";

/// 最後一段連續數字視為幀號
static SPLIT_SEQUENCE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*[^0-9])?([0-9]+)([^0-9]*)$").expect("Invalid regex")
});

/// 幀號，保留原始字串以維持補零寬度
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameNumber {
    pub number: u64,
    pub literal: String,
}

impl FrameNumber {
    fn parse(literal: &str) -> Option<Self> {
        let number = literal.parse().ok()?;
        Some(Self {
            number,
            literal: literal.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// Path pattern containing [`FRAME_TOKEN`], e.g. `shots/a_{FRAME}.exr`.
    pub name: String,
    pub start: FrameNumber,
    pub end: FrameNumber,
}

impl Sequence {
    #[must_use]
    pub fn first_file(&self) -> String {
        self.name.replace(FRAME_TOKEN, &self.start.literal)
    }

    #[must_use]
    pub fn last_file(&self) -> String {
        self.name.replace(FRAME_TOKEN, &self.end.literal)
    }

    /// 幀數（含頭尾）；`0` 到 `u64::MAX` 這種範圍無法表示時回傳 `None`
    #[must_use]
    pub const fn length(&self) -> Option<u64> {
        (self.end.number - self.start.number).checked_add(1)
    }

    fn widen(&mut self, frame: FrameNumber) {
        if frame.number < self.start.number {
            self.start = frame;
        } else if frame.number > self.end.number {
            self.end = frame;
        }
    }
}

/// 單次掃描的序列合併器
#[derive(Debug, Default)]
pub struct SequenceGrouper {
    sequences: Vec<Sequence>,
}

impl SequenceGrouper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入一個影像檔；檔名沒有數字的檔案會被略過
    pub fn push(&mut self, path: &Path) {
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            debug!("skipping non UTF-8 file name: {}", path.display());
            return;
        };
        let Some(captures) = SPLIT_SEQUENCE_NAME.captures(file_name) else {
            return;
        };

        let prefix = captures.get(1).map_or("", |m| m.as_str());
        let suffix = captures.get(3).map_or("", |m| m.as_str());
        let Some(frame) = captures.get(2).and_then(|m| FrameNumber::parse(m.as_str())) else {
            debug!("frame number out of range: {}", path.display());
            return;
        };

        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        let name = dir
            .join(format!("{prefix}{FRAME_TOKEN}{suffix}"))
            .to_string_lossy()
            .into_owned();

        match self.sequences.last_mut() {
            Some(last) if last.name == name => last.widen(frame),
            _ => {
                debug!("new sequence: {name}");
                self.sequences.push(Sequence {
                    name,
                    start: frame.clone(),
                    end: frame,
                });
            }
        }
    }

    #[must_use]
    pub fn finish(self) -> Vec<Sequence> {
        self.sequences
    }
}

/// 將路徑列表分組成序列
pub fn group_sequences<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Vec<Sequence> {
    let mut grouper = SequenceGrouper::new();
    for path in paths {
        grouper.push(path.as_ref());
    }
    grouper.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(dir: &str, name: &str) -> String {
        Path::new(dir).join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn test_groups_contiguous_runs() {
        let sequences = group_sequences([
            "a/shot_001.exr",
            "a/shot_002.exr",
            "a/shot_003.exr",
            "a/other_010.exr",
        ]);

        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].name, pattern("a", "shot_{FRAME}.exr"));
        assert_eq!(sequences[0].start.literal, "001");
        assert_eq!(sequences[0].end.literal, "003");
        assert_eq!(sequences[0].length(), Some(3));
        assert_eq!(sequences[1].name, pattern("a", "other_{FRAME}.exr"));
        assert_eq!(sequences[1].start.number, 10);
        assert_eq!(sequences[1].end.number, 10);
    }

    #[test]
    fn test_interrupted_runs_are_not_merged() {
        let sequences = group_sequences(["a/x_001.exr", "a/y_001.exr", "a/x_002.exr"]);

        assert_eq!(sequences.len(), 3);
        assert_eq!(sequences[0].name, pattern("a", "x_{FRAME}.exr"));
        assert_eq!(sequences[1].name, pattern("a", "y_{FRAME}.exr"));
        assert_eq!(sequences[2].name, pattern("a", "x_{FRAME}.exr"));
        assert_eq!(sequences[2].start.literal, "002");
    }

    #[test]
    fn test_out_of_order_frames_widen_range() {
        let sequences = group_sequences(["s/f.0005.dpx", "s/f.0003.dpx", "s/f.0009.dpx", "s/f.0004.dpx"]);

        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].first_file(), pattern("s", "f.0003.dpx"));
        assert_eq!(sequences[0].last_file(), pattern("s", "f.0009.dpx"));
        assert_eq!(sequences[0].length(), Some(7));
    }

    #[test]
    fn test_full_frame_range_has_no_length() {
        let sequences = group_sequences(["a_0.exr", "a_18446744073709551615.exr"]);

        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].end.number, u64::MAX);
        assert_eq!(sequences[0].length(), None);

        let sequences = group_sequences(["a_1.exr", "a_18446744073709551615.exr"]);
        assert_eq!(sequences[0].length(), Some(u64::MAX));
    }

    #[test]
    fn test_last_digit_run_is_the_frame() {
        let sequences = group_sequences(["plate_v002.1001.exr", "plate_v002.1002.exr"]);

        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].name, "plate_v002.{FRAME}.exr");
        assert_eq!(sequences[0].start.number, 1001);
    }

    #[test]
    fn test_name_without_prefix() {
        let sequences = group_sequences(["0001.exr"]);
        assert_eq!(sequences[0].name, "{FRAME}.exr");
        assert_eq!(sequences[0].first_file(), "0001.exr");
    }

    #[test]
    fn test_same_name_in_other_directory_is_separate() {
        let sequences = group_sequences(["a/s_1.exr", "b/s_2.exr"]);
        assert_eq!(sequences.len(), 2);
    }

    #[test]
    fn test_skips_names_without_digits() {
        let sequences = group_sequences(["a/cover.exr", "a/s_1.exr", "a/notes.dpx"]);
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].name, pattern("a", "s_{FRAME}.exr"));
    }
}
