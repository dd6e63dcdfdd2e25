//! 影片資訊建構
//!
//! Maps a probe record to a [`Mov`]. Every field is computed on its own, a
//! missing piece of metadata only affects the field that needs it.

use crate::tools::{ProbeError, ProbeRecord, ProbeStream, Timecode, TimecodeError};
use log::debug;
use thiserror::Error;

/// 單一欄位計算失敗的原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("missing {0} information")]
    MissingInfo(&'static str),

    #[error("unknown r_frame_rate: {0}")]
    UnknownFrameRate(String),

    #[error("invalid nb_frames: {0}")]
    InvalidFrameCount(String),

    #[error(transparent)]
    Timecode(#[from] TimecodeError),
}

/// 欄位錯誤的呈現方式：verbose 時顯示錯誤訊息，否則留空
#[must_use]
pub fn render_field(value: Result<String, FieldError>, verbose: bool) -> String {
    match value {
        Ok(value) => value,
        Err(e) if verbose => e.to_string(),
        Err(_) => String::new(),
    }
}

/// Frame rates the report knows how to label and count timecode for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRate {
    Fps24,
    Fps23976,
    Fps30,
}

impl FrameRate {
    pub fn from_probe(raw: &str) -> Result<Self, FieldError> {
        match raw {
            "24/1" => Ok(Self::Fps24),
            "24000/1001" => Ok(Self::Fps23976),
            "30/1" => Ok(Self::Fps30),
            other => Err(FieldError::UnknownFrameRate(other.to_string())),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fps24 => "24",
            Self::Fps23976 => "23.976",
            Self::Fps30 => "30",
        }
    }

    /// (timecode base, drop frame)
    #[must_use]
    pub const fn timecode_base(self) -> (u32, bool) {
        match self {
            Self::Fps24 => (24, false),
            // 23.976 is counted on a 24 base, the timecode coerces it to non-drop.
            Self::Fps23976 => (24, true),
            Self::Fps30 => (30, false),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mov {
    pub file: String,
    pub timecode_in: String,
    pub timecode_out: String,
    pub duration: String,
    pub fps: String,
    pub resolution: String,
    pub codec: String,
    pub colorspace: String,
}

/// 由 probe 結果建立 [`Mov`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MovBuilder {
    verbose: bool,
}

impl MovBuilder {
    #[must_use]
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Fails only when the record does not hold exactly one video stream.
    pub fn build(&self, file: &str, record: &ProbeRecord) -> Result<Mov, ProbeError> {
        let video = record.video_stream()?;
        let render = |name: &str, value: Result<String, FieldError>| {
            if let Err(e) = &value {
                debug!("{file}: {name}: {e}");
            }
            render_field(value, self.verbose)
        };

        Ok(Mov {
            file: file.to_string(),
            timecode_in: render("timecode_in", Ok(timecode_in(video))),
            timecode_out: render("timecode_out", timecode_out(video)),
            duration: render("duration", duration(video)),
            fps: render("fps", fps(video)),
            resolution: render("resolution", resolution(video)),
            codec: render("codec", codec(video)),
            colorspace: colorspace(record),
        })
    }
}

fn timecode_in(video: &ProbeStream) -> String {
    video.tags.timecode.clone().unwrap_or_default()
}

fn timecode_out(video: &ProbeStream) -> Result<String, FieldError> {
    let Some(code) = non_empty(video.tags.timecode.as_deref()) else {
        return Ok(String::new());
    };
    let raw_rate =
        non_empty(video.r_frame_rate.as_deref()).ok_or(FieldError::MissingInfo("r_frame_rate"))?;
    let frames = frame_count(video)?;
    let (base, drop_frame) = FrameRate::from_probe(raw_rate)?.timecode_base();

    let mut timecode = Timecode::parse(code, base, drop_frame)?;
    // Overflow is reported in this cell only, the rest of the movie still renders.
    timecode.add(frames - 1)?;
    Ok(timecode.to_string())
}

fn duration(video: &ProbeStream) -> Result<String, FieldError> {
    non_empty(video.nb_frames.as_deref())
        .map(ToString::to_string)
        .ok_or(FieldError::MissingInfo("nb_frames"))
}

fn frame_count(video: &ProbeStream) -> Result<i64, FieldError> {
    let raw = non_empty(video.nb_frames.as_deref()).ok_or(FieldError::MissingInfo("nb_frames"))?;
    match raw.parse::<i64>() {
        Ok(frames) if frames > 0 => Ok(frames),
        _ => Err(FieldError::InvalidFrameCount(raw.to_string())),
    }
}

fn fps(video: &ProbeStream) -> Result<String, FieldError> {
    let raw =
        non_empty(video.r_frame_rate.as_deref()).ok_or(FieldError::MissingInfo("r_frame_rate"))?;
    Ok(FrameRate::from_probe(raw)?.label().to_string())
}

fn resolution(video: &ProbeStream) -> Result<String, FieldError> {
    let width = video
        .width
        .filter(|w| *w > 0)
        .ok_or(FieldError::MissingInfo("width"))?;
    let height = video
        .height
        .filter(|h| *h > 0)
        .ok_or(FieldError::MissingInfo("height"))?;
    Ok(format!("{width}*{height}"))
}

fn codec(video: &ProbeStream) -> Result<String, FieldError> {
    let name =
        non_empty(video.codec_name.as_deref()).ok_or(FieldError::MissingInfo("codec_name"))?;
    let profile =
        non_empty(video.profile.as_deref()).ok_or(FieldError::MissingInfo("codec_profile"))?;
    Ok(format!("{} {profile}", title_case(name)))
}

fn colorspace(record: &ProbeRecord) -> String {
    record
        .format
        .tags
        .foundry_colorspace
        .clone()
        .unwrap_or_default()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// `PRORES` -> `Prores`, `dnx_hd-lb` -> `Dnx_hd-Lb`
fn title_case(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut word_start = true;
    for c in value.chars().flat_map(char::to_lowercase) {
        if word_start {
            result.extend(c.to_uppercase());
        } else {
            result.push(c);
        }
        word_start = !(c.is_alphanumeric() || c == '_');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> ProbeRecord {
        ProbeRecord::from_json(json).unwrap()
    }

    fn prores_record(timecode: &str, nb_frames: &str, colorspace: Option<&str>) -> ProbeRecord {
        let format_tags = colorspace
            .map(|c| format!(r#""tags": {{"uk.co.thefoundry.Colorspace": "{c}"}}"#))
            .unwrap_or_default();
        record(&format!(
            r#"{{
                "streams": [{{
                    "codec_name": "prores",
                    "profile": "HQ",
                    "width": 1920,
                    "height": 1080,
                    "r_frame_rate": "24000/1001",
                    "nb_frames": "{nb_frames}",
                    "tags": {{"timecode": "{timecode}"}}
                }}],
                "format": {{{format_tags}}}
            }}"#
        ))
    }

    #[test]
    fn test_build_prores_movies() {
        let cases = [
            ("00:00:00:00", "22", None, "00:00:00:21"),
            ("00:00:00:00", "107", Some("rec709"), "00:00:04:10"),
            ("12:14:20:17", "30", None, "12:14:21:22"),
        ];
        for (tc_in, frames, colorspace, tc_out) in cases {
            let mov = MovBuilder::new(false)
                .build("clip.mov", &prores_record(tc_in, frames, colorspace))
                .unwrap();
            assert_eq!(
                mov,
                Mov {
                    file: "clip.mov".to_string(),
                    timecode_in: tc_in.to_string(),
                    timecode_out: tc_out.to_string(),
                    duration: frames.to_string(),
                    fps: "23.976".to_string(),
                    resolution: "1920*1080".to_string(),
                    codec: "Prores HQ".to_string(),
                    colorspace: colorspace.unwrap_or_default().to_string(),
                }
            );
        }
    }

    #[test]
    fn test_missing_dimensions_only_affect_resolution() {
        let record = record(
            r#"{"streams": [{
                "codec_name": "h264", "profile": "High",
                "r_frame_rate": "30/1", "nb_frames": "300",
                "tags": {"timecode": "01:00:00:00"}
            }]}"#,
        );

        let quiet = MovBuilder::new(false).build("a.mp4", &record).unwrap();
        assert_eq!(quiet.resolution, "");
        assert_eq!(quiet.fps, "30");
        assert_eq!(quiet.codec, "H264 High");
        assert_eq!(quiet.duration, "300");
        assert_eq!(quiet.timecode_out, "01:00:09:29");

        let verbose = MovBuilder::new(true).build("a.mp4", &record).unwrap();
        assert_eq!(verbose.resolution, "missing width information");
        assert_eq!(verbose.fps, "30");
    }

    #[test]
    fn test_unknown_frame_rate() {
        let record = record(
            r#"{"streams": [{"r_frame_rate": "25/1", "nb_frames": "10",
                "tags": {"timecode": "00:00:00:00"}}]}"#,
        );
        let mov = MovBuilder::new(true).build("a.mov", &record).unwrap();
        assert_eq!(mov.fps, "unknown r_frame_rate: 25/1");
        assert_eq!(mov.timecode_out, "unknown r_frame_rate: 25/1");
        assert_eq!(mov.duration, "10");
    }

    #[test]
    fn test_no_timecode_leaves_timecodes_empty() {
        let record = record(r#"{"streams": [{"r_frame_rate": "24/1"}]}"#);
        let mov = MovBuilder::new(true).build("a.mov", &record).unwrap();
        assert_eq!(mov.timecode_in, "");
        assert_eq!(mov.timecode_out, "");
        assert_eq!(mov.duration, "missing nb_frames information");
        assert_eq!(mov.codec, "missing codec_name information");
        assert_eq!(mov.colorspace, "");
    }

    #[test]
    fn test_invalid_timecode_tag() {
        let record = record(
            r#"{"streams": [{"r_frame_rate": "24/1", "nb_frames": "5",
                "tags": {"timecode": "1:00:00:00"}}]}"#,
        );
        let mov = MovBuilder::new(true).build("a.mov", &record).unwrap();
        assert_eq!(mov.timecode_in, "1:00:00:00");
        assert_eq!(mov.timecode_out, "invalid timecode: 1:00:00:00");
    }

    #[test]
    fn test_invalid_frame_count() {
        let record = record(
            r#"{"streams": [{"r_frame_rate": "24/1", "nb_frames": "N/A",
                "tags": {"timecode": "00:00:00:00"}}]}"#,
        );
        let mov = MovBuilder::new(true).build("a.mov", &record).unwrap();
        assert_eq!(mov.timecode_out, "invalid nb_frames: N/A");
        assert_eq!(mov.duration, "N/A");
    }

    #[test]
    fn test_empty_movie_has_no_timecode_out() {
        for nb_frames in ["0", "-3"] {
            let mov = MovBuilder::new(true)
                .build("a.mov", &prores_record("00:00:00:00", nb_frames, None))
                .unwrap();
            assert_eq!(mov.timecode_out, format!("invalid nb_frames: {nb_frames}"));
            assert_eq!(mov.duration, nb_frames);
            assert_eq!(mov.fps, "23.976");
        }

        let quiet = MovBuilder::new(false)
            .build("a.mov", &prores_record("00:00:00:00", "0", None))
            .unwrap();
        assert_eq!(quiet.timecode_out, "");
    }

    #[test]
    fn test_timecode_overflow_stays_in_its_cell() {
        let mov = MovBuilder::new(true)
            .build("a.mov", &prores_record("01:00:00:00", &i64::MAX.to_string(), None))
            .unwrap();
        assert_eq!(mov.timecode_out, "timecode frame count overflow");
        assert_eq!(mov.timecode_in, "01:00:00:00");
        assert_eq!(mov.resolution, "1920*1080");
    }

    #[test]
    fn test_stream_count_is_fatal() {
        let builder = MovBuilder::new(false);
        assert!(matches!(
            builder.build("a.mov", &record(r#"{"streams": []}"#)),
            Err(ProbeError::NoVideoStream)
        ));
        assert!(matches!(
            builder.build("a.mov", &record(r#"{"streams": [{}, {}]}"#)),
            Err(ProbeError::MultipleVideoStreams(2))
        ));
    }

    #[test]
    fn test_render_field() {
        let err = Err(FieldError::MissingInfo("width"));
        assert_eq!(render_field(err.clone(), false), "");
        assert_eq!(render_field(err, true), "missing width information");
        assert_eq!(render_field(Ok("x".to_string()), false), "x");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("PRORES"), "Prores");
        assert_eq!(title_case("h264"), "H264");
        assert_eq!(title_case("dnx_hd-lb"), "Dnx_hd-Lb");
    }
}
