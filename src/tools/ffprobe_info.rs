use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// ffprobe 執行或解析失敗，對該次執行來說是致命錯誤
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("could not run ffprobe on {path}: {source}")]
    Spawn {
        path: String,
        source: std::io::Error,
    },

    #[error("ffprobe failed on {path}: {output}")]
    Failed { path: String, output: String },

    #[error("failed to decode ffprobe output: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no video streams")]
    NoVideoStream,

    #[error("too many video streams: {0}")]
    MultipleVideoStreams(usize),
}

/// ffprobe 的 JSON 輸出
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeRecord {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
    #[serde(default)]
    pub format: ProbeFormat,
}

/// 視訊串流資訊（`-select_streams v:0` 只會回傳視訊串流）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProbeStream {
    pub nb_frames: Option<String>,
    pub r_frame_rate: Option<String>,
    pub codec_name: Option<String>,
    pub profile: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub tags: StreamTags,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StreamTags {
    pub timecode: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProbeFormat {
    pub tags: FormatTags,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FormatTags {
    /// Colorspace written by Nuke into the container metadata.
    #[serde(rename = "uk.co.thefoundry.Colorspace")]
    pub foundry_colorspace: Option<String>,
}

impl ProbeRecord {
    pub fn from_json(json: &str) -> Result<Self, ProbeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// 取得唯一的視訊串流
    pub fn video_stream(&self) -> Result<&ProbeStream, ProbeError> {
        match self.streams.as_slice() {
            [] => Err(ProbeError::NoVideoStream),
            [stream] => Ok(stream),
            streams => Err(ProbeError::MultipleVideoStreams(streams.len())),
        }
    }
}

/// Source of probe records for movie files.
pub trait MovieProbe: Sync {
    fn probe(&self, path: &Path) -> Result<ProbeRecord, ProbeError>;
}

/// 使用外部 ffprobe 取得影片資訊
#[derive(Debug, Clone, Copy, Default)]
pub struct Ffprobe;

impl MovieProbe for Ffprobe {
    fn probe(&self, path: &Path) -> Result<ProbeRecord, ProbeError> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-show_format",
                "-show_streams",
                "-select_streams",
                "v:0",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|source| ProbeError::Spawn {
                path: path.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(ProbeError::Failed {
                path: path.display().to_string(),
                output: combined.trim().to_string(),
            });
        }

        ProbeRecord::from_json(&String::from_utf8_lossy(&output.stdout))
    }
}
