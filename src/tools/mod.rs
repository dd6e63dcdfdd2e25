mod ffprobe_info;
mod file_scanner;
mod path_validator;
mod timecode;

pub use ffprobe_info::{
    FormatTags, Ffprobe, MovieProbe, ProbeError, ProbeFormat, ProbeRecord, ProbeStream,
    StreamTags,
};
pub use file_scanner::{lowercase_extension, scan_media_files};
pub use path_validator::{clean_path, validate_directory_exists};
pub use timecode::{Timecode, TimecodeError};
