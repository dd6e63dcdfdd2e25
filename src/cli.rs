use crate::config::{CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
use clap::Parser;
use std::path::PathBuf;

/// Inventory image sequences and movies under a directory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory to search
    #[arg(value_name = "SEARCH_ROOT")]
    pub search_root: PathBuf,

    /// Path of config file
    #[arg(short = 'c', long = "config", env = CONFIG_ENV_VAR, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Image sequence extensions
    #[arg(long = "img-exts", value_delimiter = ',', default_values = ["dpx", "exr"])]
    pub image_extensions: Vec<String>,

    /// Movie extensions
    #[arg(long = "mov-exts", value_delimiter = ',', default_values = ["mov", "mp4"])]
    pub movie_extensions: Vec<String>,

    /// Fields will be separated by this value when printed
    #[arg(long = "sep", default_value = "\t")]
    pub separator: String,

    /// Print errors from value calculation
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Write to an Excel file instead of printing
    #[arg(short = 'w', long = "write")]
    pub write: bool,

    /// Excel file to write when --write is set; an existing file is overwritten
    #[arg(short = 'o', long = "output", default_value = "seqinfo_output.xlsx")]
    pub output: PathBuf,
}

impl Args {
    /// 實際要寫入的 Excel 路徑；空路徑時改為列印
    #[must_use]
    pub fn spreadsheet_path(&self) -> Option<PathBuf> {
        (self.write && !self.output.as_os_str().is_empty()).then(|| self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["seqinfo", "-c", "my.toml", "shots"]).unwrap();
        assert_eq!(args.search_root, PathBuf::from("shots"));
        assert_eq!(args.config, PathBuf::from("my.toml"));
        assert_eq!(args.image_extensions, vec!["dpx", "exr"]);
        assert_eq!(args.movie_extensions, vec!["mov", "mp4"]);
        assert_eq!(args.separator, "\t");
        assert!(!args.verbose);
        assert_eq!(args.spreadsheet_path(), None);
    }

    #[test]
    fn test_write_flags() {
        let args =
            Args::try_parse_from(["seqinfo", "-c", "c.toml", "-w", "-o", "out.xlsx", "."]).unwrap();
        assert_eq!(args.spreadsheet_path(), Some(PathBuf::from("out.xlsx")));

        let args = Args::try_parse_from(["seqinfo", "-c", "c.toml", "-w", "-o", "", "."]).unwrap();
        assert_eq!(args.spreadsheet_path(), None);
    }

    #[test]
    fn test_extension_lists() {
        let args = Args::try_parse_from([
            "seqinfo", "-c", "c.toml", "--img-exts", "exr,tif,png", "--mov-exts", "mxf", ".",
        ])
        .unwrap();
        assert_eq!(args.image_extensions, vec!["exr", "tif", "png"]);
        assert_eq!(args.movie_extensions, vec!["mxf"]);
    }

    #[test]
    fn test_missing_search_root() {
        assert!(Args::try_parse_from(["seqinfo"]).is_err());
    }
}
