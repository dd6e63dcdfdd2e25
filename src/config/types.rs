use serde::{Deserialize, Serialize};

/// 預設設定檔路徑
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
/// 指定設定檔路徑的環境變數
pub const CONFIG_ENV_VAR: &str = "SEQINFO_CONFIG";
/// `output` 函式預設允許執行的指令
pub const DEFAULT_ALLOWED_COMMANDS: &[&str] = &["ffprobe"];

/// 報表欄位：名稱與對應的樣板運算式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFields {
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Column labels, in report order.
    pub fields: Vec<String>,
    #[serde(default)]
    pub seq: EntityFields,
    #[serde(default)]
    pub mov: EntityFields,
    #[serde(default = "default_allowed_commands")]
    pub allowed_commands: Vec<String>,
}

fn default_allowed_commands() -> Vec<String> {
    DEFAULT_ALLOWED_COMMANDS
        .iter()
        .map(ToString::to_string)
        .collect()
}

impl Config {
    /// 欄位名稱在報表中的欄位索引
    #[must_use]
    pub fn column_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field == name)
    }
}
