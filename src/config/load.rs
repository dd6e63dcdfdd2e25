use crate::config::types::{Config, EntityFields};
use anyhow::{Context, Result, bail};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

impl Config {
    /// 從 TOML 檔案載入設定
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("could not decode config file (toml): {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let mut labels = HashSet::new();
        for label in &self.fields {
            if !labels.insert(label.as_str()) {
                bail!("duplicate column label: {label}");
            }
        }

        Self::validate_entity_fields("seq", &self.seq, &labels)?;
        Self::validate_entity_fields("mov", &self.mov, &labels)?;
        Ok(())
    }

    fn validate_entity_fields(
        category: &str,
        entity: &EntityFields,
        labels: &HashSet<&str>,
    ) -> Result<()> {
        let mut seen = HashSet::new();
        for field in &entity.fields {
            if !labels.contains(field.name.as_str()) {
                bail!("{category} field {:?} is not listed in fields", field.name);
            }
            if !seen.insert(field.name.as_str()) {
                bail!("{category} field {:?} is defined more than once", field.name);
            }
        }
        Ok(())
    }
}
