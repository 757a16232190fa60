//! 项目配置：名称、描述、视觉主题与功能列表
//!
//! 由调用方（向导表单 / CLI 读取的 TOML 文件）在工作流启动前创建，运行期间只读。

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 功能列表为空时写入提示词的占位说明
pub const IMPLIED_FEATURES: &str = "features implied by the description";

/// 固定的视觉主题标识（线上格式为 kebab-case，如 `modern-clean`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    ModernClean,
    Glassmorphism,
    Neobrutalism,
    Cyberpunk,
    Minimal,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::ModernClean,
        Theme::Glassmorphism,
        Theme::Neobrutalism,
        Theme::Cyberpunk,
        Theme::Minimal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::ModernClean => "modern-clean",
            Theme::Glassmorphism => "glassmorphism",
            Theme::Neobrutalism => "neobrutalism",
            Theme::Cyberpunk => "cyberpunk",
            Theme::Minimal => "minimal",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Theme::ALL
            .into_iter()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| format!("unknown theme: {}", s))
    }
}

/// 用户提交的项目描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub description: String,
    pub theme: Theme,
    #[serde(default)]
    pub features: Vec<String>,
}

/// 读取项目描述文件失败的原因
#[derive(Debug, thiserror::Error)]
pub enum ProjectFileError {
    #[error("failed to read project file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid project file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("project name must not be empty")]
    MissingName,
}

impl ProjectConfig {
    pub fn new(name: impl Into<String>, description: impl Into<String>, theme: Theme) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            theme,
            features: Vec::new(),
        }
    }

    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    /// 从 TOML 文件加载（字段与结构体同名，theme 用 kebab-case）
    pub fn from_toml_file(path: &Path) -> Result<Self, ProjectFileError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ProjectFileError> {
        let config: ProjectConfig = toml::from_str(text)?;
        if config.name.trim().is_empty() {
            return Err(ProjectFileError::MissingName);
        }
        Ok(config)
    }

    /// 提示词中使用的功能列表：逗号分隔；为空时返回占位说明
    pub fn features_list(&self) -> String {
        if self.features.is_empty() {
            IMPLIED_FEATURES.to_string()
        } else {
            self.features.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_round_trip_kebab_case() {
        let json = serde_json::to_string(&Theme::ModernClean).unwrap();
        assert_eq!(json, "\"modern-clean\"");
        assert_eq!("Cyberpunk".parse::<Theme>().unwrap(), Theme::Cyberpunk);
        assert!("vaporwave".parse::<Theme>().is_err());
    }

    #[test]
    fn test_features_list_fallback() {
        let cfg = ProjectConfig::new("T", "d", Theme::Minimal);
        assert_eq!(cfg.features_list(), IMPLIED_FEATURES);

        let cfg = cfg.with_features(["add tasks", "dark mode"]);
        assert_eq!(cfg.features_list(), "add tasks, dark mode");
    }

    #[test]
    fn test_from_toml_str() {
        let cfg = ProjectConfig::from_toml_str(
            r#"
            name = "TaskMaster"
            description = "A todo app"
            theme = "glassmorphism"
            features = ["add", "delete"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.name, "TaskMaster");
        assert_eq!(cfg.theme, Theme::Glassmorphism);
        assert_eq!(cfg.features.len(), 2);
    }

    #[test]
    fn test_from_toml_str_rejects_blank_name() {
        let err = ProjectConfig::from_toml_str(
            r#"
            name = "  "
            description = "d"
            theme = "minimal"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ProjectFileError::MissingName));
    }
}
