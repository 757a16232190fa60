//! 产物集合：文件名 → {语言标签, 内容}
//!
//! 以 name 为唯一键，后写覆盖（last-write-wins），不保留历史版本。
//! 合并规则：先删除与传入文件同名的旧文件，再按传入顺序追加；顺序只影响展示。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 单个生成文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Artifact {
    /// 文件名，如 index.html、style.css、app.js
    pub name: String,
    /// 语言标签，如 html、css、javascript、markdown（不做白名单校验）
    pub language: String,
    /// 完整文件内容
    pub content: String,
}

impl Artifact {
    pub fn new(
        name: impl Into<String>,
        language: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            content: content.into(),
        }
    }
}

/// 一次合并的结果：哪些文件是新建、哪些替换了旧版本
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
}

impl MergeReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty()
    }

    pub fn len(&self) -> usize {
        self.created.len() + self.updated.len()
    }
}

/// 有序产物集合；任何一次合并之后不存在重名文件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactSet {
    files: Vec<Artifact>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[Artifact] {
        &self.files
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// 合并一批文件：同名旧文件被移除，传入文件追加到末尾。
    /// 同一批次内重名时只保留最后一个。
    pub fn merge(&mut self, incoming: Vec<Artifact>) -> MergeReport {
        let mut batch: Vec<Artifact> = Vec::with_capacity(incoming.len());
        for file in incoming {
            batch.retain(|f| f.name != file.name);
            batch.push(file);
        }

        let mut report = MergeReport::default();
        for file in &batch {
            if self.get(&file.name).is_some() {
                report.updated.push(file.name.clone());
            } else {
                report.created.push(file.name.clone());
            }
        }

        self.files
            .retain(|existing| !batch.iter().any(|f| f.name == existing.name));
        self.files.extend(batch);
        report
    }

    /// 拼接所有文件内容，作为后续步骤提示词中的上下文
    pub fn render_context(&self) -> String {
        self.files
            .iter()
            .map(|f| format!("--- {} ---\n{}", f.name, f.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl From<Vec<Artifact>> for ArtifactSet {
    fn from(files: Vec<Artifact>) -> Self {
        let mut set = ArtifactSet::new();
        set.merge(files);
        set
    }
}

impl IntoIterator for ArtifactSet {
    type Item = Artifact;
    type IntoIter = std::vec::IntoIter<Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}
