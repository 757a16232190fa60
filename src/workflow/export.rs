//! 导出：把已完成运行的产物写到项目目录

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::artifact::ArtifactSet;
use crate::core::{LogKind, WorkflowError};
use crate::workflow::Forge;

/// 项目名 → 目录名：小写字母数字，其余字符折叠为 `-`
pub fn project_dir_name(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

/// 文件名必须是相对路径，且不能跳出项目目录
fn check_artifact_path(name: &str) -> Result<(), WorkflowError> {
    let path = Path::new(name);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if name.trim().is_empty() || path.is_absolute() || escapes {
        return Err(WorkflowError::UnsafePath(name.to_string()));
    }
    Ok(())
}

/// 写出全部产物；先校验所有路径，任一不安全则一个文件也不写
pub fn export_artifacts(set: &ArtifactSet, dir: &Path) -> Result<Vec<PathBuf>, WorkflowError> {
    for artifact in set.files() {
        check_artifact_path(&artifact.name)?;
    }

    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(set.len());
    for artifact in set.files() {
        let path = dir.join(&artifact.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &artifact.content)?;
        tracing::debug!(path = %path.display(), "Artifact written");
        written.push(path);
    }
    Ok(written)
}

impl Forge {
    /// 导出到 `<root>/<项目目录名>`；只允许已完成的运行
    pub fn export(&self, root: &Path) -> Result<PathBuf, WorkflowError> {
        let _guard = self.acquire()?;
        if !self.board.phase().is_completed() {
            return Err(WorkflowError::NotCompleted);
        }
        let project = self.board.project().ok_or(WorkflowError::NotCompleted)?;

        let dir = root.join(project_dir_name(&project.name));
        let written = export_artifacts(&self.board.artifacts(), &dir)?;
        tracing::info!(dir = %dir.display(), files = written.len(), "Project exported");
        self.board.system_log(
            format!("Exported {} files to {}", written.len(), dir.display()),
            LogKind::Success,
        );
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;

    #[test]
    fn test_project_dir_name() {
        assert_eq!(project_dir_name("Task Master 3000"), "task-master-3000");
        assert_eq!(project_dir_name("  --My__App!! "), "my-app");
        assert_eq!(project_dir_name("???"), "project");
    }

    #[test]
    fn test_export_writes_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let set = ArtifactSet::from(vec![
            Artifact::new("index.html", "html", "<main></main>"),
            Artifact::new("assets/app.js", "javascript", "init()"),
        ]);

        let written = export_artifacts(&set, dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("assets/app.js")).unwrap(),
            "init()"
        );
    }

    #[test]
    fn test_unsafe_paths_write_nothing() {
        for bad in ["../escape.js", "/etc/passwd", "a/../../b.js", "  "] {
            let dir = tempfile::tempdir().unwrap();
            let set = ArtifactSet::from(vec![
                Artifact::new("index.html", "html", "ok"),
                Artifact::new(bad, "javascript", "x"),
            ]);
            let err = export_artifacts(&set, &dir.path().join("out")).unwrap_err();
            assert!(matches!(err, WorkflowError::UnsafePath(ref p) if p == bad));
            assert!(!dir.path().join("out").exists());
        }
    }
}
