//! Local VS Code workspace
//!
//! Editor configuration is plain JSON under `.vscode/`; editor actions shell
//! out to the `code` CLI and git status to `git status --porcelain`. Config
//! writes are read-modify-write, so they are serialized behind one mutex.

use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::process::Command;
use tokio::sync::Mutex;

use super::types::{EditorAction, GitStatus};
use super::EditorWorkspace;
use crate::error::{PlatformError, PlatformErrorKind};

const CLI_TIMEOUT: Duration = Duration::from_secs(10);
const INSTALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Directories never listed by the workspace file walk
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "target", "__pycache__", ".venv"];

const PYTHON_EXTENSIONS: &[&str] = &[
    "ms-python.python",
    "ms-python.black-formatter",
    "ms-python.pylint",
];
const JAVASCRIPT_EXTENSIONS: &[&str] = &["esbenp.prettier-vscode", "ms-vscode.vscode-typescript-next"];
const RUST_EXTENSIONS: &[&str] = &["rust-lang.rust-analyzer"];

/// Settings and extensions applied by `setup_project`
pub fn project_preset(project_type: &str) -> Option<(Map<String, Value>, &'static [&'static str])> {
    let (settings, extensions): (Value, &'static [&'static str]) =
        match project_type.trim().to_ascii_lowercase().as_str() {
            "python" => (
                json!({
                    "python.defaultInterpreterPath": "./venv/bin/python",
                    "python.linting.enabled": true,
                    "python.linting.pylintEnabled": true,
                    "python.formatting.provider": "black"
                }),
                PYTHON_EXTENSIONS,
            ),
            "javascript" | "typescript" => (
                json!({
                    "typescript.preferences.quoteStyle": "double",
                    "editor.defaultFormatter": "esbenp.prettier-vscode"
                }),
                JAVASCRIPT_EXTENSIONS,
            ),
            "rust" => (
                json!({
                    "rust-analyzer.check.command": "clippy",
                    "editor.formatOnSave": true
                }),
                RUST_EXTENSIONS,
            ),
            _ => return None,
        };
    match settings {
        Value::Object(map) => Some((map, extensions)),
        _ => None,
    }
}

/// Parse `git status --porcelain` output
pub fn parse_porcelain(output: &str) -> GitStatus {
    let mut status = GitStatus::default();
    for line in output.lines().filter(|l| l.len() > 3) {
        let (code, path) = line.split_at(2);
        let path = path.trim_start().to_string();
        match code {
            "??" => status.untracked_files.push(path),
            c if c.starts_with('A') => status.added_files.push(path),
            c if c.contains('D') => status.deleted_files.push(path),
            c if c.contains('M') || c.contains('R') => status.modified_files.push(path),
            _ => {}
        }
    }
    status.clean = output.trim().is_empty();
    status
}

pub struct LocalWorkspace {
    root: PathBuf,
    code_bin: String,
    write_lock: Mutex<()>,
}

impl LocalWorkspace {
    /// A relative root is anchored at the current directory so absolute
    /// caller paths can be checked against it
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            root: std::path::absolute(&root).unwrap_or(root),
            code_bin: "code".to_string(),
            write_lock: Mutex::new(()),
        }
    }

    /// Use a different editor executable (e.g. `code-insiders`)
    pub fn with_code_bin(mut self, bin: impl Into<String>) -> Self {
        self.code_bin = bin.into();
        self
    }

    fn vscode_dir(&self) -> PathBuf {
        self.root.join(".vscode")
    }

    /// Resolve a caller path against the root. Absolute paths must already
    /// sit under the root; `..` is refused either way.
    fn resolve(&self, path: &str) -> Result<PathBuf, PlatformError> {
        let escapes = || {
            PlatformError::invalid_request(format!("Path '{}' leaves the workspace", path))
        };
        let candidate = Path::new(path);
        if candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(escapes());
        }
        if candidate.is_absolute() {
            if !candidate.starts_with(&self.root) {
                return Err(escapes());
            }
            return Ok(candidate.to_path_buf());
        }
        Ok(self.root.join(candidate))
    }

    async fn read_json(&self, path: &Path) -> Result<Option<Value>, PlatformError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => serde_json::from_str(&text).map(Some).map_err(|e| {
                PlatformError::upstream(format!("{} is not valid JSON: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_json(&self, path: &Path, value: &Value) -> Result<(), PlatformError> {
        tokio::fs::create_dir_all(self.vscode_dir()).await?;
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| PlatformError::upstream(e.to_string()))?;
        tokio::fs::write(path, text).await?;
        Ok(())
    }

    /// Append `entry` to the array `key` of a versioned config file
    async fn append_entry(
        &self,
        file: &str,
        version: &str,
        key: &str,
        entry: Value,
    ) -> Result<(), PlatformError> {
        let _guard = self.write_lock.lock().await;
        let path = self.vscode_dir().join(file);
        let mut doc = self
            .read_json(&path)
            .await?
            .unwrap_or_else(|| {
                let mut fresh = Map::new();
                fresh.insert("version".to_string(), json!(version));
                fresh.insert(key.to_string(), json!([]));
                Value::Object(fresh)
            });

        let list = doc
            .as_object_mut()
            .ok_or_else(|| PlatformError::upstream(format!("{} is not a JSON object", file)))?
            .entry(key)
            .or_insert_with(|| json!([]));
        match list.as_array_mut() {
            Some(items) => items.push(entry),
            None => {
                return Err(PlatformError::upstream(format!(
                    "'{}' in {} is not an array",
                    key, file
                )))
            }
        }
        self.write_json(&path, &doc).await
    }

    /// Run a process in the workspace root with a hard timeout
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<std::process::Output, PlatformError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| {
                PlatformError::network(format!(
                    "{} timed out after {}s",
                    program,
                    timeout.as_secs()
                ))
            })?;
        output.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlatformError::new(
                    PlatformErrorKind::Unavailable,
                    format!("'{}' executable not found on PATH", program),
                )
            } else {
                PlatformError::from(e)
            }
        })
    }

    async fn run_code(
        &self,
        action: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<EditorAction, PlatformError> {
        let output = self.run(&self.code_bin, args, timeout).await?;
        if !output.status.success() {
            tracing::warn!(
                action,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "code CLI exited with failure"
            );
        }
        Ok(EditorAction::new(action, output.status.success()))
    }
}

#[async_trait]
impl EditorWorkspace for LocalWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn open_project(&self, path: Option<&str>) -> Result<EditorAction, PlatformError> {
        let target = match path {
            Some(p) => self.resolve(p)?,
            None => self.root.clone(),
        };
        let target = target.to_string_lossy().to_string();
        let outcome = self
            .run_code("open_project", &[target.as_str()], CLI_TIMEOUT)
            .await?;
        Ok(outcome.with_target(target))
    }

    async fn open_file(
        &self,
        path: &str,
        line: Option<u32>,
    ) -> Result<EditorAction, PlatformError> {
        let file = self.resolve(path)?.to_string_lossy().to_string();
        let outcome = match line {
            Some(line) => {
                let location = format!("{}:{}", file, line);
                self.run_code("open_file", &["-g", location.as_str()], CLI_TIMEOUT)
                    .await?
            }
            None => {
                self.run_code("open_file", &[file.as_str()], CLI_TIMEOUT)
                    .await?
            }
        };
        Ok(outcome.with_target(file))
    }

    async fn get_settings(&self) -> Result<Map<String, Value>, PlatformError> {
        let path = self.vscode_dir().join("settings.json");
        match self.read_json(&path).await? {
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(PlatformError::upstream("settings.json is not a JSON object")),
            None => Ok(Map::new()),
        }
    }

    async fn update_settings(
        &self,
        settings: Map<String, Value>,
    ) -> Result<Map<String, Value>, PlatformError> {
        let _guard = self.write_lock.lock().await;
        let mut merged = self.get_settings().await?;
        merged.extend(settings);
        let path = self.vscode_dir().join("settings.json");
        self.write_json(&path, &Value::Object(merged.clone()))
            .await?;
        Ok(merged)
    }

    async fn create_task(&self, task_config: Value) -> Result<EditorAction, PlatformError> {
        if !task_config.is_object() {
            return Err(PlatformError::invalid_request("task_config must be an object"));
        }
        self.append_entry("tasks.json", "2.0.0", "tasks", task_config)
            .await?;
        Ok(EditorAction::new("create_task", true).with_target(".vscode/tasks.json"))
    }

    async fn create_launch_config(&self, config: Value) -> Result<EditorAction, PlatformError> {
        if !config.is_object() {
            return Err(PlatformError::invalid_request("launch_config must be an object"));
        }
        self.append_entry("launch.json", "0.2.0", "configurations", config)
            .await?;
        Ok(EditorAction::new("create_launch_config", true).with_target(".vscode/launch.json"))
    }

    async fn create_snippet(
        &self,
        language: &str,
        name: &str,
        snippet: Value,
    ) -> Result<EditorAction, PlatformError> {
        let valid_language = !language.is_empty()
            && language
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_language {
            return Err(PlatformError::invalid_request(format!(
                "Invalid snippet language '{}'",
                language
            )));
        }

        let _guard = self.write_lock.lock().await;
        let file = format!("{}.code-snippets", language);
        let path = self.vscode_dir().join(&file);
        let mut doc = match self.read_json(&path).await? {
            Some(Value::Object(map)) => map,
            Some(_) => return Err(PlatformError::upstream(format!("{} is not an object", file))),
            None => Map::new(),
        };
        doc.insert(name.to_string(), snippet);
        self.write_json(&path, &Value::Object(doc)).await?;
        Ok(EditorAction::new("create_snippet", true).with_target(format!(".vscode/{}", file)))
    }

    async fn install_extension(&self, extension_id: &str) -> Result<EditorAction, PlatformError> {
        let outcome = self
            .run_code(
                "install_extension",
                &["--install-extension", extension_id],
                INSTALL_TIMEOUT,
            )
            .await?;
        Ok(outcome.with_target(extension_id))
    }

    async fn list_extensions(&self) -> Result<Vec<String>, PlatformError> {
        let output = self
            .run(&self.code_bin, &["--list-extensions"], CLI_TIMEOUT)
            .await?;
        if !output.status.success() {
            return Ok(Vec::new());
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn get_workspace_files(
        &self,
        pattern: Option<&str>,
    ) -> Result<Vec<String>, PlatformError> {
        let mut files = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            // The root itself must be readable; anything below it is best effort
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if dir != self.root => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(dir = %dir.display(), error = %e, "Directory listing cut short");
                        break;
                    }
                };
                let path = entry.path();
                let file_type = match entry.file_type().await {
                    Ok(file_type) => file_type,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };
                if file_type.is_dir() {
                    let name = entry.file_name();
                    if !SKIPPED_DIRS.iter().any(|s| name == *s) {
                        pending.push(path);
                    }
                } else if file_type.is_file() {
                    let relative = path
                        .strip_prefix(&self.root)
                        .unwrap_or(&path)
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    if pattern.map_or(true, |p| relative.contains(p)) {
                        files.push(relative);
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }

    async fn git_status(&self) -> Result<GitStatus, PlatformError> {
        let output = self
            .run("git", &["status", "--porcelain"], CLI_TIMEOUT)
            .await?;
        if !output.status.success() {
            return Err(PlatformError::upstream(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(parse_porcelain(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_porcelain() {
        let status = parse_porcelain(" M src/lib.rs\nA  new.rs\n D gone.rs\n?? scratch.txt\n");
        assert!(!status.clean);
        assert_eq!(status.modified_files, vec!["src/lib.rs"]);
        assert_eq!(status.added_files, vec!["new.rs"]);
        assert_eq!(status.deleted_files, vec!["gone.rs"]);
        assert_eq!(status.untracked_files, vec!["scratch.txt"]);

        assert!(parse_porcelain("").clean);
    }

    #[tokio::test]
    async fn test_settings_merge() {
        let dir = TempDir::new().unwrap();
        let ws = LocalWorkspace::new(dir.path());

        assert!(ws.get_settings().await.unwrap().is_empty());

        let mut first = Map::new();
        first.insert("editor.tabSize".into(), json!(4));
        ws.update_settings(first).await.unwrap();

        let mut second = Map::new();
        second.insert("files.autoSave".into(), json!("afterDelay"));
        let merged = ws.update_settings(second).await.unwrap();

        assert_eq!(merged.get("editor.tabSize"), Some(&json!(4)));
        assert_eq!(merged.get("files.autoSave"), Some(&json!("afterDelay")));
        assert_eq!(ws.get_settings().await.unwrap(), merged);
    }

    #[tokio::test]
    async fn test_tasks_and_launch_append() {
        let dir = TempDir::new().unwrap();
        let ws = LocalWorkspace::new(dir.path());

        ws.create_task(json!({"label": "build", "command": "cargo build"}))
            .await
            .unwrap();
        ws.create_task(json!({"label": "test", "command": "cargo test"}))
            .await
            .unwrap();
        ws.create_launch_config(json!({"name": "Debug", "type": "lldb"}))
            .await
            .unwrap();

        let tasks: Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(".vscode/tasks.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(tasks["version"], "2.0.0");
        assert_eq!(tasks["tasks"].as_array().unwrap().len(), 2);

        let launch: Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(".vscode/launch.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(launch["configurations"][0]["name"], "Debug");
    }

    #[tokio::test]
    async fn test_snippet_language_validated() {
        let dir = TempDir::new().unwrap();
        let ws = LocalWorkspace::new(dir.path());

        let ok = ws
            .create_snippet("rust", "main", json!({"prefix": "main", "body": ["fn main() {}"]}))
            .await
            .unwrap();
        assert_eq!(ok.target.as_deref(), Some(".vscode/rust.code-snippets"));

        let err = ws
            .create_snippet("../etc", "x", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, PlatformErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_workspace_files_skip_vendor_dirs() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join("src/main.rs"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.js"), "").unwrap();

        let ws = LocalWorkspace::new(dir.path());
        let files = ws.get_workspace_files(None).await.unwrap();
        assert_eq!(files, vec!["README.md", "src/main.rs"]);

        let filtered = ws.get_workspace_files(Some(".rs")).await.unwrap();
        assert_eq!(filtered, vec!["src/main.rs"]);
    }

    #[tokio::test]
    async fn test_missing_editor_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let ws = LocalWorkspace::new(dir.path()).with_code_bin("definitely-not-a-real-editor-bin");
        let err = ws.list_extensions().await.unwrap_err();
        assert_eq!(err.kind, PlatformErrorKind::Unavailable);
    }

    #[test]
    fn test_resolve_rejects_parent() {
        let ws = LocalWorkspace::new("/tmp/ws");
        assert!(ws.resolve("../secret").is_err());
        assert_eq!(ws.resolve("src/a.rs").unwrap(), PathBuf::from("/tmp/ws/src/a.rs"));
    }

    #[test]
    fn test_resolve_confines_absolute_paths() {
        let ws = LocalWorkspace::new("/tmp/ws");
        let err = ws.resolve("/etc/passwd").unwrap_err();
        assert_eq!(err.kind, PlatformErrorKind::InvalidRequest);
        assert!(ws.resolve("/tmp/wsx/a.rs").is_err());
        assert!(ws.resolve("/tmp/ws/../etc/passwd").is_err());
        assert_eq!(
            ws.resolve("/tmp/ws/src/a.rs").unwrap(),
            PathBuf::from("/tmp/ws/src/a.rs")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_workspace_files_skip_unreadable_dir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir_all(&locked).unwrap();
        std::fs::write(locked.join("hidden.rs"), "").unwrap();
        std::fs::write(dir.path().join("lib.rs"), "").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // root ignores mode bits, so there is nothing to exercise
        if std::fs::read_dir(&locked).is_ok() {
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let ws = LocalWorkspace::new(dir.path());
        let files = ws.get_workspace_files(None).await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(files.unwrap(), vec!["lib.rs"]);
    }

    #[test]
    fn test_presets() {
        assert!(project_preset("python").is_some());
        assert!(project_preset("JavaScript").is_some());
        assert!(project_preset("cobol").is_none());
    }
}
