//! Output side channel.
//!
//! Outputs are flat `name=value` pairs consumed by whatever launched the
//! process. In GitHub Actions that is the file named by `GITHUB_OUTPUT`;
//! values spanning several lines use the heredoc form the runner expects.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{info, warn};
use uuid::Uuid;

/// Receives outputs as soon as they are known.
pub trait OutputSink: Send {
    fn set_output(&mut self, name: &str, value: &str);
}

/// Appends outputs to a file. Without a path, outputs are only logged.
#[derive(Debug, Clone, Default)]
pub struct FileOutputs {
    path: Option<PathBuf>,
}

impl FileOutputs {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn append(path: &Path, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())
    }
}

impl OutputSink for FileOutputs {
    fn set_output(&mut self, name: &str, value: &str) {
        info!(output = name, value, "output set");
        let Some(path) = self.path.as_deref() else {
            return;
        };
        if let Err(error) = Self::append(path, &format_output_line(name, value)) {
            warn!(path = %path.display(), output = name, error = %error, "failed to write output");
        }
    }
}

/// In-memory sink. Later writes of the same name replace earlier ones but
/// keep the first insertion position.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutputs {
    values: IndexMap<String, String>,
}

impl MemoryOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl OutputSink for MemoryOutputs {
    fn set_output(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }
}

/// Render one output record in the runner's file format.
pub fn format_output_line(name: &str, value: &str) -> String {
    if value.contains('\n') {
        let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
        format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
    } else {
        format!("{name}={value}\n")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn file_outputs_append_one_line_per_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output");
        let mut sink = FileOutputs::new(Some(path.clone()));

        sink.set_output("workflow_id", "123");
        sink.set_output("conclusion", "success");

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "workflow_id=123\nconclusion=success\n");
    }

    #[test]
    fn file_outputs_without_path_do_nothing() {
        let mut sink = FileOutputs::new(None);
        sink.set_output("workflow_id", "1");
        assert!(sink.path().is_none());
    }

    #[test]
    fn unwritable_path_is_not_fatal() {
        let dir = tempdir().unwrap();
        let mut sink = FileOutputs::new(Some(dir.path().join("missing").join("output")));
        sink.set_output("workflow_id", "1");
    }

    #[test]
    fn multiline_values_use_heredoc_form() {
        let line = format_output_line("notes", "a\nb");
        let mut parts = line.lines();
        let header = parts.next().unwrap();
        let delimiter = header.strip_prefix("notes<<").unwrap();
        assert_eq!(parts.next(), Some("a"));
        assert_eq!(parts.next(), Some("b"));
        assert_eq!(parts.next(), Some(delimiter));
    }

    #[test]
    fn memory_outputs_keep_latest_value() {
        let mut sink = MemoryOutputs::new();
        sink.set_output("conclusion", "");
        sink.set_output("workflow_id", "5");
        sink.set_output("conclusion", "success");
        assert_eq!(sink.get("conclusion"), Some("success"));
        assert_eq!(sink.names().collect::<Vec<_>>(), vec!["conclusion", "workflow_id"]);
    }
}
