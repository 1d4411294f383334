//! Tools that ship with the engine
//!
//! A local clock and a small file store confined to one directory. They are
//! ordinary [`LocalTool`]s, registered the same way as caller functions:
//!
//! ```rust,ignore
//! let askit = AskIt::from_settings(settings, logger).with_tools(builtin::all("files"));
//! ```

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};

use super::descriptor::{ParamSpec, ParamType, ToolSpec};
use super::error::{ToolError, ToolResult};
use super::function::{FunctionTool, LocalTool};

/// Format of the `get_current_time` answer
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `get_current_time`: local date and time as [`TIME_FORMAT`]
pub fn current_time_tool() -> Arc<dyn LocalTool> {
    FunctionTool::new(
        ToolSpec::new("get_current_time").doc("Get the current date and time."),
        |_| async move { Ok(json!(chrono::Local::now().format(TIME_FORMAT).to_string())) },
    )
    .shared()
}

/// `list_files`, `read_file` and `write_file`, all rooted at `dir`
///
/// File names are single path components; anything that would leave `dir`
/// is rejected as invalid arguments. The directory is created on first write.
pub fn file_tools(dir: impl Into<PathBuf>) -> Vec<Arc<dyn LocalTool>> {
    let dir = Arc::new(dir.into());
    vec![list_files(dir.clone()), read_file(dir.clone()), write_file(dir)]
}

/// The clock plus the file tools rooted at `files_dir`
pub fn all(files_dir: impl Into<PathBuf>) -> Vec<Arc<dyn LocalTool>> {
    let mut tools = vec![current_time_tool()];
    tools.extend(file_tools(files_dir));
    tools
}

fn list_files(dir: Arc<PathBuf>) -> Arc<dyn LocalTool> {
    FunctionTool::new(
        ToolSpec::new("list_files").doc("Lists the files that are available."),
        move |_| {
            let dir = dir.clone();
            async move {
                let names = file_names(&dir)
                    .await
                    .map_err(|e| ToolError::failed("list_files", e.to_string()))?;
                if names.is_empty() {
                    Ok(json!("No files available"))
                } else {
                    Ok(json!(format!("Files available: {}", names.join(", "))))
                }
            }
        },
    )
    .shared()
}

fn read_file(dir: Arc<PathBuf>) -> Arc<dyn LocalTool> {
    FunctionTool::new(
        ToolSpec::new("read_file")
            .doc("Reads the content of a file with the given filename.")
            .param(ParamSpec::new("filename", ParamType::String).describe("The name of the file to read.")),
        move |args| {
            let dir = dir.clone();
            async move {
                let filename = string_arg("read_file", &args, "filename")?;
                let path = sandboxed(&dir, "read_file", &filename)?;
                let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
                    ToolError::failed("read_file", format!("cannot read `{}`: {}", filename, e))
                })?;
                Ok(json!(content))
            }
        },
    )
    .shared()
}

fn write_file(dir: Arc<PathBuf>) -> Arc<dyn LocalTool> {
    FunctionTool::new(
        ToolSpec::new("write_file")
            .doc("Writes the given content to a file with the given filename.")
            .param(ParamSpec::new("filename", ParamType::String).describe("The name of the file to write to."))
            .param(ParamSpec::new("content", ParamType::String).describe("The content to write to the file.")),
        move |args| {
            let dir = dir.clone();
            async move {
                let filename = string_arg("write_file", &args, "filename")?;
                let content = string_arg("write_file", &args, "content")?;
                let path = sandboxed(&dir, "write_file", &filename)?;
                let write = async {
                    tokio::fs::create_dir_all(dir.as_path()).await?;
                    tokio::fs::write(&path, content).await
                };
                write.await.map_err(|e| {
                    ToolError::failed("write_file", format!("cannot write `{}`: {}", filename, e))
                })?;
                Ok(json!(format!("Successfully wrote to {}", filename)))
            }
        },
    )
    .shared()
}

/// Sorted names of the regular files in `dir`; a missing directory is empty
async fn file_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn string_arg(tool: &str, args: &Value, name: &str) -> ToolResult<String> {
    args[name]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ToolError::invalid_arguments(tool, format!("`{}` must be a string", name)))
}

/// `dir/filename`, provided `filename` names an entry directly inside `dir`
fn sandboxed(dir: &Path, tool: &str, filename: &str) -> ToolResult<PathBuf> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => Ok(dir.join(name)),
        _ => Err(ToolError::invalid_arguments(
            tool,
            format!("`{}` is not a plain file name", filename),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::render_output;

    fn tool(tools: &[Arc<dyn LocalTool>], name: &str) -> Arc<dyn LocalTool> {
        tools
            .iter()
            .find(|t| t.spec().name == name)
            .cloned()
            .unwrap()
    }

    async fn run(tool: &Arc<dyn LocalTool>, args: Value) -> ToolResult<String> {
        tool.call(args).await.map(|v| render_output(&v))
    }

    #[tokio::test]
    async fn test_current_time_format() {
        let out = run(&current_time_tool(), json!({})).await.unwrap();
        assert_eq!(out.len(), 19);
        assert!(chrono::NaiveDateTime::parse_from_str(&out, TIME_FORMAT).is_ok());
    }

    #[tokio::test]
    async fn test_write_list_read() {
        let root = tempfile::tempdir().unwrap();
        let tools = file_tools(root.path().join("files"));
        let (list, read, write) = (tool(&tools, "list_files"), tool(&tools, "read_file"), tool(&tools, "write_file"));

        assert_eq!(run(&list, json!({})).await.unwrap(), "No files available");

        let out = run(&write, json!({"filename": "notes.txt", "content": "buy milk"})).await.unwrap();
        assert_eq!(out, "Successfully wrote to notes.txt");
        run(&write, json!({"filename": "agenda.md", "content": "# Monday"})).await.unwrap();

        assert_eq!(
            run(&list, json!({})).await.unwrap(),
            "Files available: agenda.md, notes.txt"
        );
        assert_eq!(run(&read, json!({"filename": "notes.txt"})).await.unwrap(), "buy milk");
    }

    #[tokio::test]
    async fn test_file_names_cannot_leave_directory() {
        let root = tempfile::tempdir().unwrap();
        let tools = file_tools(root.path().join("files"));
        let write = tool(&tools, "write_file");

        for name in ["../escape.txt", "sub/inner.txt", "/tmp/abs.txt", "", "."] {
            let err = run(&write, json!({"filename": name, "content": "x"})).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments { .. }), "{}", name);
        }
        assert!(!root.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn test_read_missing_file_fails() {
        let root = tempfile::tempdir().unwrap();
        let tools = file_tools(root.path());

        let err = run(&tool(&tools, "read_file"), json!({"filename": "nope.txt"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Failed { .. }));
        assert!(err.to_tool_content().contains("cannot read `nope.txt`"));

        let err = run(&tool(&tools, "write_file"), json!({"filename": "a.txt", "content": 7}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn test_all_names() {
        let names: Vec<String> = all("files").iter().map(|t| t.spec().name.clone()).collect();
        assert_eq!(names, vec!["get_current_time", "list_files", "read_file", "write_file"]);
    }
}
