use std::ffi::OsStr;
use std::process::{Output, Stdio};

use tokio::process::Command;

use scenesync_common::{SceneSyncError, SceneSyncResult};

/// Run an external tool to completion and return its output.
///
/// A missing binary or a non-zero exit status becomes a media error that
/// carries the tail of stderr.
pub(crate) async fn run_tool<I, S>(tool: &str, args: I) -> SceneSyncResult<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SceneSyncError::media(format!("{tool} not found on PATH"))
            } else {
                SceneSyncError::media(format!("failed to start {tool}: {e}"))
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SceneSyncError::media(format!(
            "{tool} failed (status {}): {}",
            output.status,
            stderr_tail(&stderr)
        )));
    }

    Ok(output)
}

/// Last few lines of a tool's stderr.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    lines[lines.len().saturating_sub(5)..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let text = "a\nb\nc\nd\ne\nf\ng\n";
        assert_eq!(stderr_tail(text), "c | d | e | f | g");
        assert_eq!(stderr_tail(""), "");
    }

    #[tokio::test]
    async fn test_missing_tool_is_media_error() {
        let err = run_tool("scenesync-definitely-missing-tool", ["-version"])
            .await
            .unwrap_err();
        assert!(err.is_external());
        assert!(err.to_string().contains("not found"));
    }
}
