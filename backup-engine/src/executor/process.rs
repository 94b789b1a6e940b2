//! Subprocess plumbing for the external dump/restore tools.

use crate::utils::BackupError;
use std::process::ExitStatus;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

const VERSION_MISMATCH: &str = "version mismatch";
const MAX_DIAGNOSTIC_CHARS: usize = 4000;

/// Drain a child's stderr on its own task so a chatty tool cannot block on a
/// full pipe while we are busy with its stdout/stdin.
pub fn collect_stderr<R>(stderr: Option<R>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut stderr) = stderr else {
            return String::new();
        };
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf).await;
        String::from_utf8_lossy(&buf).trim().to_string()
    })
}

pub fn spawn_failed(program: &str, err: std::io::Error) -> BackupError {
    let message = if err.kind() == std::io::ErrorKind::NotFound {
        format!("executable not found on PATH ({})", err)
    } else {
        format!("failed to start: {}", err)
    };
    BackupError::Process {
        program: program.to_string(),
        message,
    }
}

/// ProcessError for a non-zero exit, with the tool's own diagnostics.
pub fn exit_failure(program: &str, status: ExitStatus, stderr: &str) -> BackupError {
    let code = status
        .code()
        .map(|c| format!("exit code {}", c))
        .unwrap_or_else(|| "terminated by signal".to_string());

    let detail = truncate(stderr);
    let message = if stderr.contains(VERSION_MISMATCH) {
        format!(
            "client tools do not match the database server version; install {} from the same major release as the server ({}): {}",
            program, code, detail
        )
    } else if detail.is_empty() {
        code
    } else {
        format!("{}: {}", code, detail)
    };

    BackupError::Process {
        program: program.to_string(),
        message,
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_DIAGNOSTIC_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_DIAGNOSTIC_CHARS).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn status(code: i32) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code << 8)
    }

    #[cfg(unix)]
    #[test]
    fn test_version_mismatch_is_actionable() {
        let err = exit_failure(
            "pg_dump",
            status(1),
            "pg_dump: error: aborting because of server version mismatch",
        );
        let text = err.to_string();
        assert!(text.contains("same major release"), "{}", text);
        assert!(text.contains("server version mismatch"));
        assert_eq!(err.kind(), "ProcessError");
    }

    #[cfg(unix)]
    #[test]
    fn test_plain_failure_carries_stderr() {
        let err = exit_failure("psql", status(3), "ERROR:  relation \"x\" does not exist");
        assert_eq!(
            err.to_string(),
            "psql failed: exit code 3: ERROR:  relation \"x\" does not exist"
        );
    }

    #[test]
    fn test_missing_executable() {
        let err = spawn_failed(
            "pg_dump",
            std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        );
        assert!(err.to_string().contains("not found on PATH"));
    }

    #[tokio::test]
    async fn test_collect_stderr() {
        let text = collect_stderr(Some(&b"  warning: something\n"[..])).await.unwrap();
        assert_eq!(text, "warning: something");
        let none = collect_stderr::<&'static [u8]>(None).await.unwrap();
        assert!(none.is_empty());
    }
}
