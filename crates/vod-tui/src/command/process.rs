//! Process launch capability.

use std::io;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use futures_util::future::{BoxFuture, FutureExt};
use tokio::io::AsyncRead;
use tokio::process::Command;

pub type OutputStream = Pin<Box<dyn AsyncRead + Send>>;

/// A started process: its stdout (if captured) and a future for its exit.
///
/// Dropping `exit` without awaiting it leaves the process running.
pub struct Launched {
    pub stdout: Option<OutputStream>,
    pub exit: BoxFuture<'static, io::Result<ExitStatus>>,
}

pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, argv: &[String], capture_stdout: bool) -> io::Result<Launched>;
}

/// Launches real processes. stdin/stderr are detached so children never
/// write over the terminal UI; stdout is piped only when it will be read.
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, argv: &[String], capture_stdout: bool) -> io::Result<Launched> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(if capture_stdout {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .map(|out| Box::pin(out) as OutputStream);
        Ok(Launched {
            stdout,
            exit: async move { child.wait().await }.boxed(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let launched = SystemLauncher
            .launch(&argv(&["sh", "-c", "echo hello; exit 3"]), true)
            .unwrap();
        let mut lines = BufReader::new(launched.stdout.unwrap()).lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("hello"));
        let status = launched.exit.await.unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    async fn missing_binary_is_a_launch_error() {
        assert!(SystemLauncher
            .launch(&argv(&["definitely-not-a-real-binary-4821"]), false)
            .is_err());
        assert!(SystemLauncher.launch(&[], false).is_err());
    }
}
