use std::{path::Path, process::Stdio};

mod output;

pub use output::*;
use tokio::process::Command;

/// Runs a command directly (not through a shell); `command` is split
/// with shell-word-splitting rules, so arguments can be quoted but `&&`
/// and friends are not interpreted.
pub async fn run_standard_command(
  command: &str,
  path: impl Into<Option<&Path>>,
) -> CommandOutput {
  let lexed = match shlex::split(command) {
    Some(lexed) if !lexed.is_empty() => lexed,
    _ => {
      return CommandOutput::from_err(std::io::Error::other(
        "command lexed into empty args",
      ));
    }
  };

  let mut cmd = Command::new(&lexed[0]);
  cmd
    .args(&lexed[1..])
    .kill_on_drop(true)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

  if let Some(path) = path.into() {
    cmd.current_dir(path);
  }

  CommandOutput::from(cmd.output().await)
}
