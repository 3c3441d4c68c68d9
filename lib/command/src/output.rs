use std::{io, os::unix::process::ExitStatusExt, process::ExitStatus};

#[derive(Debug, Clone)]
pub struct CommandOutput {
  pub status: ExitStatus,
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  pub fn from(output: io::Result<std::process::Output>) -> Self {
    match output {
      Ok(output) => Self {
        status: output.status,
        stdout: String::from_utf8(output.stdout)
          .unwrap_or("failed to decode stdout as utf8".to_string()),
        stderr: String::from_utf8(output.stderr)
          .unwrap_or("failed to decode stderr as utf8".to_string()),
      },
      Err(e) => CommandOutput::from_err(e),
    }
  }

  pub fn from_err(e: io::Error) -> Self {
    Self {
      status: ExitStatus::from_raw(1),
      stdout: String::new(),
      stderr: format!("{e:#?}"),
    }
  }

  pub fn success(&self) -> bool {
    self.status.success()
  }

  /// Truncates to at most `max_chars` characters, for embedding a
  /// sample of the output in an error message.
  pub fn truncated(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
      s.to_string()
    } else {
      let mut truncated: String =
        s.chars().take(max_chars).collect();
      truncated.push_str("...(truncated)");
      truncated
    }
  }
}
