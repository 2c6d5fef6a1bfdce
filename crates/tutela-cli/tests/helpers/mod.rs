use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;
use uuid::Uuid;

/// Test harness running the CLI against a temporary database with a fixed
/// acting user injected through the environment.
pub struct CliTestHarness {
    _temp_dir: TempDir,
    db_path: PathBuf,
    attachments_dir: PathBuf,
    pub user: Uuid,
}

impl CliTestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let attachments_dir = temp_dir.path().join("attachments");

        Self {
            _temp_dir: temp_dir,
            db_path,
            attachments_dir,
            user: Uuid::new_v4(),
        }
    }

    pub fn command(&self) -> Command {
        let mut cmd = self.command_without_user();
        cmd.env("TUTELA_DEFAULT_USER", self.user.to_string());
        cmd
    }

    pub fn command_without_user(&self) -> Command {
        let mut cmd = Command::cargo_bin("tutela").expect("Failed to find tutela binary");
        cmd.env("TUTELA_DATABASE_PATH", &self.db_path);
        cmd.env("TUTELA_ATTACHMENTS_DIR", &self.attachments_dir);
        cmd
    }

    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Runs a command and returns its stdout with ANSI styling removed.
    pub fn run_and_read(&self, args: &[&str]) -> String {
        let output = self
            .command()
            .args(args)
            .output()
            .expect("Failed to run command");
        assert!(
            output.status.success(),
            "command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        strip_ansi(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Removes ANSI escape sequences so ids can be parsed from styled output.
pub fn strip_ansi(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_escape = false;
    for c in raw.chars() {
        if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if c == '\u{1b}' {
            in_escape = true;
        } else {
            out.push(c);
        }
    }
    out
}

/// Finds every full uuid printed in the given (already unstyled) text.
pub fn extract_uuids(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_ascii_hexdigit() && c != '-'))
        .filter(|t| t.len() == 36 && Uuid::parse_str(t).is_ok())
        .map(|t| t.to_string())
        .collect()
}
