//! SafeCommandExecutor: whitelisted build command execution
//!
//! # Security Features
//!
//! - **Whitelist-based validation**: Only pre-approved build tools can execute
//! - **Injection prevention**: Arguments are passed as a vector, never through a shell
//! - **Working directory validation**: Validates existence before execution
//! - **Timeout control**: Hanging builds are killed
//!
//! # Example
//!
//! ```rust,no_run
//! use web_publisher::SafeCommandExecutor;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), web_publisher::CommandError> {
//! let mut executor = SafeCommandExecutor::new(std::env::temp_dir())?;
//! executor.set_timeout(Duration::from_secs(30));
//!
//! let output = executor.execute("npm", &["run", "build"]).await?;
//! println!("{}", String::from_utf8_lossy(&output.stdout));
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Build tools that may be executed
const ALLOWED_COMMANDS: &[&str] = &[
    "npm", "npx", "yarn", "pnpm", "cargo", "trunk", "wasm-pack", "make", "godot", "unity",
    "Unity", "python", "python3",
];

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command is not in the allowed whitelist
    #[error("Command '{0}' is not in the allowed whitelist")]
    CommandNotAllowed(String),

    /// Working directory does not exist or is not accessible
    #[error("Working directory does not exist: {0}")]
    InvalidWorkingDirectory(PathBuf),

    /// Command execution failed (e.g., binary not found, permission denied)
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    /// Command exceeded the timeout duration
    #[error("Command timeout after {0:?}")]
    Timeout(Duration),
}

/// Safe command executor with security controls
#[derive(Debug)]
pub struct SafeCommandExecutor {
    /// Working directory where commands will be executed
    working_dir: PathBuf,
    /// Optional timeout for command execution
    timeout: Option<Duration>,
    /// Commands allowed on top of the built-in whitelist
    extra_allowed: Vec<String>,
    /// Extra environment for the child process
    envs: Vec<(String, String)>,
}

impl SafeCommandExecutor {
    /// Create a new SafeCommandExecutor with working directory validation.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidWorkingDirectory` if the directory does not exist.
    pub fn new<P: AsRef<Path>>(working_dir: P) -> Result<Self, CommandError> {
        let working_dir = working_dir.as_ref().to_path_buf();

        if !working_dir.exists() {
            return Err(CommandError::InvalidWorkingDirectory(working_dir));
        }

        Ok(Self {
            working_dir,
            timeout: None,
            extra_allowed: Vec::new(),
            envs: Vec::new(),
        })
    }

    /// Set command execution timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    /// Allow one more command beyond the built-in whitelist
    pub fn allow(&mut self, command: impl Into<String>) {
        self.extra_allowed.push(command.into());
    }

    /// Set an environment variable for executed commands
    pub fn env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.envs.push((key.into(), value.into()));
    }

    pub fn is_allowed(&self, command: &str) -> bool {
        ALLOWED_COMMANDS.contains(&command) || self.extra_allowed.iter().any(|c| c == command)
    }

    /// Execute a command with whitelist validation.
    ///
    /// # Errors
    ///
    /// - `CommandError::CommandNotAllowed` - Command not in whitelist
    /// - `CommandError::ExecutionFailed` - Binary not found or execution error
    /// - `CommandError::Timeout` - The command ran past the configured timeout
    pub async fn execute(&self, command: &str, args: &[&str]) -> Result<Output, CommandError> {
        if !self.is_allowed(command) {
            return Err(CommandError::CommandNotAllowed(command.to_string()));
        }

        // Windows-specific: npm, yarn, etc. are .cmd files, not .exe
        #[cfg(target_os = "windows")]
        let command_name = if matches!(command, "npm" | "npx" | "yarn" | "pnpm") {
            format!("{}.cmd", command)
        } else {
            command.to_string()
        };

        #[cfg(not(target_os = "windows"))]
        let command_name = command.to_string();

        let mut child = Command::new(&command_name);
        child
            .args(args)
            .current_dir(&self.working_dir)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true);

        let output = child.output();

        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, output)
                .await
                .map_err(|_| CommandError::Timeout(timeout))?,
            None => output.await,
        };

        result.map_err(|e| CommandError::ExecutionFailed(e.to_string()))
    }
}
