//! Diagram rendering
//!
//! Rendering happens after a version is committed; its failure never rolls
//! the commit back.

use async_trait::async_trait;
use dpe_artifact::TextDocument;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, warn};

/// Default bound for one external render
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Rendering failures
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Scratch files could not be written or read
    #[error("render i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Renderer did not finish in time
    #[error("renderer timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Renderer exited unsuccessfully
    #[error("renderer exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    /// Renderer succeeded but produced no image
    #[error("renderer produced no output at {}", .0.display())]
    NoOutput(PathBuf),
}

/// Turns a description into image bytes
#[async_trait]
pub trait Renderer: Send + Sync + std::fmt::Debug {
    /// Render `description`
    ///
    /// # Errors
    /// Returns error if the renderer fails or produces nothing
    async fn render(&self, description: &TextDocument) -> Result<Vec<u8>, RenderError>;
}

/// Renders by running an external program on a scratch file
///
/// The program is invoked as `program [args...] <dir>/diagram.puml` and must
/// write `<dir>/diagram.<extension>`.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: OsString,
    args: Vec<OsString>,
    extension: String,
    timeout: Duration,
}

impl CommandRenderer {
    /// Renderer running `program` and reading back a PNG
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            extension: "png".to_string(),
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    /// PlantUML jar run headless through `java`
    #[must_use]
    pub fn plantuml(jar: impl AsRef<Path>) -> Self {
        Self::new("java").with_args([
            OsString::from("-Djava.awt.headless=true"),
            OsString::from("-jar"),
            jar.as_ref().as_os_str().to_os_string(),
            OsString::from("-tpng"),
            OsString::from("-nbthread"),
            OsString::from("1"),
        ])
    }

    /// With arguments placed before the input file
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// With the extension of the produced file
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// With a time bound per render
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Renderer for CommandRenderer {
    async fn render(&self, description: &TextDocument) -> Result<Vec<u8>, RenderError> {
        let scratch = tempfile::Builder::new().prefix("dpe-render-").tempdir()?;
        let input = scratch.path().join("diagram.puml");
        let output = input.with_extension(&self.extension);
        tokio::fs::write(&input, description.to_text()).await?;

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .arg(&input)
            .current_dir(scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = ?self.program, "rendering description");
        let result = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                warn!(secs = self.timeout.as_secs(), "renderer timed out");
                RenderError::Timeout {
                    secs: self.timeout.as_secs(),
                }
            })??;

        if !result.status.success() {
            return Err(RenderError::Failed {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        match tokio::fs::read(&output).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RenderError::NoOutput(output))
            }
            Err(e) => Err(e.into()),
        }
    }
}
