//! Default processing unit: runs an external command per file.
//!
//! The command is spawned through `sh -c` with the job described in its
//! environment:
//!
//! | Variable        | Value                                   |
//! |-----------------|-----------------------------------------|
//! | `MGF_FILE`      | absolute path of the measurement file   |
//! | `MGF_BASENAME`  | file name                               |
//! | `MGF_TAGGED`    | `true` / `false` (category tagging flag)|
//! | `MGF_WORK_DIR`  | working directory                       |
//! | `MGF_DATABASE`  | metadata database path, if configured   |
//!
//! The unit owns the marker lifecycle for its file: `<basename>.process` while
//! the command runs, then `<basename>.done` on exit 0 or `<basename>.error`
//! (holding the command's stderr) otherwise.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use mgf_common::{MarkerKind, Processor, UnitJob, UnitOutcome};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

use crate::config::Config;

pub struct CommandProcessor {
    command: String,
    database: Option<PathBuf>,
}

impl CommandProcessor {
    pub fn new(command: impl Into<String>, database: Option<PathBuf>) -> Self {
        Self {
            command: command.into(),
            database,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let command = config
            .toml
            .processor
            .command
            .clone()
            .ok_or_else(|| anyhow!("No processor command configured. Set [processor] command or MGF_PROCESSOR_CMD"))?;
        Ok(Self::new(command, config.toml.database.path.clone()))
    }

    async fn write_marker(job: &UnitJob, kind: MarkerKind, content: &[u8]) -> Result<()> {
        let path = kind.path_in(&job.work_dir, &job.basename);
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write marker {}", path.display()))
    }
}

#[async_trait]
impl Processor for CommandProcessor {
    async fn process(&self, job: UnitJob) -> Result<UnitOutcome> {
        let started = Instant::now();
        Self::write_marker(&job, MarkerKind::Process, b"").await?;

        tracing::debug!(file = %job.file.display(), tagged = job.tagged, "Starting unit");

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .current_dir(&job.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("MGF_FILE", &job.file)
            .env("MGF_BASENAME", &job.basename)
            .env("MGF_TAGGED", job.tagged.to_string())
            .env("MGF_WORK_DIR", &job.work_dir);
        if let Some(ref db) = self.database {
            cmd.env("MGF_DATABASE", db);
        }

        let marker = match cmd.output().await {
            Ok(output) if output.status.success() => {
                Self::write_marker(&job, MarkerKind::Done, b"").await?;
                MarkerKind::Done
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::error!(
                    basename = %job.basename,
                    exit_code = output.status.code().unwrap_or(-1),
                    "Unit command failed: {}",
                    stderr.trim()
                );
                Self::write_marker(&job, MarkerKind::Error, &output.stderr).await?;
                MarkerKind::Error
            }
            Err(e) => {
                let message = format!("Failed to spawn unit command '{}': {}", self.command, e);
                tracing::error!(basename = %job.basename, "{}", message);
                Self::write_marker(&job, MarkerKind::Error, message.as_bytes()).await?;
                MarkerKind::Error
            }
        };

        let process_marker = MarkerKind::Process.path_in(&job.work_dir, &job.basename);
        tokio::fs::remove_file(&process_marker)
            .await
            .with_context(|| format!("Failed to remove marker {}", process_marker.display()))?;

        Ok(UnitOutcome {
            basename: job.basename,
            marker,
            duration: started.elapsed(),
        })
    }
}
