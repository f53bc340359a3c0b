//! CLI commands for Script Bench
//!
//! Each command drives a [`Workbench`] the way the graphical shell would.

use std::io::Write;
use std::path::PathBuf;
use anyhow::{Context, Result};
use tracing::{debug, info};

use script_bench_core::{AppConfig, Event, RunStatus};
use script_bench_editor::{HighlightResult, KeywordSet};

use crate::render::render_ansi;
use crate::workbench::Workbench;

/// Run a script file and stream its output
pub struct RunCommand {
    pub script: PathBuf,
    pub interpreter: Option<String>,
    /// Print every workbench event as a JSON line instead of raw output
    pub json: bool,
}

impl RunCommand {
    /// Execute the run command, returning how the script ended
    pub async fn execute(&self, mut config: AppConfig) -> Result<RunStatus> {
        if let Some(interpreter) = &self.interpreter {
            config.runner.interpreter = interpreter.clone();
        }

        let text = tokio::fs::read_to_string(&self.script)
            .await
            .with_context(|| format!("Failed to read script {:?}", self.script))?;

        let mut bench = Workbench::new(config);
        let events = bench.subscribe();
        bench.load_text(&text);

        info!("Running {:?} with {}", self.script, bench.config().runner.interpreter);
        let started = bench.run().await;
        self.print_events(events.drain())?;
        started?;

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut interrupted = false;

        loop {
            tokio::select! {
                _ = bench.tick() => {}
                _ = &mut ctrl_c, if !interrupted => {
                    info!("Interrupted, cancelling run");
                    interrupted = true;
                    if let Err(e) = bench.cancel() {
                        debug!("Interrupt arrived after the run ended: {}", e);
                    }
                }
            }

            let batch = events.drain();
            let finished = batch.iter().find_map(|event| match event {
                Event::RunCompleted { status, .. } => Some(*status),
                _ => None,
            });
            self.print_events(batch)?;

            if let Some(status) = finished {
                if !self.json {
                    eprintln!("\n{}", status.summary());
                }
                return Ok(status);
            }
        }
    }

    fn print_events(&self, events: Vec<Event>) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        for event in events {
            if self.json {
                writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
            } else if let Event::RunOutput { text, .. } = event {
                stdout.write_all(text.as_bytes())?;
            }
        }
        stdout.flush()?;
        Ok(())
    }
}

/// Print a file with its keywords colored
pub struct HighlightCommand {
    pub file: PathBuf,
    /// List the keyword spans instead of the colored text
    pub spans: bool,
}

impl HighlightCommand {
    pub async fn execute(&self) -> Result<()> {
        let text = tokio::fs::read_to_string(&self.file)
            .await
            .with_context(|| format!("Failed to read {:?}", self.file))?;

        let result = HighlightResult::compute(&text, 0, &KeywordSet::default());
        let mut stdout = std::io::stdout().lock();

        if self.spans {
            for span in &result.spans {
                writeln!(
                    stdout,
                    "{}..{}\t{}\t{}",
                    span.start,
                    span.end(),
                    span.style.name(),
                    &text[span.range()]
                )?;
            }
        } else {
            write!(stdout, "{}", render_ansi(&text, Some(&result)))?;
        }

        stdout.flush()?;
        Ok(())
    }
}

/// Print the effective configuration
pub struct ConfigCommand;

impl ConfigCommand {
    pub fn execute(&self, config: &AppConfig) -> Result<()> {
        if let Some(path) = AppConfig::config_file() {
            println!("# {}", path.display());
        }
        print!("{}", config.to_toml()?);
        Ok(())
    }
}

/// Process exit code mirroring the script's own status
pub fn exit_code(status: &RunStatus) -> u8 {
    match status {
        RunStatus::Exited { code } => (*code & 0xff) as u8,
        RunStatus::Terminated { signal: Some(sig) } => (128 + (*sig & 0x7f)) as u8,
        RunStatus::Terminated { signal: None } => 1,
        RunStatus::Cancelled => 130,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(&RunStatus::Exited { code: 0 }), 0);
        assert_eq!(exit_code(&RunStatus::Exited { code: 3 }), 3);
        assert_eq!(exit_code(&RunStatus::Terminated { signal: Some(9) }), 137);
        assert_eq!(exit_code(&RunStatus::Cancelled), 130);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("job.sh");
        std::fs::write(&script, "exit 4\n").unwrap();

        let mut config = AppConfig::default();
        config.runner.script_dir = Some(dir.path().join("work"));

        let command = RunCommand {
            script,
            interpreter: Some("sh".into()),
            json: true,
        };
        let status = command.execute(config).await.unwrap();
        assert_eq!(status, RunStatus::Exited { code: 4 });
    }
}
