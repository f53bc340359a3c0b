//! Line-oriented editor shell
//!
//! A terminal stand-in for the graphical editor: every plain line typed is
//! appended to the buffer as an edit, and `:` commands drive the workbench.

use std::io::Write;
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use script_bench_core::{AppConfig, Event};

use crate::render::render_ansi;
use crate::workbench::Workbench;

/// Shell commands recognised on a line of their own
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellInput {
    Run,
    Cancel,
    Clear,
    Show,
    Output,
    Reset,
    Quit,
    Help,
    Unknown(String),
    /// Anything else is script text
    Text(String),
}

impl ShellInput {
    pub fn parse(line: &str) -> Self {
        let Some(command) = line.trim().strip_prefix(':') else {
            return ShellInput::Text(line.to_string());
        };
        match command.trim() {
            "run" | "r" => ShellInput::Run,
            "cancel" | "c" => ShellInput::Cancel,
            "clear" => ShellInput::Clear,
            "show" | "s" => ShellInput::Show,
            "output" | "o" => ShellInput::Output,
            "reset" => ShellInput::Reset,
            "quit" | "q" => ShellInput::Quit,
            "help" | "h" => ShellInput::Help,
            other => ShellInput::Unknown(other.to_string()),
        }
    }
}

const HELP: &str = "\
Type script lines to append them to the buffer.
  :run     run the buffer        :cancel  stop the running script
  :show    print the buffer      :output  print the output log
  :clear   clear the output      :reset   empty the buffer
  :quit    leave";

/// Interactive shell session
pub struct ShellCommand {
    pub interpreter: Option<String>,
}

impl ShellCommand {
    pub async fn execute(&self, mut config: AppConfig) -> Result<()> {
        if let Some(interpreter) = &self.interpreter {
            config.runner.interpreter = interpreter.clone();
        }

        let mut bench = Workbench::new(config);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        eprintln!("{}", HELP);
        info!("Shell started with interpreter {}", bench.config().runner.interpreter);

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if !handle_line(&mut bench, ShellInput::parse(&line)).await? {
                        break;
                    }
                }
                event = bench.tick() => {
                    if let Some(event) = event {
                        show_event(&event)?;
                    }
                }
            }
        }

        bench.shutdown().await;
        Ok(())
    }
}

/// Apply one line of input. Returns false when the shell should exit.
async fn handle_line(bench: &mut Workbench, input: ShellInput) -> Result<bool> {
    match input {
        ShellInput::Text(line) => {
            let mut text = bench.buffer().text();
            text.push_str(&line);
            text.push('\n');
            bench.on_edit(&text);
        }
        ShellInput::Run => {
            // Failures are already in the output log
            if let Err(e) = bench.run().await {
                eprintln!("{}", e.user_message());
            }
        }
        ShellInput::Cancel => {
            if let Err(e) = bench.cancel() {
                eprintln!("{}", e.user_message());
            }
        }
        ShellInput::Clear => bench.clear_output(),
        ShellInput::Show => {
            let buffer = bench.buffer();
            print!("{}", render_ansi(&buffer.text(), buffer.highlights()));
            std::io::stdout().flush()?;
        }
        ShellInput::Output => {
            print!("{}", bench.output());
            std::io::stdout().flush()?;
        }
        ShellInput::Reset => {
            bench.on_edit("");
        }
        ShellInput::Quit => return Ok(false),
        ShellInput::Help => eprintln!("{}", HELP),
        ShellInput::Unknown(command) => eprintln!("Unknown command :{} (try :help)", command),
    }
    Ok(true)
}

fn show_event(event: &Event) -> Result<()> {
    match event {
        Event::RunOutput { text, .. } => {
            print!("{}", text);
            std::io::stdout().flush()?;
        }
        Event::RunCompleted { status, .. } => eprintln!("\n[{}]", status.summary()),
        Event::HighlightsApplied { revision, keywords } => {
            debug!("Revision {} highlighted, {} keywords", revision, keywords);
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(ShellInput::parse(":run"), ShellInput::Run);
        assert_eq!(ShellInput::parse("  :q "), ShellInput::Quit);
        assert_eq!(ShellInput::parse(":bogus"), ShellInput::Unknown("bogus".into()));
        assert_eq!(
            ShellInput::parse("let x = 1 // :run"),
            ShellInput::Text("let x = 1 // :run".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_lines_append_to_buffer() {
        let mut bench = Workbench::new(AppConfig::default());
        assert!(handle_line(&mut bench, ShellInput::parse("let a = 1")).await.unwrap());
        assert!(handle_line(&mut bench, ShellInput::parse("if a {}")).await.unwrap());
        bench.settle().await;

        assert_eq!(bench.buffer().text(), "let a = 1\nif a {}\n");
        assert_eq!(bench.buffer().highlights().unwrap().keyword_count(), 2);

        assert!(handle_line(&mut bench, ShellInput::Reset).await.unwrap());
        assert!(bench.buffer().is_empty());
        assert!(!handle_line(&mut bench, ShellInput::Quit).await.unwrap());
    }
}
