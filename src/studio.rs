//! Line-oriented interactive session.
//!
//! Reads one command per line and drives a [`Session`] with it. Every
//! command's output goes through the [`output`] formatters, so the studio
//! prints exactly what the one-shot commands print.
//!
//! ```text
//! capture portrait.jpg        import a portrait (path or data: URI)
//! retake                      discard the portrait
//! era <id> [prompt...]        develop in an era; custom needs a prompt
//! retry                       back to era selection after a failure
//! reset                       start over (history is kept)
//! history                     list this session's plates
//! show <n>                    display plate n from the history
//! adjust <setting> <value>    brightness|contrast|sepia <percent>, grain [on|off]
//! export [bake]               write the plate (bake = apply adjustments)
//! preview <file.html>         write the HTML result page
//! status                      where the session stands
//! quit                        leave
//! ```
//!
//! A failing command reports `error: ...` and the loop continues; only I/O
//! errors on the terminal itself end the session.

use crate::capture::{self, CaptureError, ImagePayload};
use crate::darkroom::{self, Adjustments, DarkroomError};
use crate::era;
use crate::export::{self, ExportError};
use crate::generation::GenerationClient;
use crate::output;
use crate::preview;
use crate::session::{Phase, Session, SessionError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("{0}")]
    Parse(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Darkroom(#[from] DarkroomError),
    #[error("no developed plate to {0}")]
    NoPlate(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One darkroom change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    Brightness(u32),
    Contrast(u32),
    Sepia(u32),
    /// `None` toggles.
    Grain(Option<bool>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Capture(String),
    Retake,
    Era { id: String, prompt: Option<String> },
    Retry,
    Reset,
    History,
    /// Zero-based history index.
    Show(usize),
    Adjust(Adjust),
    Export { bake: bool },
    Preview(PathBuf),
    Status,
    Help,
    Quit,
}

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

const HELP: &str = "\
commands: capture <path|data-uri>, retake, era <id> [prompt], retry, reset,
          history, show <n>, adjust <brightness|contrast|sepia> <percent>,
          adjust grain [on|off], export [bake], preview <file>, status, quit";

fn split_word(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (text, ""),
    }
}

fn parse_percent(value: &str) -> Result<u32, StudioError> {
    value
        .parse()
        .map_err(|_| StudioError::Parse(format!("expected a percentage, got '{value}'")))
}

fn parse_adjust(args: &str) -> Result<Adjust, StudioError> {
    let (setting, value) = split_word(args);
    let value = value.trim();
    match setting {
        "brightness" => Ok(Adjust::Brightness(parse_percent(value)?)),
        "contrast" => Ok(Adjust::Contrast(parse_percent(value)?)),
        "sepia" => Ok(Adjust::Sepia(parse_percent(value)?)),
        "grain" => match value {
            "" | "toggle" => Ok(Adjust::Grain(None)),
            "on" => Ok(Adjust::Grain(Some(true))),
            "off" => Ok(Adjust::Grain(Some(false))),
            other => Err(StudioError::Parse(format!("grain is on or off, got '{other}'"))),
        },
        other => Err(StudioError::Parse(format!("unknown setting '{other}'"))),
    }
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, StudioError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, args) = split_word(line);
    let command = match word {
        "capture" => {
            if args.is_empty() {
                return Err(StudioError::Parse("capture needs a file or data URI".into()));
            }
            Command::Capture(args.to_string())
        }
        "retake" => Command::Retake,
        "era" => {
            let (id, prompt) = split_word(args);
            if id.is_empty() {
                return Err(StudioError::Parse("era needs an id (see 'eras')".into()));
            }
            Command::Era {
                id: id.to_string(),
                prompt: (!prompt.is_empty()).then(|| prompt.to_string()),
            }
        }
        "retry" => Command::Retry,
        "reset" => Command::Reset,
        "history" => Command::History,
        "show" => {
            let n: usize = args
                .parse()
                .map_err(|_| StudioError::Parse(format!("show needs a plate number, got '{args}'")))?;
            if n == 0 {
                return Err(StudioError::Parse("plates are numbered from 1".into()));
            }
            Command::Show(n - 1)
        }
        "adjust" => Command::Adjust(parse_adjust(args)?),
        "export" => match args {
            "" => Command::Export { bake: false },
            "bake" => Command::Export { bake: true },
            other => return Err(StudioError::Parse(format!("unknown export option '{other}'"))),
        },
        "preview" => {
            if args.is_empty() {
                return Err(StudioError::Parse("preview needs an output file".into()));
            }
            Command::Preview(PathBuf::from(args))
        }
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(StudioError::Parse(format!("unknown command '{other}'"))),
    };
    Ok(Some(command))
}

fn write_lines<W: Write>(out: &mut W, lines: &[String]) -> std::io::Result<()> {
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

/// Load a portrait from a `data:` URI or a file path.
fn load_portrait(source: &str) -> Result<ImagePayload, CaptureError> {
    if source.starts_with("data:") {
        ImagePayload::from_data_uri(source)
    } else {
        capture::import_file(Path::new(source))
    }
}

/// An interactive session bound to a client and an export location.
pub struct Studio<C> {
    session: Session,
    adjustments: Adjustments,
    client: C,
    export_dir: PathBuf,
    prefix: String,
}

impl<C: GenerationClient> Studio<C> {
    pub fn new(client: C, adjustments: Adjustments, export_dir: PathBuf, prefix: String) -> Self {
        Self {
            session: Session::new(),
            adjustments,
            client,
            export_dir,
            prefix,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn adjustments(&self) -> &Adjustments {
        &self.adjustments
    }

    /// Run one command, writing its output to `out`.
    pub async fn execute<W: Write>(
        &mut self,
        command: Command,
        out: &mut W,
    ) -> Result<Flow, StudioError> {
        match command {
            Command::Capture(source) => {
                // Only touch the disk when the session can take a portrait
                let phase = self.session.phase();
                if phase != Phase::Camera {
                    return Err(SessionError::InvalidTransition {
                        event: "capture",
                        phase,
                    }
                    .into());
                }
                let image = load_portrait(&source)?;
                writeln!(out, "Portrait captured ({}, {} bytes)", image.mime_type(), image.len())?;
                self.session.capture(image)?;
            }
            Command::Retake => {
                self.session.retake()?;
                writeln!(out, "Portrait discarded")?;
            }
            Command::Era { id, prompt } => {
                let era = era::find(&id)
                    .ok_or_else(|| StudioError::Parse(format!("unknown era '{id}' (see 'eras')")))?;
                writeln!(out, "Developing {}...", era.title)?;
                out.flush()?;
                let phase = self
                    .session
                    .select_era(&self.client, era, prompt.as_deref())
                    .await?;
                match phase {
                    Phase::Complete => writeln!(out, "Development complete: {}", era.title)?,
                    Phase::Error => {
                        let message = self.session.error().unwrap_or_default();
                        writeln!(out, "{}", message)?;
                        writeln!(out, "Type 'retry' to choose again.")?;
                    }
                    _ => writeln!(out, "Describe the commission: era {} <prompt>", era.id)?,
                }
            }
            Command::Retry => {
                self.session.retry()?;
                writeln!(out, "Back to era selection")?;
            }
            Command::Reset => {
                self.session.reset();
                writeln!(out, "Ready for a new portrait")?;
            }
            Command::History => {
                let lines = output::format_history(self.session.history(), self.session.result());
                write_lines(out, &lines)?;
            }
            Command::Show(index) => {
                self.session.show_history(index)?;
                let lines = output::format_status(&self.session, &self.adjustments);
                write_lines(out, &lines)?;
            }
            Command::Adjust(adjust) => {
                match adjust {
                    Adjust::Brightness(v) => self.adjustments.set_brightness(v),
                    Adjust::Contrast(v) => self.adjustments.set_contrast(v),
                    Adjust::Sepia(v) => self.adjustments.set_sepia(v),
                    Adjust::Grain(Some(on)) => self.adjustments.set_grain(on),
                    Adjust::Grain(None) => self.adjustments.toggle_grain(),
                }
                writeln!(
                    out,
                    "Darkroom: {}, grain {}",
                    self.adjustments.css_filter(),
                    if self.adjustments.grain() { "on" } else { "off" }
                )?;
            }
            Command::Export { bake } => {
                let result = self.session.result().ok_or(StudioError::NoPlate("export"))?;
                let image = if bake {
                    darkroom::bake(&result.image, &self.adjustments)?
                } else {
                    result.image.clone()
                };
                let path = export::export_plate(
                    &image,
                    result.era.id,
                    &self.export_dir,
                    &self.prefix,
                    SystemTime::now(),
                )?;
                writeln!(out, "Exported {}", path.display())?;
            }
            Command::Preview(path) => {
                let (Some(source), Some(result)) = (self.session.source(), self.session.result())
                else {
                    return Err(StudioError::NoPlate("preview"));
                };
                let html = preview::render_result_page(
                    source,
                    result,
                    &self.adjustments,
                    self.session.history(),
                );
                std::fs::write(&path, html.into_string())?;
                writeln!(out, "Preview written to {}", path.display())?;
            }
            Command::Status => {
                let lines = output::format_status(&self.session, &self.adjustments);
                write_lines(out, &lines)?;
            }
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Read commands from `input` until `quit` or end of input.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<(), StudioError>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        loop {
            write!(out, "chronosnap [{}]> ", self.session.phase())?;
            out.flush()?;
            let Some(line) = lines.next_line().await? else {
                writeln!(out)?;
                break;
            };
            let outcome = match parse_command(&line) {
                Ok(Some(command)) => self.execute(command, out).await,
                Ok(None) => Ok(Flow::Continue),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(StudioError::Io(e)) => return Err(StudioError::Io(e)),
                Err(e) => {
                    tracing::debug!(error = %e, "studio command failed");
                    writeln!(out, "error: {}", e)?;
                }
            }
        }
        Ok(())
    }
}
