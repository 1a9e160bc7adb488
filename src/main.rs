use chronosnap::capture::{self, ImagePayload};
use chronosnap::config::{self, Config};
use chronosnap::darkroom::{self, Adjustments};
use chronosnap::era::{self, EraCategory};
use chronosnap::generation::GeminiClient;
use chronosnap::session::{Phase, Session};
use chronosnap::studio::Studio;
use chronosnap::{export, output, preview};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing_subscriber::EnvFilter;

/// Darkroom flags shared by commands that present a plate.
#[derive(clap::Args, Clone)]
struct DarkroomArgs {
    /// Exposure in percent (50-150)
    #[arg(long)]
    brightness: Option<u32>,

    /// Contrast in percent (50-150)
    #[arg(long)]
    contrast: Option<u32>,

    /// Sepia tone in percent (0-100)
    #[arg(long)]
    sepia: Option<u32>,

    /// Film grain overlay
    #[arg(long)]
    grain: bool,
}

impl DarkroomArgs {
    /// Config defaults with any flags applied on top.
    fn adjustments(&self, config: &config::DarkroomConfig) -> Adjustments {
        let mut adj = Adjustments::from_config(config);
        if let Some(v) = self.brightness {
            adj.set_brightness(v);
        }
        if let Some(v) = self.contrast {
            adj.set_contrast(v);
        }
        if let Some(v) = self.sepia {
            adj.set_sepia(v);
        }
        if self.grain {
            adj.set_grain(true);
        }
        adj
    }
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "chronosnap")]
#[command(about = "Time-travel portrait studio")]
#[command(long_about = "\
Time-travel portrait studio

Take a portrait, pick an era, and an image model re-imagines the sitter in
that setting while keeping their likeness.

Workflow:

  camera → selecting → processing → complete
                ▲            │
                └── error ◀──┘

  chronosnap eras                          # browse the catalog
  chronosnap develop --photo me.jpg --era film-noir
  chronosnap develop --photo me.jpg --era custom --prompt \"as a lighthouse keeper\"
  chronosnap studio                        # interactive session
  chronosnap plates out/                   # list exported plates

The API key is read from the environment variable named in chronosnap.toml
(GEMINI_API_KEY by default). Set RUST_LOG=chronosnap=debug for diagnostics.

Run 'chronosnap gen-config' to generate a documented chronosnap.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Directory holding chronosnap.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the era catalog
    Eras {
        /// Only this category (historical, cinematic, artistic, custom)
        #[arg(long)]
        category: Option<EraCategory>,
    },
    /// Develop one portrait in one era and export the plate
    Develop {
        /// Portrait to develop (JPEG, PNG or WebP)
        #[arg(long)]
        photo: PathBuf,

        /// Era id, see 'chronosnap eras'
        #[arg(long)]
        era: String,

        /// Prompt override; required for the custom era
        #[arg(long)]
        prompt: Option<String>,

        #[command(flatten)]
        darkroom: DarkroomArgs,

        /// Apply darkroom adjustments to the exported pixels (PNG)
        #[arg(long)]
        bake: bool,

        /// Export directory (overrides [export].dir)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Also write an HTML preview page
        #[arg(long)]
        preview: Option<PathBuf>,

        /// Print a JSON summary instead of text
        #[arg(long)]
        json: bool,
    },
    /// Interactive session reading commands from stdin
    Studio {
        #[command(flatten)]
        darkroom: DarkroomArgs,

        /// Export directory (overrides [export].dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List exported plates
    Plates {
        /// Directory to list (defaults to [export].dir)
        dir: Option<PathBuf>,
    },
    /// Print a stock chronosnap.toml with all options documented
    GenConfig,
}

/// `RUST_LOG` directives when set and valid, `warn` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

fn init_tracing() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Eras { category } => {
            let categories = match category {
                Some(c) => vec![c],
                None => EraCategory::ALL.to_vec(),
            };
            output::print_catalog(&categories);
        }
        Command::Develop {
            photo,
            era: era_id,
            prompt,
            darkroom,
            bake,
            out,
            preview,
            json,
        } => {
            let config = config::load_config(&cli.config_dir)?;
            let era = era::find(&era_id).ok_or_else(|| {
                format!("unknown era '{era_id}', run 'chronosnap eras' for the list")
            })?;
            let portrait = capture::import_file(&photo)?;
            let client = GeminiClient::from_env(&config.generation)?;
            let adjustments = darkroom.adjustments(&config.darkroom);

            let mut session = Session::new();
            session.capture(portrait)?;
            tracing::info!(era = era.id, model = client.model(), "developing portrait");
            if !json {
                println!("==> Developing {} as {}", photo.display(), era.title);
            }
            match session.select_era(&client, era, prompt.as_deref()).await? {
                Phase::Complete => {}
                Phase::Error => return Err(session.error().unwrap_or_default().into()),
                _ => return Err("the custom era needs a non-blank --prompt".into()),
            }

            let dir = out.unwrap_or_else(|| PathBuf::from(&config.export.dir));
            let exported = export_result(&session, &adjustments, bake, &dir, &config)?;
            if let Some(page) = &preview {
                write_preview(&session, &adjustments, page)?;
            }

            if json {
                let summary = output::SessionSummary::new(&session, &adjustments, Some(exported.as_path()));
                output::print_summary_json(&summary)?;
            } else {
                output::print_status(&session, &adjustments);
                println!("==> Exported {}", exported.display());
                if let Some(page) = &preview {
                    println!("==> Preview {}", page.display());
                }
            }
        }
        Command::Studio { darkroom, out } => {
            let config = config::load_config(&cli.config_dir)?;
            let client = GeminiClient::from_env(&config.generation)?;
            let dir = out.unwrap_or_else(|| PathBuf::from(&config.export.dir));
            let mut studio = Studio::new(
                client,
                darkroom.adjustments(&config.darkroom),
                dir,
                config.export.prefix.clone(),
            );
            println!("ChronoSnap studio. Type 'help' for commands.");
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            studio.run(stdin, &mut std::io::stdout()).await?;
        }
        Command::Plates { dir } => {
            let config = config::load_config(&cli.config_dir)?;
            let dir = dir.unwrap_or_else(|| PathBuf::from(&config.export.dir));
            let plates = export::list_plates(&dir, &config.export.prefix)?;
            output::print_plates(&plates, &dir);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Export the current plate, baked if requested.
fn export_result(
    session: &Session,
    adjustments: &Adjustments,
    bake: bool,
    dir: &Path,
    config: &Config,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let result = session.result().ok_or("no developed plate")?;
    let image: ImagePayload = if bake {
        darkroom::bake(&result.image, adjustments)?
    } else {
        result.image.clone()
    };
    let path = export::export_plate(
        &image,
        result.era.id,
        dir,
        &config.export.prefix,
        SystemTime::now(),
    )?;
    Ok(path)
}

/// Write the HTML result page for the current plate.
fn write_preview(
    session: &Session,
    adjustments: &Adjustments,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(source), Some(result)) = (session.source(), session.result()) else {
        return Err("no developed plate".into());
    };
    let html = preview::render_result_page(source, result, adjustments, session.history());
    std::fs::write(path, html.into_string())?;
    Ok(())
}
