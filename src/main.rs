use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use downpour::{HtmlRenderer, Markdown, TerminalRenderer};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

mod build;
mod config;
mod conform;

#[derive(Parser)]
#[command(name = "downpour", version, about = "Markdown to HTML compiler")]
struct Cli {
    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ./downpour.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum RenderFormat {
    Html,
    Terminal,
    Tree,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one Markdown document
    Render {
        /// Path to the Markdown file, or - for stdin
        file: String,

        /// Enable a parser extension (repeatable), e.g. tables, fenced-code
        #[arg(long = "ext", value_name = "NAME")]
        extensions: Vec<String>,

        /// Enable a render flag (repeatable), e.g. hard-wrap, smartypants
        #[arg(long = "flag", value_name = "NAME")]
        flags: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "html")]
        format: RenderFormat,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Render every Markdown file in a directory to HTML
    Build {
        /// Source directory
        dir: PathBuf,

        /// Output directory
        #[arg(long)]
        out: PathBuf,

        /// Rewrite outputs even when unchanged
        #[arg(long)]
        force: bool,

        /// Rebuild on file changes
        #[arg(long)]
        watch: bool,
    },

    /// Check *.text fixtures against their *.html counterparts
    Conform {
        /// Fixture directory
        dir: PathBuf,
    },

    /// Apply SmartyPants to an HTML file
    Smartypants {
        /// Path to the HTML file, or - for stdin
        file: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let config = config::load_config(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Commands::Render {
            file,
            extensions,
            flags,
            format,
            output,
        } => {
            let options = config.resolve(&extensions, &flags)?;
            handle_render(&file, format, options, output.as_deref())?;
        }
        Commands::Build {
            dir,
            out,
            force,
            watch,
        } => {
            let opts = build::BuildOpts {
                source: &dir,
                out: &out,
                force,
                quiet: cli.quiet,
                options: config.resolve(&[], &[])?,
            };
            let report = build::handle_build(&opts)?;
            if !cli.quiet {
                report.print_summary();
            }
            if watch {
                build::watch_and_rebuild(&opts)?;
            }
        }
        Commands::Conform { dir } => {
            let report = conform::run_conform(&dir, config.resolve(&[], &[])?, cli.quiet)?;
            report.print_summary();
            if !report.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Smartypants { file } => {
            let html = read_input(&file)?;
            write_output(&downpour::smartypants::transform(&html), None)?;
        }
    }

    Ok(())
}

fn handle_render(
    file: &str,
    format: RenderFormat,
    options: config::Options,
    output: Option<&Path>,
) -> Result<()> {
    let bytes = read_input_bytes(file)?;

    let rendered = match format {
        RenderFormat::Html => {
            let mut md = Markdown::new(HtmlRenderer::new(options.render), options.extensions)?
                .with_max_nesting(options.max_nesting);
            md.render_bytes(&bytes)
                .map_err(|e| anyhow::anyhow!("Failed to render '{}': {}", file, e))?
        }
        RenderFormat::Terminal => {
            let mut md =
                Markdown::new(TerminalRenderer::new(options.render), options.extensions)?
                    .with_max_nesting(options.max_nesting);
            md.render_bytes(&bytes)
                .map_err(|e| anyhow::anyhow!("Failed to render '{}': {}", file, e))?
        }
        RenderFormat::Tree => {
            let text = std::str::from_utf8(&bytes)
                .map_err(|e| anyhow::anyhow!("Failed to read '{}': {}", file, e))?;
            let doc = downpour::parse_with_nesting(text, options.extensions, options.max_nesting);
            let mut json = doc.to_json()?;
            json.push('\n');
            json
        }
    };

    write_output(&rendered, output)
}

fn read_input_bytes(file: &str) -> Result<Vec<u8>> {
    if file == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read(file).map_err(|e| anyhow::anyhow!("Failed to read '{}': {}", file, e))
    }
}

fn read_input(file: &str) -> Result<String> {
    let bytes = read_input_bytes(file)?;
    String::from_utf8(bytes).map_err(|e| anyhow::anyhow!("Failed to read '{}': {}", file, e))
}

fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .context("Failed to write stdout")?;
            stdout.flush().context("Failed to write stdout")
        }
    }
}
