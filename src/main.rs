use clap::{Parser, Subcommand};
use docsite::model::{Model, read_pages};
use docsite::pipeline::{self, BuildContext};
use docsite::{config, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Shared flags for commands that render pages.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Ignore the render cache and re-render every markdown page
    #[arg(long)]
    no_cache: bool,
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
#[command(name = "docsite")]
#[command(about = "Documentation site builder")]
#[command(long_about = "\
Documentation site builder

The site is declared by a page manifest: a JSON list of pages, each with a
url and the document it is built from.

  [
    {\"url\": \"/\", \"title\": \"Home\", \"sourceUrl\": \"docs/README.md\"},
    {\"url\": \"/guide\", \"title\": \"Guide\", \"sourceUrl\": \"docs/guide.md\",
     \"tags\": [\"intro\"]}
  ]

Each build merges the manifest into the model saved by the previous build,
reports which pages were added, modified or removed, renders markdown to
HTML (links to source documents become links to site pages), adds header,
breadcrumb and search metadata, then publishes the cache to the output
directory with a sitemap.

Task logs go to stderr; set RUST_LOG=debug for more detail.
Run 'docsite gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Project root (config.toml, sources, cache and output live here)
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Page manifest, relative to the root
    #[arg(long, default_value = "pages.json", global = true)]
    manifest: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge the manifest into the saved model and report changes
    Merge,
    /// Run the full pipeline: merge → render → decorate → publish
    Build(CacheArgs),
    /// Validate the manifest and config without building
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Merge => {
            let site_config = config::load_config(&cli.root)?;
            let ctx = BuildContext::new(&cli.root, &cli.manifest, site_config);
            println!("==> Merging {}", ctx.manifest.display());
            let model = pipeline::merge(&ctx)?;
            output::print_changes(model.changes());
            println!("==> Saved {}", ctx.model_path().display());
        }
        Command::Build(cache_args) => {
            let site_config = config::load_config(&cli.root)?;
            let mut ctx = BuildContext::new(&cli.root, &cli.manifest, site_config);
            ctx.use_render_cache = !cache_args.no_cache;

            println!("==> Building {}", ctx.manifest.display());
            let report = pipeline::build(&ctx)?;
            output::print_changes(&report.changes);
            output::print_build_summary(&report);
            println!("==> Build complete: {}", ctx.output_dir.display());
        }
        Command::Check => {
            let site_config = config::load_config(&cli.root)?;
            let ctx = BuildContext::new(&cli.root, &cli.manifest, site_config);
            println!("==> Checking {}", ctx.manifest.display());
            let mut model = Model::new();
            model.set_pages(read_pages(&ctx.manifest)?)?;
            output::print_pages(&model);
            println!("==> Manifest and config are valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
