use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use css_sprite_core::descriptor::{DescriptorBuilder, ImageMeta, absolutize};
use css_sprite_core::engine::{Algorithm, SheetFormat};
use css_sprite_core::prelude::*;
use globset::{Glob, GlobSet, GlobSetBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "css-sprite",
    about = "Pack stylesheet background images into sprite sheets",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build sprite sheets and rewrite the stylesheets that reference them
    Generate(GenerateArgs),
    /// List sprite candidates found in the stylesheets (no packing, no output files)
    Scan(ScanArgs),
}

#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Stylesheet files or directories
    #[arg(required = true, help_heading = "Input/Output")]
    inputs: Vec<PathBuf>,
    /// Include patterns (glob). Defaults to every `*.css` file
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
    /// YAML config file (camelCase keys); CLI flags take precedence over it
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
struct SpriteArgs {
    /// Sprite sheet file name, e.g. img/sprite.png (required here or in --config)
    #[arg(short = 'n', long, help_heading = "Sprite")]
    sprite_sheet_name: Option<String>,
    /// Output stylesheet name (defaults to each input's file name)
    #[arg(long, help_heading = "Sprite")]
    style_sheet_name: Option<String>,
    /// Prefix for sheet URLs written into the stylesheets
    #[arg(long, help_heading = "Sprite")]
    sprite_sheet_path: Option<String>,
    /// Base directory for root-relative image URLs
    #[arg(long, help_heading = "Sprite")]
    base_url: Option<PathBuf>,
    /// Disable @Nx retina detection and grouping
    #[arg(long, default_value_t = false, help_heading = "Sprite")]
    no_retina: bool,
    /// Also sprite images that are not PNG
    #[arg(long, default_value_t = false, help_heading = "Sprite")]
    include_non_png: bool,
    /// Handlebars file replacing the generated declaration block
    #[arg(long, help_heading = "Sprite")]
    declaration_template: Option<PathBuf>,

    /// Skip images whose URL matches this glob (repeatable)
    #[arg(long, help_heading = "Stages")]
    skip: Vec<String>,
    /// Put images into separate sheets by this key of their `@meta {"sprite": {...}}`
    #[arg(long, help_heading = "Stages")]
    group_by_meta: Option<String>,

    /// Layout algorithm
    #[arg(long, value_parser = ["top-down", "left-right", "diagonal", "alt-diagonal", "binary-tree"], help_heading = "Engine")]
    algorithm: Option<String>,
    /// Pixels between packed images
    #[arg(long, help_heading = "Engine")]
    padding: Option<u32>,
    /// Sheet encoding
    #[arg(long, value_parser = ["png", "jpeg", "jpg"], help_heading = "Engine")]
    format: Option<String>,
    /// JPEG quality (1..=100)
    #[arg(long, help_heading = "Engine")]
    quality: Option<u8>,
    /// Per-image load timeout in milliseconds (0 disables it)
    #[arg(long, help_heading = "Engine")]
    timeout: Option<u64>,
}

#[derive(Args, Debug, Clone)]
struct GenerateArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    sprite: SpriteArgs,
    /// Output directory for sheets and stylesheets
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: process everything but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Args, Debug, Clone)]
struct ScanArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    sprite: SpriteArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Generate(args) => run_generate(args, cli.progress && !cli.quiet).await,
        Commands::Scan(args) => run_scan(args),
    }
}

async fn run_generate(cli: &GenerateArgs, show_progress: bool) -> anyhow::Result<()> {
    let cfg = load_config(&cli.input, &cli.sprite)?;

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }

    let pipeline = build_pipeline(cfg, &cli.sprite)?;
    let paths = gather_paths(&cli.input.inputs, &cli.input.include, &cli.input.exclude)?;
    if paths.is_empty() {
        warn!("no stylesheets matched the inputs");
        return Ok(());
    }
    let documents = read_documents(&paths).await?;
    info!(count = documents.len(), "loaded stylesheets");

    if !cli.dry_run {
        fs::create_dir_all(&cli.out_dir)
            .with_context(|| format!("create out_dir {}", cli.out_dir.display()))?;
    }

    let bar = progress_bar(paths.len(), show_progress)?;
    let SpriteChannels {
        documents: mut finished,
        css: mut stylesheets,
        img: mut sheets,
    } = Arc::new(pipeline).spawn(futures::stream::iter(documents));

    let out_dir = cli.out_dir.as_path();
    let dry_run = cli.dry_run;
    let (failed, sheets_written, stylesheets_written) = tokio::join!(
        async {
            let mut failed = 0usize;
            while let Some(result) = finished.recv().await {
                match result {
                    Ok(doc) => {
                        if let Some(b) = &bar {
                            b.set_message(doc.path.display().to_string());
                        }
                    }
                    Err(_) => failed += 1,
                }
                if let Some(b) = &bar {
                    b.inc(1);
                }
            }
            failed
        },
        async {
            let mut written = HashSet::new();
            while let Some(sheet) = sheets.recv().await {
                write_artifact(out_dir, &sheet, dry_run, &mut written).await?;
            }
            Ok::<usize, anyhow::Error>(written.len())
        },
        async {
            let mut written = HashSet::new();
            while let Some(css) = stylesheets.recv().await {
                write_artifact(out_dir, &css, dry_run, &mut written).await?;
            }
            Ok::<usize, anyhow::Error>(written.len())
        },
    );
    if let Some(b) = &bar {
        b.finish_and_clear();
    }

    let sheets_written = sheets_written?;
    let stylesheets_written = stylesheets_written?;
    info!(
        stylesheets = stylesheets_written,
        sheets = sheets_written,
        failed,
        dry_run,
        "done"
    );
    if failed > 0 {
        anyhow::bail!("{} of {} stylesheet(s) failed", failed, paths.len());
    }
    Ok(())
}

/// One scanned declaration, as printed by `scan`.
#[derive(Serialize)]
struct ScanRow {
    document: String,
    url: String,
    path: String,
    x: i64,
    y: i64,
    repeat: String,
    unsupported: String,
    retina_ratio: Option<u32>,
    meta: ImageMeta,
}

fn run_scan(cli: &ScanArgs) -> anyhow::Result<()> {
    let cfg = load_config(&cli.input, &cli.sprite)?;
    let paths = gather_paths(&cli.input.inputs, &cli.input.include, &cli.input.exclude)?;
    let mut rows = Vec::new();
    for path in &paths {
        let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let builder = DescriptorBuilder::new(&absolutize(path)?, &cfg);
        for image in builder.collect(&text)? {
            rows.push(ScanRow {
                document: path.to_string_lossy().replace('\\', "/"),
                url: image.url,
                path: image.path.to_string_lossy().into_owned(),
                x: image.initial_background_x,
                y: image.initial_background_y,
                repeat: image.repeat,
                unsupported: image.unsupported,
                retina_ratio: image.is_retina.then_some(image.retina_ratio),
                meta: image.meta,
            });
        }
    }
    info!(stylesheets = paths.len(), candidates = rows.len(), "scan finished");
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

/// YAML file (if any) first, then every flag that was given on the command line.
fn load_config(input: &InputArgs, args: &SpriteArgs) -> anyhow::Result<SpriteConfig> {
    let base = match &input.config {
        Some(path) => {
            let file =
                fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            serde_yaml::from_str(&file).with_context(|| format!("parse {}", path.display()))?
        }
        None => SpriteConfig::default(),
    };
    args.apply(base)
}

impl SpriteArgs {
    fn apply(&self, mut cfg: SpriteConfig) -> anyhow::Result<SpriteConfig> {
        if let Some(v) = &self.sprite_sheet_name {
            cfg.sprite_sheet_name = Some(v.clone());
        }
        if let Some(v) = &self.style_sheet_name {
            cfg.style_sheet_name = Some(v.clone());
        }
        if let Some(v) = &self.sprite_sheet_path {
            cfg.sprite_sheet_path = Some(v.clone());
        }
        if let Some(v) = &self.base_url {
            cfg.base_url = v.clone();
        }
        if self.no_retina {
            cfg.retina = false;
        }
        if self.include_non_png {
            cfg.exclude_not_png = false;
        }
        if let Some(path) = &self.declaration_template {
            let template =
                fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            cfg.declaration_template = Some(template);
        }
        if let Some(v) = &self.algorithm {
            cfg.algorithm = v
                .parse::<Algorithm>()
                .map_err(|_| anyhow::anyhow!("unknown algorithm: {}", v))?;
        }
        if let Some(v) = self.padding {
            cfg.padding = v;
        }
        if let Some(v) = &self.format {
            cfg.export_opts.format = v
                .parse::<SheetFormat>()
                .map_err(|_| anyhow::anyhow!("unknown sheet format: {}", v))?;
        }
        if let Some(v) = self.quality {
            cfg.export_opts.quality = v;
        }
        if let Some(v) = self.timeout {
            cfg.img_opts.timeout = v;
        }
        Ok(cfg)
    }
}

fn build_pipeline(cfg: SpriteConfig, args: &SpriteArgs) -> anyhow::Result<SpritePipeline> {
    let mut builder = SpritePipeline::builder(cfg);
    if !args.skip.is_empty() {
        let skip = glob_set(&args.skip)?;
        builder = builder.filter(filter_fn(move |image| {
            let skipped = skip.is_match(&image.url);
            if skipped {
                info!(url = %image.url, "skipped: matches --skip");
            }
            !skipped
        }));
    }
    if let Some(key) = args.group_by_meta.clone() {
        builder = builder.group_by(group_fn(move |image| {
            image.meta.get(&key).map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        }));
    }
    Ok(builder.build()?)
}

fn glob_set(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat)?);
    }
    Ok(b.build()?)
}

fn gather_paths(
    inputs: &[PathBuf],
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let inc_set = if include.is_empty() {
        None
    } else {
        Some(glob_set(include)?)
    };
    let exc_set = if exclude.is_empty() {
        None
    } else {
        Some(glob_set(exclude)?)
    };
    let accept = |p: &Path| {
        !should_skip(p, inc_set.as_ref(), exc_set.as_ref())
            && (inc_set.is_some() || is_stylesheet(p))
    };
    let mut list: Vec<PathBuf> = Vec::new();
    for path in inputs {
        if path.is_file() {
            if accept(path.as_path()) {
                list.push(path.to_path_buf());
            }
        } else {
            for entry in WalkDir::new(path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
                let p = entry.path();
                if p.is_file() && accept(p) {
                    list.push(p.to_path_buf());
                }
            }
        }
    }
    Ok(list)
}

fn should_skip(p: &Path, include: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn is_stylesheet(p: &Path) -> bool {
    p.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("css"))
}

async fn read_documents(paths: &[PathBuf]) -> anyhow::Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let contents = tokio::fs::read(path)
            .await
            .with_context(|| format!("read {}", path.display()))?;
        documents.push(Document::new(path.clone(), contents));
    }
    Ok(documents)
}

async fn write_artifact(
    out_dir: &Path,
    artifact: &Artifact,
    dry_run: bool,
    written: &mut HashSet<PathBuf>,
) -> anyhow::Result<()> {
    let path = out_dir.join(&artifact.path);
    if !written.insert(path.clone()) {
        warn!(?path, "written more than once; the last stylesheet to finish wins");
    }
    if dry_run {
        info!(?path, bytes = artifact.contents.len(), "dry run: not written");
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create {}", parent.display()))?;
    }
    tokio::fs::write(&path, &artifact.contents)
        .await
        .with_context(|| format!("write {}", path.display()))?;
    info!(?path, "wrote");
    Ok(())
}

fn progress_bar(len: usize, show: bool) -> anyhow::Result<Option<ProgressBar>> {
    if !show {
        return Ok(None);
    }
    let b = ProgressBar::new(len as u64);
    b.set_style(ProgressStyle::with_template(
        "{spinner:.green} processing {pos}/{len} [{elapsed_precise}] {wide_msg}",
    )?);
    Ok(Some(b))
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}
