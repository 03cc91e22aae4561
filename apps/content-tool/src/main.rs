mod text;

use anyhow::{anyhow, bail, Context};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use newengine_content::{
    ContentConfigLoader, ContentConfigOverrides, ContentManager, ContentManifest, ScreenDensityBucket,
    WatchedAsset,
};
use newengine_modules_logging::{init_console_logger, ConsoleLoggerConfig};

use crate::text::TextDocument;

const USAGE: &str = "\
usage: content-tool [--config <file>] [--root <dir>] <command>

commands:
  resolve <asset> [--density <bucket>]   print the file an asset resolves to
  list <directory> [pattern]             list assets across root and overrides
  preprocess <manifest>... [--delete]    write .uvc files for every manifest asset
  load <manifest>...                     load every manifest asset once
  watch <asset>...                       reload assets as their files change";

#[derive(Debug)]
enum Command {
    Resolve {
        asset: String,
        density: Option<ScreenDensityBucket>,
    },
    List {
        directory: String,
        pattern: String,
    },
    Preprocess {
        manifests: Vec<PathBuf>,
        delete: bool,
    },
    Load {
        manifests: Vec<PathBuf>,
    },
    Watch {
        assets: Vec<String>,
    },
}

#[derive(Debug)]
struct ToolArgs {
    config: PathBuf,
    root: Option<PathBuf>,
    command: Command,
}

impl ToolArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut config = PathBuf::from("content.json");
        let mut root = None;
        let mut density = None;
        let mut delete = false;
        let mut positional = Vec::new();

        let mut it = args.into_iter();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--config" => config = it.next().map(PathBuf::from).context("--config needs a path")?,
                "--root" => root = Some(it.next().map(PathBuf::from).context("--root needs a path")?),
                "--density" => {
                    let name = it.next().context("--density needs a bucket name")?;
                    density = Some(
                        ScreenDensityBucket::from_name(&name)
                            .ok_or_else(|| anyhow!("unknown density bucket '{name}'"))?,
                    );
                }
                "--delete" => delete = true,
                "-h" | "--help" => {
                    println!("{USAGE}");
                    std::process::exit(0);
                }
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let name = positional.next().ok_or_else(|| anyhow!("{USAGE}"))?;
        let rest: Vec<String> = positional.collect();

        let command = match name.as_str() {
            "resolve" => Command::Resolve {
                asset: rest.into_iter().next().context("resolve needs an asset path")?,
                density,
            },
            "list" => {
                let mut rest = rest.into_iter();
                Command::List {
                    directory: rest.next().unwrap_or_default(),
                    pattern: rest.next().unwrap_or_else(|| "*".to_owned()),
                }
            }
            "preprocess" | "load" if rest.is_empty() => bail!("{name} needs at least one manifest"),
            "preprocess" => Command::Preprocess {
                manifests: rest.into_iter().map(PathBuf::from).collect(),
                delete,
            },
            "load" => Command::Load {
                manifests: rest.into_iter().map(PathBuf::from).collect(),
            },
            "watch" if rest.is_empty() => bail!("watch needs at least one asset"),
            "watch" => Command::Watch { assets: rest },
            other => bail!("unknown command '{other}'\n{USAGE}"),
        };

        Ok(Self {
            config,
            root,
            command,
        })
    }
}

fn main() -> anyhow::Result<()> {
    init_console_logger(ConsoleLoggerConfig::from_env()).context("install console logger")?;

    let args = ToolArgs::parse(std::env::args().skip(1))?;

    let overrides = ContentConfigOverrides {
        root_directory: args.root.clone(),
        ..ContentConfigOverrides::empty()
    };
    let (config, report) = ContentConfigLoader::load_json_with_overrides(&args.config, &overrides)
        .with_context(|| format!("load content config '{}'", args.config.display()))?;
    info!(
        "content-tool: config source={:?} overrides={}",
        report.source,
        report.overrides.len()
    );
    for o in &report.overrides {
        info!("content-tool: {} = {} ({:?}, was {})", o.key, o.to, o.source, o.from);
    }

    let manager = ContentManager::builder(config)
        .with_registry(Arc::new(text::registry()))
        .build();

    let result = run(&manager, args.command);
    manager.dispose();
    result
}

fn run(manager: &Arc<ContentManager>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Resolve { asset, density } => {
            let file = manager.resolve_asset_file_path(&asset, density, false)?;
            let report = serde_json::json!({
                "asset": asset,
                "density": density.unwrap_or_else(|| manager.primary_density()).name(),
                "file": file.display().to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::List { directory, pattern } => {
            for asset in manager.get_assets_in_directory(&directory, &pattern)? {
                println!("{asset}");
            }
            for dir in manager.get_subdirectories(&directory, &pattern)? {
                println!("{dir}/");
            }
        }
        Command::Preprocess { manifests, delete } => {
            let manifests = load_manifests(&manifests)?;
            manager
                .preprocess_manifests(&manifests, delete)
                .context("preprocess manifests")?;
            let total: usize = manifests.iter().map(ContentManifest::asset_count).sum();
            info!("content-tool: preprocessed {} assets (delete={})", total, delete);
        }
        Command::Load { manifests } => {
            for manifest in load_manifests(&manifests)? {
                let n = manager
                    .load_manifest(&manifest)
                    .with_context(|| format!("load manifest '{}'", manifest.name))?;
                println!("{}: {} assets", manifest.name, n);
            }
        }
        Command::Watch { assets } => watch(manager, &assets)?,
    }
    Ok(())
}

fn load_manifests(paths: &[PathBuf]) -> anyhow::Result<Vec<ContentManifest>> {
    paths
        .iter()
        .map(|p| ContentManifest::load_file(p).with_context(|| format!("read manifest '{}'", p.display())))
        .collect()
}

fn watch(manager: &Arc<ContentManager>, assets: &[String]) -> anyhow::Result<()> {
    if !manager.config().watch_content {
        bail!("content watching is disabled (set NEWENGINE_CONTENT_WATCH=1)");
    }

    let density = manager.primary_density();
    let watched = assets
        .iter()
        .map(|a| {
            WatchedAsset::<TextDocument>::with_validator(manager, a, density, |asset, doc| {
                if doc.lines.is_empty() {
                    warn!("content-tool: rejecting empty reload of '{asset}'");
                    return false;
                }
                true
            })
            .with_context(|| format!("watch '{a}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut seen: Vec<Arc<TextDocument>> = watched.iter().map(|w| w.value()).collect();
    for (w, doc) in watched.iter().zip(&seen) {
        println!("{}: {} lines", w.asset_path(), doc.lines.len());
    }
    info!("content-tool: watching {} assets, Ctrl+C to stop", watched.len());

    loop {
        if manager.work_queue().wait_and_drain(Duration::from_millis(250)) == 0 {
            continue;
        }
        for (w, last) in watched.iter().zip(seen.iter_mut()) {
            let now = w.value();
            if !Arc::ptr_eq(&now, last) {
                println!(
                    "{}: reloaded, {} lines, {} bytes",
                    w.asset_path(),
                    now.lines.len(),
                    now.byte_len()
                );
                *last = now;
            }
        }
    }
}
