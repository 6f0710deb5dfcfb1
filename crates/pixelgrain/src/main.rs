use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};

use pixelgrain::effect::EffectRegistry;
use pixelgrain::effect::builtin::MemoryImageProvider;
use pixelgrain::gpu::HeadlessBackend;
use pixelgrain::renderer::Renderer;
use pixelgrain::settings::SettingsConfig;
use pixelgrain::timeline::{AccumulationMode, TimelineConfig, TimelineDocument, TimelineWatcher};

const USAGE: &str = "\
usage: pixelgrain [TIMELINE.json] [options]

options:
  --builtin NAME        use an embedded timeline (Ripple, Tint)
  --grid WxH            override the particle grid size
  --accumulation MODE   none | trails | smooth-trails | smear
  --image PATH          sample particles from an image (also usable by ChangeImage)
  --frames N            simulate N frames at 60 fps (default 60)
  --size WxH            viewport size for the simulation (default 1280x720)
  --dump                print the built draw command as JSON
  --watch               rebuild whenever the timeline file changes
  --list                list available effects
  --search QUERY        list effects whose id or name contains QUERY
";

#[derive(Debug, Default)]
struct Args {
    timeline: Option<PathBuf>,
    builtin: Option<String>,
    grid: Option<(u32, u32)>,
    accumulation: Option<AccumulationMode>,
    image: Option<PathBuf>,
    frames: Option<u64>,
    size: Option<(u32, u32)>,
    dump: bool,
    watch: bool,
    list: bool,
    search: Option<String>,
}

fn parse_size(value: &str) -> Result<(u32, u32)> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .with_context(|| format!("expected WxH, got '{value}'"))?;
    Ok((w.parse()?, h.parse()?))
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = || {
            iter.next()
                .with_context(|| format!("{arg} needs a value"))
        };
        match arg.as_str() {
            "--builtin" => args.builtin = Some(value()?),
            "--grid" => args.grid = Some(parse_size(&value()?)?),
            "--accumulation" => args.accumulation = Some(value()?.parse()?),
            "--image" => args.image = Some(PathBuf::from(value()?)),
            "--frames" => args.frames = Some(value()?.parse()?),
            "--size" => args.size = Some(parse_size(&value()?)?),
            "--dump" => args.dump = true,
            "--watch" => args.watch = true,
            "--list" => args.list = true,
            "--search" => args.search = Some(value()?),
            "-h" | "--help" => {
                print!("{USAGE}");
                std::process::exit(0);
            }
            other if other.starts_with('-') => bail!("unknown option {other}\n\n{USAGE}"),
            other => args.timeline = Some(PathBuf::from(other)),
        }
    }
    Ok(args)
}

fn load_timeline(args: &Args, settings: &SettingsConfig) -> Result<TimelineConfig> {
    let mut config = if let Some(name) = &args.builtin {
        TimelineDocument::builtin(name)
            .with_context(|| format!("no built-in timeline named '{name}'"))?
            .config
    } else if let Some(path) = args.timeline.as_ref().or(settings.last_timeline.as_ref()) {
        TimelineDocument::load(path)?.config
    } else {
        log::info!("No timeline given; starting empty");
        TimelineConfig {
            particle_grid_width: settings.default_grid[0],
            particle_grid_height: settings.default_grid[1],
            accumulation: settings.default_accumulation,
            ..TimelineConfig::default()
        }
    };
    if let Some((w, h)) = args.grid {
        config.particle_grid_width = w;
        config.particle_grid_height = h;
    }
    if let Some(mode) = args.accumulation {
        config.accumulation = mode;
    }
    Ok(config)
}

fn load_image(path: &Path) -> Result<image::RgbaImage> {
    let image = image::open(path).with_context(|| format!("opening image {}", path.display()))?;
    Ok(image.to_rgba8())
}

fn print_command(renderer: &Renderer<HeadlessBackend>) -> Result<()> {
    match renderer.command() {
        Some(command) => println!("{}", serde_json::to_string_pretty(&command.describe())?),
        None => log::warn!("No draw command built yet"),
    }
    Ok(())
}

/// Run `frames` frames at a simulated 60 fps, then drop the recorded ops.
fn simulate(renderer: &mut Renderer<HeadlessBackend>, frames: u64) {
    let start = Instant::now();
    let step = Duration::from_secs_f64(1.0 / 60.0);
    let mut errors = 0;
    for i in 0..frames {
        let report = renderer.frame_at(start + step * i as u32);
        errors += report.errors.len();
        log::debug!(
            "frame {i}: t={:.1}ms drew={} installed={}",
            report.time,
            report.drew,
            report.installed
        );
    }
    log::info!(
        "Simulated {frames} frames ending at t={:.1}ms ({} presented, {errors} effect errors)",
        renderer.clock().time(),
        renderer.backend().frames_presented()
    );
    let ops = renderer.backend_mut().take_ops();
    log::debug!("Discarded {} recorded backend ops", ops.len());
}


fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;
    let mut settings = SettingsConfig::load();

    let mut images = MemoryImageProvider::default();
    let source = match &args.image {
        Some(path) => {
            let image = load_image(path)?;
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            images.insert(name, image.clone());
            Some(image)
        }
        None => None,
    };
    let registry = Arc::new(EffectRegistry::with_builtins(Arc::new(images))?);

    if let Some(query) = &args.search {
        for effect in registry.search(query) {
            println!("{:<14} {}", effect.id(), effect.display_name());
        }
        return Ok(());
    }
    if args.list {
        for id in registry.ids() {
            println!("{id:<14} {}", registry.display_name(id)?);
        }
        return Ok(());
    }

    let config = load_timeline(&args, &settings)?;
    let mut renderer = Renderer::new(HeadlessBackend::new(), registry, config)?;
    let (width, height) = args.size.unwrap_or((1280, 720));
    renderer.resize(width, height)?;
    if source.is_some() {
        renderer.set_image(source)?;
    }
    renderer.finish_build();

    if let Some(path) = &args.timeline {
        settings.last_timeline = Some(path.clone());
        settings.save();
    }

    if args.dump {
        print_command(&renderer)?;
    }
    let frames = args.frames.unwrap_or(if args.dump { 0 } else { 60 });
    simulate(&mut renderer, frames);

    if args.watch {
        let Some(path) = &args.timeline else {
            bail!("--watch needs a timeline file");
        };
        let watcher = TimelineWatcher::new(path)?;
        loop {
            if !watcher.wait(Duration::from_secs(1)) {
                continue;
            }
            let config = match TimelineDocument::load(watcher.path()) {
                Ok(doc) => doc.config,
                Err(e) => {
                    log::error!("{e:#}");
                    continue;
                }
            };
            if let Err(e) = renderer.set_timeline(config) {
                log::error!("Keeping previous timeline: {e}");
                continue;
            }
            renderer.finish_build();
            if args.dump {
                print_command(&renderer)?;
            }
            simulate(&mut renderer, frames.max(1));
        }
    }

    Ok(())
}
