use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use mdlthumb::{save_png, Options, RenderRequest, Thumbnailer};

#[derive(Parser, Debug)]
#[command(name = "mdlthumb", version)]
#[command(about = "Render a thumbnail of a 3D model file", long_about = None)]
struct Cli {
    /// Model file to render.
    model: PathBuf,

    /// Edge length of a square thumbnail.
    #[arg(short, long, default_value_t = 256)]
    size: u32,

    /// Output width; overrides --size.
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Output height; overrides --size.
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Output image path (.png, .jpg).
    #[arg(short, long)]
    out: PathBuf,

    /// JSON options file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init();

    let options = match &cli.config {
        Some(path) => Options::load(path)
            .with_context(|| format!("load options '{}'", path.display()))?,
        None => Options::default(),
    };

    let request = match (cli.width, cli.height) {
        (Some(width), Some(height)) => RenderRequest::new(&cli.model, width, height),
        _ => RenderRequest::square_clamped(&cli.model, cli.size, options.min_thumbnail_size),
    };

    let thumbnailer = Thumbnailer::new(options);
    let pixels = match thumbnailer.render(&request) {
        Ok(pixels) => pixels,
        Err(err) => {
            let kind = err.kind();
            return Err(anyhow::Error::new(err)
                .context(format!("{kind}: could not render '{}'", cli.model.display())));
        }
    };

    if let Some(parent) = cli.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    save_png(&cli.out, &pixels).with_context(|| format!("write '{}'", cli.out.display()))?;

    println!(
        "{} -> {} ({}x{})",
        cli.model.display(),
        cli.out.display(),
        pixels.width(),
        pixels.height()
    );
    Ok(())
}
