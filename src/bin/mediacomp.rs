use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mediacomp", version)]
struct Cli {
    /// JSON settings file. Without it, settings come from MEDIACOMP_* variables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Describe a picture or a WAV sound.
    Info(InfoArgs),
    /// Assemble frame files into a looping animated GIF.
    Gif(FramesArgs),
    /// Assemble frame files into a DivX AVI (requires `ffmpeg` on PATH).
    Video(FramesArgs),
    /// Turn the slide*.jpg files of a directory into a looping GIF.
    Slideshow(SlideshowArgs),
    /// Write a silent WAV at the configured default sample rate.
    Silence(SilenceArgs),
    /// Add offsets to every pixel's channels, normalized by the color mode.
    Adjust(AdjustArgs),
    /// Draw a line of text in the configured font.
    Caption(CaptionArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Image or `.wav` file.
    path: PathBuf,
}

#[derive(Parser, Debug)]
struct FramesArgs {
    /// First frame, as `dir//file`. Every file sorting after it is included.
    #[arg(long)]
    first: String,

    /// Output path.
    #[arg(long)]
    out: PathBuf,

    /// Frames per second.
    #[arg(long, default_value_t = 24.0)]
    fps: f64,
}

#[derive(Parser, Debug)]
struct SlideshowArgs {
    /// Directory holding the slides.
    #[arg(long)]
    dir: PathBuf,

    /// Output GIF path.
    #[arg(long)]
    out: PathBuf,

    /// Seconds per slide.
    #[arg(long, default_value_t = 1.0)]
    delay: f64,
}

#[derive(Parser, Debug)]
struct SilenceArgs {
    /// Length in seconds.
    #[arg(long)]
    seconds: f64,

    /// Output WAV path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct AdjustArgs {
    /// Input picture.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output picture (.jpg, .jpeg or .png).
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    red: i64,

    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    green: i64,

    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    blue: i64,
}

#[derive(Parser, Debug)]
struct CaptionArgs {
    /// Input picture.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output picture (.jpg, .jpeg or .png).
    #[arg(long)]
    out: PathBuf,

    /// Text to draw.
    #[arg(long)]
    text: String,

    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    x: i64,

    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    y: i64,

    /// Font size in pixels.
    #[arg(long, default_value_t = 24.0)]
    size: f32,
}

fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(?config, "settings loaded");

    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Gif(args) => cmd_gif(args),
        Command::Video(args) => cmd_video(args),
        Command::Slideshow(args) => cmd_slideshow(args),
        Command::Silence(args) => cmd_silence(args, &config),
        Command::Adjust(args) => cmd_adjust(args, &config),
        Command::Caption(args) => cmd_caption(args, &config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<mediacomp::MediaConfig> {
    match path {
        Some(path) => Ok(mediacomp::MediaConfig::from_json_path(path)?),
        None => Ok(mediacomp::MediaConfig::from_env()),
    }
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    if is_wav(&args.path) {
        let sound = mediacomp::Sound::open(&args.path)
            .with_context(|| format!("open sound '{}'", args.path.display()))?;
        println!("{sound}");
    } else {
        let picture = mediacomp::Picture::open(&args.path)
            .with_context(|| format!("open picture '{}'", args.path.display()))?;
        println!("{picture}");
    }
    Ok(())
}

fn cmd_gif(args: FramesArgs) -> anyhow::Result<()> {
    let frames = mediacomp::make_movie_from_initial_file(&args.first)?;
    mediacomp::write_animated_gif(&frames, &args.out, args.fps)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_video(args: FramesArgs) -> anyhow::Result<()> {
    let frames = mediacomp::make_movie_from_initial_file(&args.first)?;
    mediacomp::write_video(&frames, &args.out, args.fps)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_slideshow(args: SlideshowArgs) -> anyhow::Result<()> {
    mediacomp::write_slide_show_to(&args.dir, &args.out, args.delay)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_silence(args: SilenceArgs, config: &mediacomp::MediaConfig) -> anyhow::Result<()> {
    let sound = mediacomp::Sound::blank_by_duration_default(args.seconds, config)?;
    sound.save(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_adjust(args: AdjustArgs, config: &mediacomp::MediaConfig) -> anyhow::Result<()> {
    let mut picture = mediacomp::Picture::open(&args.in_path)
        .with_context(|| format!("open picture '{}'", args.in_path.display()))?;
    let mode = config.color_mode();
    for pixel in picture.all_pixels() {
        let c = pixel.color(&picture)?;
        pixel.set_red(&mut picture, i64::from(c.r).saturating_add(args.red), mode)?;
        pixel.set_green(&mut picture, i64::from(c.g).saturating_add(args.green), mode)?;
        pixel.set_blue(&mut picture, i64::from(c.b).saturating_add(args.blue), mode)?;
    }
    picture.save(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_caption(args: CaptionArgs, config: &mediacomp::MediaConfig) -> anyhow::Result<()> {
    let mut picture = mediacomp::Picture::open(&args.in_path)
        .with_context(|| format!("open picture '{}'", args.in_path.display()))?;
    picture.add_text(
        args.x,
        args.y,
        &args.text,
        args.size,
        mediacomp::Color::BLACK,
        config,
    )?;
    picture.save(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
