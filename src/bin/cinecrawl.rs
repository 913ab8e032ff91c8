use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use cinecrawl::{
    Canvas, CrawlFont, CrawlSequencer, FrameRgba, NullAudio, ScreenHost, SequenceScript,
};

#[derive(Parser, Debug)]
#[command(name = "cinecrawl", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame of the sequence as a PNG.
    Frame(FrameArgs),
    /// Render the whole sequence as a numbered PNG series.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Font file (TTF/OTF) used for all text.
    #[arg(long)]
    font: PathBuf,

    /// Sequence time in seconds.
    #[arg(long)]
    at: f32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Sequence script JSON; defaults to the built-in prologue.
    #[arg(long)]
    script: Option<PathBuf>,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Font size in pixels at scale 1.
    #[arg(long, default_value_t = 32.0)]
    font_size: f32,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Font file (TTF/OTF) used for all text.
    #[arg(long)]
    font: PathBuf,

    /// Output directory for frame_00000.png, frame_00001.png, ...
    #[arg(long)]
    out: PathBuf,

    /// Sequence script JSON; defaults to the built-in prologue.
    #[arg(long)]
    script: Option<PathBuf>,

    #[arg(long, default_value_t = 30)]
    fps: u32,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Font size in pixels at scale 1.
    #[arg(long, default_value_t = 32.0)]
    font_size: f32,
}

#[derive(Default)]
struct CliHost {
    pushed: Option<String>,
}

impl ScreenHost for CliHost {
    fn push_screen(&mut self, id: &str) {
        self.pushed.get_or_insert_with(|| id.to_string());
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn read_script(path: Option<&Path>) -> anyhow::Result<SequenceScript> {
    let Some(path) = path else {
        return Ok(SequenceScript::default());
    };
    let f = File::open(path).with_context(|| format!("open script '{}'", path.display()))?;
    let script = serde_json::from_reader(BufReader::new(f)).context("parse script JSON")?;
    Ok(script)
}

fn load_font(path: &Path, size_px: f32) -> anyhow::Result<CrawlFont> {
    let bytes = fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
    Ok(CrawlFont::from_bytes(bytes, size_px)?)
}

fn save_png(frame: &FrameRgba, path: &Path) -> anyhow::Result<()> {
    let img = image::RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
        .context("frame buffer does not match its dimensions")?;
    img.save(path)
        .with_context(|| format!("write png '{}'", path.display()))
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let script = read_script(args.script.as_deref())?;
    let mut font = load_font(&args.font, args.font_size)?;
    let canvas = Canvas::new(args.width, args.height)?;
    let mut seq = CrawlSequencer::new(canvas, script, NullAudio)?;
    let mut host = CliHost::default();

    // First update is the acquisition frame; the second seeks to the
    // requested time in one step.
    seq.update(0.0, &mut host);
    seq.update(args.at.max(0.0), &mut host);

    let frame = seq.render(&mut font)?;
    save_png(&frame, &args.out)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.fps > 0, "fps must be > 0");
    fs::create_dir_all(&args.out)
        .with_context(|| format!("create output directory '{}'", args.out.display()))?;

    let script = read_script(args.script.as_deref())?;
    let mut font = load_font(&args.font, args.font_size)?;
    let canvas = Canvas::new(args.width, args.height)?;
    let mut seq = CrawlSequencer::new(canvas, script, NullAudio)?;
    let mut host = CliHost::default();

    let dt = 1.0 / args.fps as f32;
    let mut index = 0u64;

    seq.update(0.0, &mut host);
    while !seq.is_finished() {
        let frame = seq.render(&mut font)?;
        save_png(&frame, &args.out.join(format!("frame_{index:05}.png")))?;
        index += 1;
        seq.update(dt, &mut host);
    }
    seq.dispose();

    let next = host.pushed.as_deref().unwrap_or("-");
    println!("rendered {index} frames; next screen: {next}");
    Ok(())
}
