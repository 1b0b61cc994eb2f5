//! modplay CLI: song summary, pattern dump, playback and WAV export.
//!
//! Usage:
//!   mp-cli path/to/file.mod
//!   mp-cli path/to/file.mod --wav output.wav --seconds 60
//!   mp-cli path/to/file.mod --dump

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mp_master::{Controller, Layout, LoadOptions, PlayMode, PlaybackConfig, Song, DEFAULT_BPM};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "mp-cli", version, about = "Play or render a MOD tracker module")]
struct Args {
    /// Module file to load
    file: PathBuf,

    /// Render to this WAV file instead of playing
    #[arg(long, value_name = "OUT")]
    wav: Option<PathBuf>,

    /// Longest render, in seconds
    #[arg(long, default_value_t = 300)]
    seconds: u32,

    /// Output rate (defaults to 44100 for WAV, the device rate for playback)
    #[arg(long, value_name = "HZ")]
    rate: Option<u32>,

    /// Initial tempo
    #[arg(long, default_value_t = DEFAULT_BPM)]
    bpm: f32,

    /// What to do at the end of the sequence
    #[arg(long, value_enum, default_value_t = Mode::Loop)]
    mode: Mode,

    /// Seed for the random vibrato/tremolo waveform
    #[arg(long)]
    seed: Option<u64>,

    /// Treat untagged files as the old 15-sample layout
    #[arg(long)]
    legacy: bool,

    /// Accept files whose sample data is cut short
    #[arg(long)]
    lenient: bool,

    /// Print every sequenced pattern and exit
    #[arg(long)]
    dump: bool,

    /// More logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Once,
    Loop,
    Declared,
}

impl From<Mode> for PlayMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Once => PlayMode::PlayOnce,
            Mode::Loop => PlayMode::Loop,
            Mode::Declared => PlayMode::LoopOnlyIfDeclared,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let data = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let options = LoadOptions {
        fallback_layout: if args.legacy { Layout::LEGACY } else { Layout::STANDARD },
        allow_truncated_samples: args.lenient,
    };
    let mut ctrl = Controller::new();
    ctrl.load_mod_with(&data, &options)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;

    print_summary(&ctrl);

    if args.dump {
        dump_patterns(ctrl.song());
        return Ok(());
    }

    let mut config = PlaybackConfig {
        sample_rate: args.rate,
        mode: args.mode.into(),
        bpm: args.bpm,
        ..PlaybackConfig::default()
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    match &args.wav {
        Some(path) => render_to_wav(&ctrl, &config, args.seconds, path),
        None => play_audio(&mut ctrl, config, args.seconds),
    }
}

fn print_summary(ctrl: &Controller) {
    let song = ctrl.song();
    println!("Title:    {}", song.title);
    println!("Channels: {}", song.channels);
    println!("Patterns: {}", song.patterns.len());
    println!("Sequence: {} (restart {})", song.sequence.len(), song.restart_position);

    let samples_with_data = song.samples.iter().filter(|s| !s.is_empty()).count();
    println!("Samples:  {} of {} with data", samples_with_data, song.samples.len());
    if let Some(report) = ctrl.load_report() {
        if !report.recognized_tag {
            println!("Layout:   unrecognized tag, read as {} channels", report.layout.channels);
        }
        if report.invalid_sample_refs > 0 {
            println!("Warning:  {} notes name missing samples", report.invalid_sample_refs);
        }
    }
    println!();

    print!("{}", mp_ir::analyze(song));
    println!();
}

fn dump_patterns(song: &Song) {
    let mut seen = Vec::new();
    for (entry, &index) in song.sequence.iter().enumerate() {
        if seen.contains(&index) {
            continue;
        }
        seen.push(index);
        let Some(pattern) = song.pattern_at(entry) else {
            println!("Pattern {:02X}: missing", index);
            continue;
        };
        println!("Pattern {:02X}", index);
        for div in 0..mp_ir::DIVISIONS_PER_PATTERN {
            let row: Vec<String> = pattern.row(div).iter().map(|d| d.to_string()).collect();
            println!("{:02X} | {}", div, row.join(" | "));
        }
        println!();
    }
}

fn play_audio(ctrl: &mut Controller, config: PlaybackConfig, max_seconds: u32) -> Result<()> {
    ctrl.play(config).context("failed to start playback")?;
    println!("Playing... (Ctrl-C to quit)");
    println!();

    let limit = Duration::from_secs(max_seconds as u64);
    let started = Instant::now();

    while ctrl.is_playing() && started.elapsed() < limit {
        if let Some(pos) = ctrl.position() {
            let (bpm, tpd) = ctrl.tempo().unwrap_or((DEFAULT_BPM, 6));
            print!(
                "\rSeq: {:02X} | Pat: {:02X} | Div: {:02} | {:5.1} BPM / {}",
                pos.sequence,
                pos.pattern.unwrap_or(0),
                pos.division,
                bpm,
                tpd
            );
            let _ = std::io::stdout().flush();
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    ctrl.stop();
    println!("\rDone.                                              ");
    Ok(())
}

fn render_to_wav(ctrl: &Controller, config: &PlaybackConfig, max_seconds: u32, path: &Path) -> Result<()> {
    let rate = config.sample_rate.unwrap_or(mp_master::DEFAULT_RENDER_RATE);
    println!("Rendering to {} at {} Hz...", path.display(), rate);

    let wav = ctrl.render_to_wav(config, max_seconds)?;
    println!("Rendered {} bytes", wav.len());

    std::fs::write(path, &wav).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Done.");
    Ok(())
}
