use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;

use miditone::config::{BuzzerConfig, EngineConfig, PlaybackConfig, SamplerConfig};
use miditone::engine::OutputEngine;
use miditone::generator::InstrumentKind;
use miditone::midi::MidiDecoder;
use miditone::pcm::SampleFormat;
use miditone::pipeline::{CancelToken, Player};
use miditone::temperament::Temperament;

/// Play a Standard MIDI File on buzzers or render it to a WAV file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to input MIDI file
    #[arg(required_unless_present = "list")]
    input: Option<PathBuf>,

    /// Playback speed in percent
    #[arg(short, long, default_value_t = 100.0)]
    speed: f64,

    /// Transposition in semitones
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    transpose: i32,

    /// Temperament
    #[arg(short = 'T', long, default_value = "equal")]
    temperament: String,

    /// Reference pitch of A3 in hz
    #[arg(short, long, default_value_t = 440.0)]
    pitch: f32,

    /// Output WAV file (selects the sampler)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output channels
    #[arg(short, long, default_value_t = 2)]
    channels: u16,

    /// Output sample rate in hz
    #[arg(short = 'r', long, default_value_t = 44100)]
    sample_rate: u32,

    /// Output sample size in bits (8, 16 or 32)
    #[arg(short = 'S', long, default_value_t = 32)]
    sample_bits: u16,

    /// Gain in percent
    #[arg(short, long, default_value_t = 20.0)]
    gain: f32,

    /// Pan low notes left and high notes right
    #[arg(short = 'P', long)]
    autopan: bool,

    /// Instrument used by the sampler
    #[arg(short, long, default_value = "piano")]
    instrument: String,

    /// Buzzer devices separated by ':' (selects the buzzer pool)
    #[arg(short = 'B', long, env = "BUZZER_DEVICES")]
    buzzer_devices: Option<String>,

    /// List temperaments and instruments, then exit
    #[arg(long)]
    list: bool,
}

impl Cli {
    fn playback(&self) -> PlaybackConfig {
        PlaybackConfig {
            speed: self.speed / 100.0,
            transposition: self.transpose,
            temperament: self.temperament.clone(),
            pitch: self.pitch,
        }
    }

    fn engines(&self) -> Result<EngineConfig> {
        let sampler = match &self.output {
            Some(output) => Some(SamplerConfig {
                channels: self.channels,
                sample_rate: self.sample_rate,
                format: SampleFormat::from_bits(self.sample_bits)?,
                gain: self.gain / 100.0,
                autopan: self.autopan,
                instrument: self.instrument.parse::<InstrumentKind>()?,
                ..SamplerConfig::new(output)
            }),
            None => None,
        };
        let buzzer = self
            .buzzer_devices
            .as_deref()
            .map(BuzzerConfig::from_device_list)
            .transpose()?;
        Ok(EngineConfig { sampler, buzzer })
    }
}

fn list() {
    println!("Temperaments:");
    for temperament in Temperament::ALL {
        println!("  '{}': {}", temperament.id(), temperament.name());
    }
    println!("Instruments:");
    for instrument in InstrumentKind::ALL {
        println!("  '{}'", instrument);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if cli.list {
        list();
        return Ok(());
    }
    let input = cli.input.clone().context("no input file")?;

    // Configuration is fully resolved before the file is touched
    let playback = cli.playback();
    playback.validate()?;
    let temperament = playback.temperament()?;
    let mut engine = cli.engines()?.resolve(temperament)?;

    let mut player = Player::from_config(&playback)?.on_progress(|line| {
        eprint!("{}\r", line);
        let _ = io::stderr().flush();
    });
    MidiDecoder::new()
        .decode_file(&input, player.timeline_mut())
        .with_context(|| format!("could not parse {}", input.display()))?;

    println!("Engine: {}", engine.name());
    println!("{}", engine.info());
    println!("{}", player.info());

    let cancel = CancelToken::new();
    let handler = cancel.clone();
    ctrlc::set_handler(move || handler.cancel()).context("installing SIGINT handler")?;

    let report = player
        .play(&mut engine, &cancel)
        .context("playback failed")?;
    eprintln!();
    log::info!("{}", report);
    if report.dropped > 0 {
        println!("{} note(s) dropped, no free buzzer", report.dropped);
    }

    Ok(())
}
