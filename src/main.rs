// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{crate_version, Parser, Subcommand};
use crossbeam_channel::Receiver;
use gridseq::config::{EngineConfig, Pattern};
use gridseq::playback::{ChannelSampleEngine, LoadedSample, SampleBank};
use gridseq::{PlayInstruction, Sequencer};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Fixed clock step used by the simulator.
const SIMULATION_STEP: Duration = Duration::from_millis(5);

/// Sample rate of the placeholder buffers handed to the engine.
const PLACEHOLDER_SAMPLE_RATE: u32 = 44100;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A grid step sequencer."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Steps a pattern through a fixed number of beats and prints every trigger.
    Simulate {
        /// The path to the pattern.
        pattern_path: String,
        /// The path to the engine config.
        #[arg(short, long)]
        config: Option<String>,
        /// How many beats to play.
        #[arg(short, long, default_value_t = 4.0)]
        beats: f64,
        /// Length of the silent placeholder buffer given to every key.
        #[arg(long, default_value_t = 1.0)]
        buffer_seconds: f64,
    },
    /// Loads a pattern, checks every cell and prints it.
    Verify {
        /// The path to the pattern.
        pattern_path: String,
    },
    /// Plays a pattern in real time, printing triggers as they are dispatched.
    Run {
        /// The path to the pattern.
        pattern_path: String,
        /// The path to the engine config.
        #[arg(short, long)]
        config: Option<String>,
        /// How many beats to play.
        #[arg(short, long, default_value_t = 16.0)]
        beats: f64,
        /// Length of the silent placeholder buffer given to every key.
        #[arg(long, default_value_t = 1.0)]
        buffer_seconds: f64,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            pattern_path,
            config,
            beats,
            buffer_seconds,
        } => {
            let config = load_config(config.as_deref())?;
            let (sequencer, rx) = load_sequencer(&config, &pattern_path, buffer_seconds)?;
            let seconds = beats / sequencer.tempo().beats_per_second();

            sequencer.start();
            while sequencer.seconds() < seconds {
                sequencer.tick(SIMULATION_STEP);
                for instruction in rx.try_iter() {
                    print_instruction(&instruction);
                }
            }
            sequencer.stop();
        }
        Commands::Verify { pattern_path } => {
            let pattern = Pattern::load(&PathBuf::from(&pattern_path))?;
            let library = placeholder_bank(&pattern, 0.0);
            let (engine, _rx) = ChannelSampleEngine::new();
            Sequencer::from_pattern(
                &EngineConfig::default(),
                &pattern,
                library,
                Arc::new(engine),
            )?;
            println!("{}", pattern);
        }
        Commands::Run {
            pattern_path,
            config,
            beats,
            buffer_seconds,
        } => {
            let config = load_config(config.as_deref())?;
            let tick_interval = config.tick_interval()?;
            let (sequencer, rx) = load_sequencer(&config, &pattern_path, buffer_seconds)?;
            let seconds = beats / sequencer.tempo().beats_per_second();

            let printer = thread::spawn(move || {
                for instruction in rx.iter() {
                    print_instruction(&instruction);
                }
            });

            info!(beats, seconds, ?tick_interval, "Playing pattern");
            sequencer.start();
            let mut last_tick = Instant::now();
            let mut next_tick = last_tick;
            while sequencer.seconds() < seconds {
                next_tick += tick_interval;
                spin_sleep::sleep(next_tick.saturating_duration_since(Instant::now()));
                let now = Instant::now();
                sequencer.tick(now - last_tick);
                last_tick = now;
            }
            sequencer.stop();

            // Dropping the sequencer closes the channel and ends the printer.
            drop(sequencer);
            if printer.join().is_err() {
                return Err("printer thread panicked".into());
            }
        }
    }

    Ok(())
}

/// Loads the engine config from the given path, or the defaults.
fn load_config(path: Option<&str>) -> Result<EngineConfig, Box<dyn Error>> {
    Ok(match path {
        Some(path) => EngineConfig::deserialize(Path::new(path))?,
        None => EngineConfig::default(),
    })
}

/// Builds a sequencer holding the pattern at `pattern_path`, with a silent
/// buffer loaded for every key it uses.
fn load_sequencer(
    config: &EngineConfig,
    pattern_path: &str,
    buffer_seconds: f64,
) -> Result<(Sequencer, Receiver<PlayInstruction>), Box<dyn Error>> {
    let pattern = Pattern::load(&PathBuf::from(pattern_path))?;
    let library = placeholder_bank(&pattern, buffer_seconds);
    let (engine, rx) = ChannelSampleEngine::new();
    let sequencer = Sequencer::from_pattern(config, &pattern, library, Arc::new(engine))?;
    Ok((sequencer, rx))
}

fn placeholder_bank(pattern: &Pattern, buffer_seconds: f64) -> Arc<SampleBank> {
    let bank = Arc::new(SampleBank::new());
    for record in &pattern.cells {
        let name = record.key.as_str();
        if bank.get(name).is_none() {
            bank.assign_key(&record.key, name);
            bank.insert(
                name,
                LoadedSample::silence(buffer_seconds, 2, PLACEHOLDER_SAMPLE_RATE),
            );
        }
    }
    bank
}

fn print_instruction(instruction: &PlayInstruction) {
    println!(
        "{:>8.3}s  {:<12} rate {:.3}  offset {:.3}s  duration {:.3}s  gain {:.1} dB",
        instruction.scheduled_time,
        instruction.key,
        instruction.rate,
        instruction.start_offset,
        instruction.duration,
        instruction.gain_db
    );
}
