use collider_core::collide::run_search;
use collider_core::config::ColliderConfig;
use collider_core::forge::{ForgeError, file_name_bit_window, forge};
use collider_core::frame::compose_with_leading_crc;
use collider_core::record::ConfigRecord;
use collider_core::solver::GaussianSolver;

use clap::{Args, Parser, Subcommand};
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

/// The three record fields every subcommand seeds from.
#[derive(Args, Debug)]
struct SeedArgs {
    /// Bus speed in bit/s.
    bus_speed: u32,
    /// Node id of the device (one byte).
    node_id: u8,
    /// Node id of the firmware server (one byte).
    fw_server_id: u8,
}

impl SeedArgs {
    fn to_record(&self) -> ConfigRecord {
        ConfigRecord::new(self.bus_speed, self.node_id, self.fw_server_id)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Emit the leading-CRC frame for a seed record.
    Compose {
        #[clap(flatten)]
        seed: SeedArgs,
    },
    /// Brute-force a record whose composed frame also passes trailing
    /// validation.
    Collide {
        #[clap(flatten)]
        seed: SeedArgs,
        /// Worker thread count override.
        #[clap(short, long)]
        threads: Option<usize>,
    },
    /// Solve for a bit-flip set driving the shifted checksum to the target.
    Forge {
        #[clap(flatten)]
        seed: SeedArgs,
        /// Target checksum override.
        #[clap(long)]
        target: Option<u64>,
    },
}

fn load_config(cli_path: Option<PathBuf>) -> Result<ColliderConfig, anyhow::Error> {
    match cli_path {
        Some(config_path) => {
            eprintln!("loading configuration from specified path: {config_path:?}");
            ColliderConfig::load_from_file(&config_path)
        }
        None => {
            let default_config_path = PathBuf::from("collider.toml");
            if default_config_path.exists() {
                eprintln!("loading default configuration: {default_config_path:?}");
                ColliderConfig::load_from_file(&default_config_path)
            } else {
                Ok(ColliderConfig::default())
            }
        }
    }
}

/// Raw solution bytes go to stdout and nothing else does; diagnostics stay
/// on stderr.
fn write_solution_frame(frame: &[u8]) -> Result<(), anyhow::Error> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(frame)?;
    stdout.flush()?;
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let config = load_config(cli.config_file)?;

    match cli.command {
        Command::Compose { seed } => {
            let record = seed.to_record();
            eprintln!("seed:\n{record}");
            write_solution_frame(&compose_with_leading_crc(&record))
        }
        Command::Collide { seed, threads } => {
            let record = seed.to_record();
            eprintln!("seed:\n{record}");
            let mut settings = config.search.unwrap_or_default().to_settings();
            if let Some(threads) = threads {
                settings.threads = threads;
            }
            eprintln!("thread count: {}", settings.threads);
            let mut rng = ChaCha8Rng::from_os_rng();
            match run_search(&record, &settings, &mut rng) {
                Some(solution) => {
                    eprintln!(
                        "SOLUTION (worker {}, {} candidates):\n{}",
                        solution.worker, solution.iterations, solution.record
                    );
                    write_solution_frame(&solution.frame)
                }
                None => {
                    eprintln!("search space exhausted without a solution");
                    Ok(())
                }
            }
        }
        Command::Forge { seed, target } => {
            let record = seed.to_record();
            eprintln!("seed:\n{record}");
            let target =
                target.unwrap_or_else(|| config.forge.unwrap_or_default().target_checksum);
            let candidates = file_name_bit_window();
            match forge(&record, &candidates, target, &GaussianSolver::new()) {
                Ok(forged) => {
                    eprintln!(
                        "solution found with {} bits flipped: {:?}",
                        forged.flipped_bits.len(),
                        forged.flipped_bits
                    );
                    write_solution_frame(&forged.frame)
                }
                Err(ForgeError::NoSolution(err)) => {
                    eprintln!("no solution found: {err}");
                    Ok(())
                }
                Err(err @ ForgeError::SelfCheckFailed) => Err(err.into()),
            }
        }
    }
}
