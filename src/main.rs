use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process;

use clap::Parser;

use tomasim::processor::{ProcConfig, Processor, SimError};
use tomasim::trace::TraceReader;

/// Cycle-accurate timing simulator of a Tomasulo-style out-of-order core.
#[derive(Parser, Debug)]
#[command(name = "tomasim", version)]
struct Args {
    /// Instruction trace: one `<hex addr> <op class> <dest> <src1> <src2>` per line.
    trace: PathBuf,

    /// Result broadcasts per cycle (common data bus width).
    #[arg(short = 'r', long = "bus-width", default_value_t = 2)]
    bus_width: usize,

    /// Instructions fetched from the trace per cycle.
    #[arg(short = 'f', long = "fetch-width", default_value_t = 4)]
    fetch_width: usize,

    /// Class-0 functional units.
    #[arg(short = 'j', long = "k0", default_value_t = 3)]
    k0: usize,

    /// Class-1 functional units.
    #[arg(short = 'k', long = "k1", default_value_t = 2)]
    k1: usize,

    /// Class-2 functional units.
    #[arg(short = 'l', long = "k2", default_value_t = 1)]
    k2: usize,

    /// Print the per-instruction lifecycle table.
    #[arg(long)]
    timeline: bool,
}
impl From<&Args> for ProcConfig {
    fn from(args: &Args) -> Self {
        ProcConfig {
            bus_width: args.bus_width,
            fetch_width: args.fetch_width,
            k0: args.k0,
            k1: args.k1,
            k2: args.k2,
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(&args) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), SimError> {
    let file = File::open(&args.trace)?;
    let source = TraceReader::new(BufReader::new(file));

    let processor = Processor::new(ProcConfig::from(args), source)?;
    let stats = processor.run()?;

    print!("{stats}");
    if args.timeline {
        let stdout = io::stdout();
        stats.write_timeline(&mut stdout.lock())?;
    }

    Ok(())
}
