use std::path::{Path, PathBuf};

use clap::{Args, Subcommand, ValueEnum};
use trice_frame::{ByteOrder, Framing};

use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

pub mod encode;
pub mod simulate;
pub mod version;
pub mod walk;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the records of a raw trace buffer dump.
    Walk(WalkArgs),
    /// Encode the records of a dump into one framed packet.
    Encode(EncodeArgs),
    /// Run a dump through a configured buffer, router and channels.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Walk(args) => walk::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum OrderArg {
    #[default]
    Little,
    Big,
}

impl From<OrderArg> for ByteOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Little => ByteOrder::Little,
            OrderArg::Big => ByteOrder::Big,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum FramingArg {
    None,
    #[default]
    Cobs,
}

impl From<FramingArg> for Framing {
    fn from(framing: FramingArg) -> Self {
        match framing {
            FramingArg::None => Framing::None,
            FramingArg::Cobs => Framing::Cobs,
        }
    }
}

#[derive(Args, Debug)]
pub struct WalkArgs {
    /// Buffer dump: back-to-back records as a producer lays them out.
    pub dump: PathBuf,
    /// Byte order of the multi-byte fields in the dump.
    #[arg(long, value_enum, default_value_t = OrderArg::Little)]
    pub byte_order: OrderArg,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Buffer dump to encode.
    pub dump: PathBuf,
    /// Packet framing.
    #[arg(long, value_enum, default_value_t = FramingArg::Cobs)]
    pub framing: FramingArg,
    /// Byte order of the multi-byte fields in the dump.
    #[arg(long, value_enum, default_value_t = OrderArg::Little)]
    pub byte_order: OrderArg,
    /// Write the packet to a file instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Buffer dump whose records are replayed.
    pub dump: PathBuf,
    /// JSON trace configuration.
    #[arg(long, short = 'c', value_name = "FILE", env = "TRICE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn read_dump(path: &Path) -> CliResult<Vec<u8>> {
    std::fs::read(path).map_err(|err| io_error(&format!("read {}", path.display()), err))
}
