//! Two-channel example: records split by ID between a "uart" channel that
//! only takes low IDs and a "log" channel writing everything to stderr.
//!
//! Run with:
//!   cargo run --example two-channels

use trice::frame::{DoubleBuffer, Stamp};
use trice::route::{Channel, DeferredOutput, EncodeConfig, HealthReport, Router, TransferMode};
use trice::transport::{MemoryPort, TxPort, WritePort};

/// Either port, so both channels fit one router.
enum Port {
    Uart(MemoryPort),
    Log(WritePort<std::io::Stderr>),
}

impl TxPort for Port {
    fn tx_register_empty(&self) -> bool {
        match self {
            Port::Uart(port) => port.tx_register_empty(),
            Port::Log(port) => port.tx_register_empty(),
        }
    }

    fn tx_write_byte(&mut self, byte: u8) {
        match self {
            Port::Uart(port) => port.tx_write_byte(byte),
            Port::Log(port) => port.tx_write_byte(byte),
        }
    }

    fn tx_enable_empty_interrupt(&mut self) {
        match self {
            Port::Uart(port) => port.tx_enable_empty_interrupt(),
            Port::Log(port) => port.tx_enable_empty_interrupt(),
        }
    }

    fn tx_disable_empty_interrupt(&mut self) {
        match self {
            Port::Uart(port) => port.tx_disable_empty_interrupt(),
            Port::Log(port) => port.tx_disable_empty_interrupt(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut router = Router::new(vec![
        Channel::filtered("uart", Port::Uart(MemoryPort::new()), 0, 1000)?,
        Channel::new("log", Port::Log(WritePort::new(std::io::stderr()))),
    ])?;
    let mut output = DeferredOutput::new(
        Box::new(DoubleBuffer::new(512)),
        EncodeConfig {
            transfer_mode: TransferMode::SinglePack,
            ..EncodeConfig::default()
        },
    )?;

    // Emission side: cheap, never touches a channel.
    output.emit(42, Stamp::None, &[0xAA, 0xBB, 0xCC])?;
    output.emit(7, Stamp::Ts16(0x1234), b"hi")?;
    output.emit(2500, Stamp::Ts32(0x0001_0000), &1234u32.to_le_bytes())?;

    let packets = output.flush(&mut router)?;
    eprintln!();
    eprintln!("[example] {packets} packets routed");

    if let Some(Port::Uart(port)) = router.channel("uart").map(|c| c.transmitter().port()) {
        eprintln!("[example] uart received {} bytes", port.sent().len());
    }
    eprint!("{}", HealthReport::collect(output.diagnostics(), &router));
    Ok(())
}
