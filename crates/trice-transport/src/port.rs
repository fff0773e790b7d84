/// Hardware primitives a channel needs to push bytes out.
///
/// Implementations wrap one peripheral (e.g. a UART). All methods must return
/// immediately; they are called from interrupt context.
pub trait TxPort {
    /// Returns true when the data register can accept the next byte.
    fn tx_register_empty(&self) -> bool;

    /// Writes one byte into the data register.
    fn tx_write_byte(&mut self, byte: u8);

    /// Allows the TX-empty interrupt.
    fn tx_enable_empty_interrupt(&mut self);

    /// Disallows the TX-empty interrupt.
    fn tx_disable_empty_interrupt(&mut self);
}

impl<T: TxPort + ?Sized> TxPort for Box<T> {
    fn tx_register_empty(&self) -> bool {
        (**self).tx_register_empty()
    }

    fn tx_write_byte(&mut self, byte: u8) {
        (**self).tx_write_byte(byte)
    }

    fn tx_enable_empty_interrupt(&mut self) {
        (**self).tx_enable_empty_interrupt()
    }

    fn tx_disable_empty_interrupt(&mut self) {
        (**self).tx_disable_empty_interrupt()
    }
}

impl<T: TxPort + ?Sized> TxPort for &mut T {
    fn tx_register_empty(&self) -> bool {
        (**self).tx_register_empty()
    }

    fn tx_write_byte(&mut self, byte: u8) {
        (**self).tx_write_byte(byte)
    }

    fn tx_enable_empty_interrupt(&mut self) {
        (**self).tx_enable_empty_interrupt()
    }

    fn tx_disable_empty_interrupt(&mut self) {
        (**self).tx_disable_empty_interrupt()
    }
}
