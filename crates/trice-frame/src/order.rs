/// Byte order of multi-byte fields on the wire.
///
/// Every header, length and stamp access goes through these conversions, so
/// a target whose native order differs from the transfer order only changes
/// this one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order of the machine running this code.
    pub const NATIVE: ByteOrder = if cfg!(target_endian = "little") {
        ByteOrder::Little
    } else {
        ByteOrder::Big
    };

    /// Convert a 16-bit value between host and wire order. The conversion is
    /// its own inverse.
    pub fn convert_u16(self, value: u16) -> u16 {
        if self == Self::NATIVE {
            value
        } else {
            value.swap_bytes()
        }
    }

    /// Convert a 32-bit value between host and wire order.
    pub fn convert_u32(self, value: u32) -> u32 {
        if self == Self::NATIVE {
            value
        } else {
            value.swap_bytes()
        }
    }

    pub fn read_u16(self, bytes: [u8; 2]) -> u16 {
        self.convert_u16(u16::from_ne_bytes(bytes))
    }

    pub fn read_u32(self, bytes: [u8; 4]) -> u32 {
        self.convert_u32(u32::from_ne_bytes(bytes))
    }

    pub fn u16_bytes(self, value: u16) -> [u8; 2] {
        self.convert_u16(value).to_ne_bytes()
    }

    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        self.convert_u32(value).to_ne_bytes()
    }

    pub fn name(self) -> &'static str {
        match self {
            ByteOrder::Little => "little",
            ByteOrder::Big => "big",
        }
    }
}
