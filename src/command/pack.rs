use packed_struct::{prelude::*, types::bits::Bits};

/// Trait to fill in the checksum before packing the struct
pub trait CheckSum {
    /// The byte that makes the payload sum to zero modulo 256
    fn calculate_checksum(&self, payload: &[u8]) -> u8 {
        payload
            .iter()
            .fold(0u8, |sum, byte| sum.wrapping_add(*byte))
            .wrapping_neg()
    }

    fn checksum_pack(&mut self) -> [u8; 4];
}

// Byte # | Bits | Definition
// 0      | 0xFF | Red channel
// 1      | 0xFF | Green channel
// 2      | 0xFF | Blue channel
// 3      | 0xFF | Checksum, (red + green + blue + checksum) mod 256 == 0
#[derive(PackedStruct, Default, Debug, PartialEq, Clone)]
#[packed_struct(bit_numbering = "msb0")]
pub struct ColorPack {
    #[packed_field(bits = "0..=7")]
    pub red: Integer<u8, Bits<8>>,
    #[packed_field(bits = "8..=15")]
    pub green: Integer<u8, Bits<8>>,
    #[packed_field(bits = "16..=23")]
    pub blue: Integer<u8, Bits<8>>,
    #[packed_field(bits = "24..=31")]
    pub checksum: Integer<u8, Bits<8>>,
}

impl CheckSum for ColorPack {
    fn checksum_pack(&mut self) -> [u8; 4] {
        let payload = [*self.red, *self.green, *self.blue];
        self.checksum = self.calculate_checksum(&payload).into();
        [payload[0], payload[1], payload[2], *self.checksum]
    }
}
