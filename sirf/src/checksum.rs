use crc::{Crc, CRC_24_LTE_A};

use crate::{constants::SIRF_CHECKSUM_MASK, error::CodecError};

/// SiRF 15-bit additive checksum over the payload, streaming or single-shot
#[derive(Default)]
pub struct SirfChecksumCalc {
    sum: u16,
}

impl SirfChecksumCalc {
    pub const fn new() -> Self {
        Self { sum: 0 }
    }

    /// Update checksum with new bytes
    pub const fn update(&mut self, bytes: &[u8]) {
        let mut i = 0;
        while i < bytes.len() {
            self.update_byte(bytes[i]);
            i += 1;
        }
    }

    pub const fn update_byte(&mut self, byte: u8) {
        self.sum = self.sum.wrapping_add(byte as u16) & SIRF_CHECKSUM_MASK;
    }

    pub const fn result(self) -> u16 {
        self.sum
    }

    /// Compare with the checksum carried by the frame
    pub const fn validate_result(self, received: u16) -> Result<(), CodecError> {
        if self.sum == received {
            Ok(())
        } else {
            Err(CodecError::InvalidChecksum {
                expect: received,
                got: self.sum,
            })
        }
    }

    /// Single-shot computation
    pub const fn compute(payload: &[u8]) -> u16 {
        let mut calc = Self::new();
        calc.update(payload);
        calc.result()
    }
}

/// CRC-24Q of RTCM3, catalogued as CRC-24/LTE-A
const RTCM_CRC: Crc<u32> = Crc::<u32>::new(&CRC_24_LTE_A);

/// CRC-24Q as used by RTCM3 framing
pub fn crc24q(data: &[u8]) -> u32 {
    RTCM_CRC.checksum(data)
}

/// XOR of every byte between `$` and `*`
pub fn nmea_checksum(body: &[u8]) -> u8 {
    body.iter().fold(0, |acc, b| acc ^ b)
}
