//! ROHC CRC-8 (RFC 3095 section 5.9.1): C(x) = 1 + x + x^2 + x^8

/// Reflected polynomial
const POLYNOMIAL: u8 = 0xE0;

/// Initial register value
const INIT: u8 = 0xFF;

const TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// CRC-8 over `data`
pub fn crc8(data: &[u8]) -> u8 {
    data.iter()
        .fold(INIT, |crc, &byte| TABLE[(crc ^ byte) as usize])
}
