//! CRC64 fixture helper, used only to reproduce the reference's test vectors.
//! Not part of the public API.

const POLY: u64 = 0xC96C_5795_D787_0F42;

pub fn init() -> u64 {
    u64::MAX
}

pub fn update(crc: u64, next: u8) -> u64 {
    let mut c = (crc ^ next as u64) & 0xFF;
    for _ in 0..8 {
        let b = (c & 1) == 1;
        let d = c >> 1;
        c = if b { POLY ^ d } else { d };
    }
    c ^ (crc >> 8)
}

pub fn finish(crc: u64) -> String {
    format!("{:016X}", !crc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_reference_fixture() {
        let mut crc = init();
        for b in b'a'..=b'j' {
            crc = update(crc, b);
        }
        assert_eq!(finish(crc), "32093A2ECD5773F4");
    }
}
