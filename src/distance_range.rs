//! For a region and an angle, the finite set of parallel half-plane cut
//! lines usable at the current partition level.

use crate::codec_params::CodecParams;
use crate::region::Region;
use crate::sincos;

pub struct DistanceRange {
    pub num_lines: u32,
    min: i32,
    max: i32,
    line_quant: i32,
}

impl DistanceRange {
    pub fn new(region: &Region, angle: i32, cp: &CodecParams) -> DistanceRange {
        let table = sincos::table();
        let nx = table.sin[angle as usize] as i64;
        let ny = table.cos[angle as usize] as i64;

        let mut mi = i32::MAX as i64;
        let mut ma = i32::MIN as i64;
        for i in 0..region.len() {
            let y = region.y[i] as i64;
            let d0 = ny * y + nx * region.x0[i] as i64;
            let d1 = ny * y + nx * (region.x1[i] as i64 - 1);
            mi = mi.min(d0);
            ma = ma.max(d1);
        }

        let mut line_quant = cp.line_quant();
        let mut num_lines;
        loop {
            num_lines = ((ma - mi) / line_quant as i64) as u32;
            if num_lines > cp.line_limit {
                line_quant += line_quant / 16;
            } else {
                break;
            }
        }

        DistanceRange { num_lines, min: mi as i32, max: ma as i32, line_quant }
    }

    pub fn distance(&self, line: u32) -> i32 {
        if self.num_lines > 1 {
            let span = (self.max as i64) - (self.min as i64);
            self.min
                + (((span - (self.num_lines as i64 - 1) * self.line_quant as i64) / 2)
                    + self.line_quant as i64 * line as i64) as i32
        } else {
            ((self.max as i64 + self.min as i64) / 2) as i32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_strictly_increasing() {
        let region = Region::full(20, 20);
        let cp = CodecParams::new(20, 20);
        for angle in [0i32, 64, 128, 200, 300, 400] {
            let dr = DistanceRange::new(&region, angle, &cp);
            let mut prev = None;
            for line in 0..dr.num_lines {
                let d = dr.distance(line);
                if let Some(p) = prev {
                    assert!(d > p, "angle {angle} line {line}: {d} <= {p}");
                }
                prev = Some(d);
            }
        }
    }

    #[test]
    fn line_limit_is_respected() {
        let region = Region::full(64, 64);
        let mut cp = CodecParams::new(64, 64);
        cp.line_limit = 5;
        for angle in [0i32, 17, 255] {
            let dr = DistanceRange::new(&region, angle, &cp);
            assert!(dr.num_lines <= cp.line_limit);
        }
    }
}
