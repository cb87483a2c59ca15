//! GIF-compatible run-length compression (miGIF).
//!
//! The code stream is not LZW: it uses only codes that any LZW decoder
//! would have in its table anyway, so decoders reconstruct the pixels
//! without the encoder building a dictionary. Horizontal runs of one
//! index compress well; noise does not compress at all.

use crate::collab::RasterEncoder;

/// Largest code width a GIF decoder accepts.
const GIF_BITS: u32 = 12;

/// Sub-blocks carry at most this many bytes.
const BLOCK_MAX: usize = 255;

/// The default [`RasterEncoder`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MiGif;

impl MiGif {
    pub fn new() -> Self {
        MiGif
    }
}

impl RasterEncoder for MiGif {
    fn encode(&mut self, indices: &mut dyn Iterator<Item = u8>, bits_per_pixel: u8, out: &mut Vec<u8>) {
        out.push(bits_per_pixel.max(2));
        let mut rle = RunLength::new(bits_per_pixel as u32, out);
        for index in indices {
            rle.pixel(index as i32);
        }
        rle.finish();
        out.push(0);
    }
}

/// Encoder state for one image.
struct RunLength<'a> {
    out: &'a mut Vec<u8>,
    block: Vec<u8>,
    bit_buf: u32,
    bit_count: u32,

    code_clear: i32,
    code_eof: i32,
    run_base_code: i32,
    max_out_codes: i32,

    out_bits_init: u32,
    out_bump_init: i32,
    out_clear_init: i32,
    out_bits: u32,
    out_bump: i32,
    out_clear: i32,
    out_count: i32,

    run_pixel: i32,
    run_count: i32,
    table_pixel: i32,
    table_max: i32,
    just_cleared: bool,
}

impl<'a> RunLength<'a> {
    fn new(bit_depth: u32, out: &'a mut Vec<u8>) -> Self {
        let init_bits = bit_depth.max(2) + 1;
        let code_clear = 1 << (init_bits - 1);
        let out_bump_init = (1 << (init_bits - 1)) - 1;
        let mut rle = RunLength {
            out,
            block: Vec::with_capacity(BLOCK_MAX),
            bit_buf: 0,
            bit_count: 0,
            code_clear,
            code_eof: code_clear + 1,
            run_base_code: code_clear + 2,
            max_out_codes: (1 << GIF_BITS) - ((1 << (init_bits - 1)) + 3),
            out_bits_init: init_bits,
            out_bump_init,
            // larger values compress long runs better
            out_clear_init: if init_bits <= 3 { 9 } else { out_bump_init - 1 },
            out_bits: init_bits,
            out_bump: 0,
            out_clear: 0,
            out_count: 0,
            run_pixel: -1,
            run_count: 0,
            table_pixel: -1,
            table_max: 0,
            just_cleared: true,
        };
        rle.did_clear();
        rle.output(code_clear);
        rle
    }

    /// Feed one pixel.
    fn pixel(&mut self, c: i32) {
        if self.run_count > 0 && c != self.run_pixel {
            self.flush_run();
        }
        if self.run_pixel == c {
            self.run_count += 1;
        } else {
            self.run_pixel = c;
            self.run_count = 1;
        }
    }

    fn finish(mut self) {
        if self.run_count > 0 {
            self.flush_run();
        }
        self.output(self.code_eof);
        if self.bit_count > 0 {
            self.block_out(self.bit_buf as u8);
        }
        self.write_block();
    }

    fn write_block(&mut self) {
        if self.block.is_empty() {
            return;
        }
        self.out.push(self.block.len() as u8);
        self.out.extend_from_slice(&self.block);
        self.block.clear();
    }

    fn block_out(&mut self, byte: u8) {
        self.block.push(byte);
        if self.block.len() >= BLOCK_MAX {
            self.write_block();
        }
    }

    /// Append a code, least significant bit first.
    fn output(&mut self, code: i32) {
        self.bit_buf |= (code as u32) << self.bit_count;
        self.bit_count += self.out_bits;
        while self.bit_count >= 8 {
            self.block_out((self.bit_buf & 0xff) as u8);
            self.bit_buf >>= 8;
            self.bit_count -= 8;
        }
    }

    fn did_clear(&mut self) {
        self.out_bits = self.out_bits_init;
        self.out_bump = self.out_bump_init;
        self.out_clear = self.out_clear_init;
        self.out_count = 0;
        self.table_max = 0;
        self.just_cleared = true;
    }

    fn clear(&mut self) {
        self.output(self.code_clear);
        self.did_clear();
    }

    /// A code the decoder will add to its table, widening codes as the
    /// decoder would.
    fn output_plain(&mut self, code: i32) {
        self.just_cleared = false;
        self.output(code);
        self.out_count += 1;
        if self.out_count >= self.out_bump {
            self.out_bits += 1;
            self.out_bump += 1 << (self.out_bits - 1);
        }
        if self.out_count >= self.out_clear {
            self.clear();
        }
    }

    fn reset_out_clear(&mut self) {
        self.out_clear = self.out_clear_init;
        if self.out_count >= self.out_clear {
            self.clear();
        }
    }

    /// Emit a run right after a clear, building the table of run codes
    /// 1, 2, 3, … as the decoder sees them.
    fn flush_from_clear(&mut self, mut count: i32) {
        self.out_clear = self.max_out_codes;
        self.table_pixel = self.run_pixel;
        let mut n = 1;
        while count > 0 {
            if n == 1 {
                self.table_max = 1;
                self.output_plain(self.run_pixel);
                count -= 1;
            } else if count >= n {
                self.table_max = n;
                self.output_plain(self.run_base_code + n - 2);
                count -= n;
            } else if count == 1 {
                self.table_max += 1;
                self.output_plain(self.run_pixel);
                count = 0;
            } else {
                self.table_max += 1;
                self.output_plain(self.run_base_code + count - 2);
                count = 0;
            }
            n = if self.out_count == 0 { 1 } else { n + 1 };
        }
        self.reset_out_clear();
    }

    /// Emit a run either pixel by pixel or after a clear, whichever is
    /// shorter.
    fn flush_clear_or_repeat(&mut self, count: i32) {
        let with_clear = 1 + triangle_count(count as u32, self.max_out_codes as u32) as i32;
        if with_clear < count {
            self.clear();
            self.flush_from_clear(count);
        } else {
            for _ in 0..count {
                self.output_plain(self.run_pixel);
            }
        }
    }

    /// Emit a run using the run codes already in the decoder's table.
    fn flush_with_table(&mut self, count: i32) {
        let mut repeat_max = count / self.table_max;
        let mut leftover = count % self.table_max;
        let mut repeat_left = i32::from(leftover != 0);
        if self.out_count + repeat_max + repeat_left > self.max_out_codes {
            repeat_max = self.max_out_codes - self.out_count;
            leftover = count - repeat_max * self.table_max;
            repeat_left = 1 + triangle_count(leftover as u32, self.max_out_codes as u32) as i32;
        }
        if 1 + (triangle_count(count as u32, self.max_out_codes as u32) as i32) < repeat_max + repeat_left {
            self.clear();
            self.flush_from_clear(count);
            return;
        }
        self.out_clear = self.max_out_codes;
        for _ in 0..repeat_max {
            self.output_plain(self.run_base_code + self.table_max - 2);
        }
        if leftover > 0 {
            if self.just_cleared {
                self.flush_from_clear(leftover);
            } else if leftover == 1 {
                self.output_plain(self.run_pixel);
            } else {
                self.output_plain(self.run_base_code + leftover - 2);
            }
        }
        self.reset_out_clear();
    }

    fn flush_run(&mut self) {
        let count = self.run_count;
        if count == 1 {
            self.output_plain(self.run_pixel);
        } else if self.just_cleared {
            self.flush_from_clear(count);
        } else if self.table_max < 2 || self.table_pixel != self.run_pixel {
            self.flush_clear_or_repeat(count);
        } else {
            self.flush_with_table(count);
        }
        self.run_count = 0;
    }
}

/// Codes needed to send a run of `count` from a fresh table, where each
/// code covers one more pixel than the last.
fn triangle_count(mut count: u32, rep_codes: u32) -> u32 {
    let mut cost = 0;
    let per_rep = rep_codes * (rep_codes + 1) / 2;
    while count >= per_rep {
        cost += rep_codes;
        count -= per_rep;
    }
    if count > 0 {
        let mut n = isqrt(count);
        while n * (n + 1) >= 2 * count {
            n -= 1;
        }
        while n * (n + 1) < 2 * count {
            n += 1;
        }
        cost += n;
    }
    cost
}

fn isqrt(x: u32) -> u32 {
    if x < 2 {
        return x;
    }
    let mut r = 1u32;
    let mut v = x;
    while v != 0 {
        v >>= 2;
        r <<= 1;
    }
    loop {
        let next = (x / r + r) / 2;
        if next == r || next == r + 1 {
            return r;
        }
        r = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(pixels: &[u8], bits: u8) -> Vec<u8> {
        let mut out = Vec::new();
        MiGif.encode(&mut pixels.iter().copied(), bits, &mut out);
        out
    }

    /// A plain GIF LZW decoder, enough to read back what was written.
    fn decode(data: &[u8]) -> Vec<u8> {
        let min = data[0] as u32;
        let mut bytes = Vec::new();
        let mut i = 1;
        while data[i] != 0 {
            let n = data[i] as usize;
            bytes.extend_from_slice(&data[i + 1..i + 1 + n]);
            i += n + 1;
        }
        assert_eq!(i, data.len() - 1, "trailing bytes after terminator");

        let clear = 1u32 << min;
        let eof = clear + 1;
        let mut width = min + 1;
        let mut table: Vec<Vec<u8>> = Vec::new();
        let reset = |table: &mut Vec<Vec<u8>>| {
            table.clear();
            table.extend((0..clear).map(|c| vec![c as u8]));
            table.push(Vec::new());
            table.push(Vec::new());
        };
        reset(&mut table);

        let (mut buf, mut nbits, mut pos) = (0u32, 0u32, 0usize);
        let mut prev: Option<Vec<u8>> = None;
        let mut pixels = Vec::new();
        loop {
            while nbits < width {
                buf |= (bytes[pos] as u32) << nbits;
                pos += 1;
                nbits += 8;
            }
            let code = buf & ((1 << width) - 1);
            buf >>= width;
            nbits -= width;
            if code == clear {
                reset(&mut table);
                width = min + 1;
                prev = None;
                continue;
            }
            if code == eof {
                break;
            }
            let entry = match (&prev, table.get(code as usize)) {
                (_, Some(e)) => e.clone(),
                (Some(p), None) => {
                    let mut e = p.clone();
                    e.push(p[0]);
                    e
                }
                (None, None) => panic!("bad first code {code}"),
            };
            if let Some(p) = prev.take() {
                if table.len() < 4096 {
                    let mut e = p;
                    e.push(entry[0]);
                    table.push(e);
                    if table.len() == (1 << width) as usize && width < 12 {
                        width += 1;
                    }
                }
            }
            pixels.extend_from_slice(&entry);
            prev = Some(entry);
        }
        pixels
    }

    // ==================== Stream tests ====================

    #[test]
    fn two_pixel_run_bytes() {
        // clear(4) 1 1 eof(5) in 3-bit codes
        assert_eq!(encode(&[1, 1], 1), [2, 2, 0x4c, 0x0a, 0]);
    }

    #[test]
    fn empty_image_is_clear_then_eof() {
        // 4 | 5 << 3
        assert_eq!(encode(&[], 1), [2, 1, 0x2c, 0]);
    }

    #[test]
    fn min_code_size_has_floor_of_two() {
        assert_eq!(encode(&[0], 0)[0], 2);
        assert_eq!(encode(&[0], 8)[0], 8);
    }

    #[test]
    fn long_runs_compress() {
        let pixels = vec![3u8; 10_000];
        let out = encode(&pixels, 2);
        assert!(out.len() < 1_000, "{} bytes", out.len());
        assert_eq!(decode(&out), pixels);
    }

    #[test]
    fn mixed_rows_decode() {
        let mut pixels = Vec::new();
        for row in 0..40u32 {
            for x in 0..64u32 {
                pixels.push(if x > row && x < row + 7 { 1 } else { (x / 16) as u8 + 2 });
            }
        }
        assert_eq!(decode(&encode(&pixels, 3)), pixels);
    }

    #[test]
    fn noise_spills_over_sub_blocks() {
        let pixels: Vec<u8> = (0..5_000u32).map(|i| ((i * 7919) % 251) as u8).collect();
        let out = encode(&pixels, 8);
        assert!(out.iter().skip(1).step_by(256).take(3).all(|&b| b == 255));
        assert_eq!(decode(&out), pixels);
    }

    #[test]
    fn triangle_cost() {
        // 1 + 2 + 3 covers 6 pixels in three codes
        assert_eq!(triangle_count(6, 100), 3);
        assert_eq!(triangle_count(7, 100), 4);
        assert_eq!(isqrt(99), 9);
    }
}
