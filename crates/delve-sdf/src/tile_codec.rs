//! Reversible byte transform for tile files.
//!
//! Row 0 is stored as-is. Every later texel stores its difference from a
//! planar prediction built from already-decoded neighbours (`up` in the first
//! column, `left + up - up_left` elsewhere), XORed with `0x80` so that a
//! perfect prediction lands on a constant byte. Smooth distance fields
//! therefore encode to long runs of `0x80`, which compress well.

use delve_core::constants::TILE_SIZE;

/// Raw density bytes of one tile, row-major.
pub type TileSamples = [[u8; TILE_SIZE]; TILE_SIZE];

const BIAS: u8 = 0x80;

#[inline]
fn predict(rows: &TileSamples, x: usize, y: usize) -> u8 {
    let up = rows[y - 1][x];
    if x == 0 {
        up
    } else {
        rows[y][x - 1].wrapping_add(up).wrapping_sub(rows[y - 1][x - 1])
    }
}

/// Encode a tile in place.
pub fn encode_tile(rows: &mut TileSamples) {
    // Walk backwards so every prediction still reads plain bytes.
    for y in (1..TILE_SIZE).rev() {
        for x in (0..TILE_SIZE).rev() {
            let prediction = predict(rows, x, y);
            rows[y][x] = rows[y][x].wrapping_sub(prediction) ^ BIAS;
        }
    }
}

/// Decode a tile in place.
pub fn decode_tile(rows: &mut TileSamples) {
    for y in 1..TILE_SIZE {
        for x in 0..TILE_SIZE {
            let prediction = predict(rows, x, y);
            rows[y][x] = (rows[y][x] ^ BIAS).wrapping_add(prediction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pseudo_random_tile(seed: u32) -> TileSamples {
        let mut state = seed;
        let mut rows = [[0u8; TILE_SIZE]; TILE_SIZE];
        for row in &mut rows {
            for texel in row.iter_mut() {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                *texel = (state >> 24) as u8;
            }
        }
        rows
    }

    #[test]
    fn decode_inverts_encode() {
        for seed in 0..16 {
            let original = pseudo_random_tile(seed);
            let mut rows = original;
            encode_tile(&mut rows);
            decode_tile(&mut rows);
            assert_eq!(rows, original);
        }
    }

    #[test]
    fn encode_inverts_decode() {
        for seed in 100..116 {
            let original = pseudo_random_tile(seed);
            let mut rows = original;
            decode_tile(&mut rows);
            encode_tile(&mut rows);
            assert_eq!(rows, original);
        }
    }

    #[test]
    fn first_row_is_stored_raw() {
        let original = pseudo_random_tile(7);
        let mut rows = original;
        encode_tile(&mut rows);
        assert_eq!(rows[0], original[0]);
    }

    #[test]
    fn planar_ramp_encodes_to_bias() {
        let mut rows = [[0u8; TILE_SIZE]; TILE_SIZE];
        for (y, row) in rows.iter_mut().enumerate() {
            for (x, texel) in row.iter_mut().enumerate() {
                *texel = (64 + x + 2 * y) as u8;
            }
        }
        encode_tile(&mut rows);
        for row in &rows[1..] {
            // First column predicts from `up` only, so it carries the y slope.
            assert_eq!(row[0], 2 ^ BIAS);
            assert!(row[1..].iter().all(|&b| b == BIAS));
        }
    }

    #[test]
    fn extreme_bytes_survive_wrapping() {
        let mut original = [[0u8; TILE_SIZE]; TILE_SIZE];
        for (y, row) in original.iter_mut().enumerate() {
            for (x, texel) in row.iter_mut().enumerate() {
                *texel = if (x + y) % 2 == 0 { 0 } else { u8::MAX };
            }
        }
        let mut rows = original;
        encode_tile(&mut rows);
        decode_tile(&mut rows);
        assert_eq!(rows, original);
    }
}
