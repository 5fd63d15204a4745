use crate::blowfish_tables::{BLOWFISH_P, BLOWFISH_S};

const ROUNDS: usize = 16;
const BLOCK_SIZE: usize = 8;

/// Blowfish keyed for the launch argument token.
///
/// Standard key schedule, but blocks are read and written as little-endian
/// word pairs and the plaintext is zero-padded to the block size. Only the
/// encrypting direction is needed by the launcher.
pub struct Blowfish {
    p: [u32; 18],
    s: [[u32; 256]; 4],
}

impl Blowfish {
    /// Runs the key schedule for `key`. An empty key leaves the tables unkeyed.
    pub fn new(key: &[u8]) -> Self {
        let mut bf = Self {
            p: BLOWFISH_P,
            s: BLOWFISH_S,
        };

        if !key.is_empty() {
            let mut j = 0usize;
            for i in 0..ROUNDS + 2 {
                let mut data = 0u32;
                for _ in 0..4 {
                    data = (data << 8) | u32::from(key[j]);
                    j = (j + 1) % key.len();
                }
                bf.p[i] ^= data;
            }
        }

        let mut l = 0u32;
        let mut r = 0u32;

        for i in (0..ROUNDS + 2).step_by(2) {
            bf.encrypt_pair(&mut l, &mut r);
            bf.p[i] = l;
            bf.p[i + 1] = r;
        }

        for i in 0..4 {
            for j in (0..256).step_by(2) {
                bf.encrypt_pair(&mut l, &mut r);
                bf.s[i][j] = l;
                bf.s[i][j + 1] = r;
            }
        }

        bf
    }

    /// Encrypts `plaintext`, zero-padding the tail block.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let padded_len = plaintext.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        let mut data = vec![0u8; padded_len];
        data[..plaintext.len()].copy_from_slice(plaintext);

        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            let mut l = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
            let mut r = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);

            self.encrypt_pair(&mut l, &mut r);

            block[..4].copy_from_slice(&l.to_le_bytes());
            block[4..].copy_from_slice(&r.to_le_bytes());
        }

        data
    }

    fn f(&self, x: u32) -> u32 {
        let [a, b, c, d] = x.to_le_bytes();
        (self.s[0][d as usize].wrapping_add(self.s[1][c as usize]) ^ self.s[2][b as usize])
            .wrapping_add(self.s[3][a as usize])
    }

    fn encrypt_pair(&self, xl: &mut u32, xr: &mut u32) {
        for i in 0..ROUNDS {
            *xl ^= self.p[i];
            *xr ^= self.f(*xl);

            (*xl, *xr) = (*xr, *xl);
        }

        (*xl, *xr) = (*xr, *xl);

        *xr ^= self.p[ROUNDS];
        *xl ^= self.p[ROUNDS + 1];
    }
}

/// Stateless entry point: key bytes and plaintext in, ciphertext out.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Vec<u8> {
    Blowfish::new(key).encrypt(plaintext)
}
