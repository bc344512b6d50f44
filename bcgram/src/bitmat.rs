use log::trace;

pub const BITS_PER_WORD: usize = 32;

// An M x N matrix of bits, in row-major form, with each row padded to a whole number of words.
#[derive(Clone)]
pub struct Bitmat {
    pub data: Vec<u32>,
    pub rows: usize,
    pub cols: usize,
    // Number of u32 elements per row
    pub rowsize: usize,
}

impl Bitmat {
    pub fn new(rows: usize, cols: usize) -> Bitmat {
        trace!("bitmat new: rows {} cols {}", rows, cols);
        let rowsize = word_size(cols);
        Bitmat {
            data: vec![0; rowsize * rows],
            rows,
            cols,
            rowsize,
        }
    }

    // r and c are row and column indices, not word offsets.
    pub fn set(&mut self, r: usize, c: usize) {
        assert!(r < self.rows);
        assert!(c < self.cols);
        self.data[r * self.rowsize + (c >> 5)] |= 1u32 << (c & 31);
    }

    #[cfg(test)]
    pub fn get(&self, r: usize, c: usize) -> bool {
        assert!(r < self.rows);
        assert!(c < self.cols);
        (self.data[r * self.rowsize + (c >> 5)] & (1u32 << (c & 31))) != 0
    }

    /// Gives the columns of row `r` that are set to 1.
    pub fn iter_ones_in_row(&self, r: usize) -> impl Iterator<Item = usize> + '_ {
        assert!(r < self.rows);
        let row = &self.data[r * self.rowsize..(r + 1) * self.rowsize];
        (0..self.cols).filter(move |&c| (row[c >> 5] >> (c & 31)) & 1 != 0)
    }
}

pub fn word_size(n: usize) -> usize {
    (n + (BITS_PER_WORD - 1)) / BITS_PER_WORD
}

impl core::fmt::Debug for Bitmat {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut dm = fmt.debug_map();
        for r in 0..self.rows {
            let ones: Vec<usize> = self.iter_ones_in_row(r).collect();
            if !ones.is_empty() {
                dm.entry(&r, &ones);
            }
        }
        dm.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_across_word_boundary() {
        let mut m = Bitmat::new(3, 40);
        m.set(0, 0);
        m.set(1, 31);
        m.set(1, 32);
        m.set(2, 39);
        assert!(m.get(0, 0));
        assert!(!m.get(0, 1));
        assert_eq!(m.iter_ones_in_row(1).collect::<Vec<_>>(), [31, 32]);
        assert_eq!(m.iter_ones_in_row(2).collect::<Vec<_>>(), [39]);
    }
}
