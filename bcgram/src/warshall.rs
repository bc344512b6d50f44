use crate::bitmat::{Bitmat, BITS_PER_WORD};

// Warshall's algorithm, a word at a time: whenever row j reaches column i, row j also reaches
// everything row i reaches.
fn transitive_closure(r: &mut Bitmat) {
    let n = r.rows;
    for i in 0..n {
        let word = i / BITS_PER_WORD;
        let bit = 1u32 << (i % BITS_PER_WORD);
        let rowi = i * r.rowsize;
        for j in 0..n {
            let rowj = j * r.rowsize;
            if r.data[rowj + word] & bit != 0 {
                for k in 0..r.rowsize {
                    let w = r.data[rowi + k];
                    r.data[rowj + k] |= w;
                }
            }
        }
    }
}

pub fn reflexive_transitive_closure(r: &mut Bitmat) {
    assert!(r.rows == r.cols);

    transitive_closure(r);

    // set diagonals
    for i in 0..r.rows {
        r.set(i, i);
    }
}
