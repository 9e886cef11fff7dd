//! Pixel combine functions.
//!
//! A transfer combines each source pixel with the destination pixel already
//! there. The source function optionally complements the source (as a
//! boolean, whatever the depth); the destination function then selects the
//! result. Four destination functions are encodable by `BITBLT`/`BITBLTX`,
//! all eight by `COLORBLT`; the decoders own those code tables.

/// Pre-combination source transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrcFunc {
    Identity,
    /// The effective source becomes `1` where the source pixel is 0 and `0`
    /// everywhere else, regardless of depth.
    Complement,
}

/// Destination combine rule, named by its defining expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstFunc {
    /// `src`
    Src,
    /// `dst if dst > 1 else src`. Kept exactly as the instruction set
    /// defines it; for 1-bit pixels `dst > 1` never holds, so it reduces
    /// to `src` there.
    SrcIfDstLe1,
    /// `dst if src == 0 else 0`
    DstIfSrc0,
    /// `src if dst != 0 else 0`
    SrcIfDstNe0,
    /// `src if src != 0 else dst`
    SrcIfNe0,
    /// `src if dst == 0 else dst`
    SrcIfDst0,
    /// Boolean XOR: the non-zero operand if exactly one is non-zero, else 0.
    PixelXor,
    /// Bitwise XOR of the color indices.
    IndexXor,
}

/// A (source-function, destination-function) pair, applied per pixel.
///
/// Pure value type with no shared state; independent operations may each
/// hold one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combiner {
    src_func: SrcFunc,
    dst_func: DstFunc,
}

impl Combiner {
    pub fn new(src_func: SrcFunc, dst_func: DstFunc) -> Self {
        Self { src_func, dst_func }
    }

    pub fn apply(self, src: u16, dst: u16) -> u16 {
        let s = match self.src_func {
            SrcFunc::Identity => src,
            SrcFunc::Complement => u16::from(src == 0),
        };
        match self.dst_func {
            DstFunc::Src => s,
            DstFunc::SrcIfDstLe1 => {
                if dst > 1 {
                    dst
                } else {
                    s
                }
            }
            DstFunc::DstIfSrc0 => {
                if s == 0 {
                    dst
                } else {
                    0
                }
            }
            DstFunc::SrcIfDstNe0 => {
                if dst != 0 {
                    s
                } else {
                    0
                }
            }
            DstFunc::SrcIfNe0 => {
                if s != 0 {
                    s
                } else {
                    dst
                }
            }
            DstFunc::SrcIfDst0 => {
                if dst == 0 {
                    s
                } else {
                    dst
                }
            }
            DstFunc::PixelXor => match (s != 0, dst != 0) {
                (true, false) => s,
                (false, true) => dst,
                _ => 0,
            },
            DstFunc::IndexXor => s ^ dst,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_DST: [DstFunc; 8] = [
        DstFunc::Src,
        DstFunc::SrcIfDstLe1,
        DstFunc::DstIfSrc0,
        DstFunc::SrcIfDstNe0,
        DstFunc::SrcIfNe0,
        DstFunc::SrcIfDst0,
        DstFunc::PixelXor,
        DstFunc::IndexXor,
    ];

    // Expected outputs over src,dst ∈ {0,1} with an identity source
    // function, indexed [dst_func][src][dst]. Written out by hand from the
    // instruction-set definitions.
    const TABLE: [[[u16; 2]; 2]; 8] = [
        [[0, 0], [1, 1]], // src
        [[0, 0], [1, 1]], // dst if dst>1 else src (degenerate at 1 bit)
        [[0, 1], [0, 0]], // dst if src==0 else 0
        [[0, 0], [0, 1]], // src if dst!=0 else 0
        [[0, 1], [1, 1]], // src if src!=0 else dst
        [[0, 1], [1, 1]], // src if dst==0 else dst
        [[0, 1], [1, 0]], // pixel xor
        [[0, 1], [1, 0]], // index xor
    ];

    #[test]
    fn truth_table_all_32_cases() {
        for (fi, &f) in ALL_DST.iter().enumerate() {
            for src in 0..2u16 {
                for dst in 0..2u16 {
                    let identity = Combiner::new(SrcFunc::Identity, f);
                    assert_eq!(
                        identity.apply(src, dst),
                        TABLE[fi][src as usize][dst as usize],
                        "{f:?} identity src={src} dst={dst}"
                    );
                    // Complement feeds the inverted bit through the same table.
                    let complement = Combiner::new(SrcFunc::Complement, f);
                    assert_eq!(
                        complement.apply(src, dst),
                        TABLE[fi][1 - src as usize][dst as usize],
                        "{f:?} complement src={src} dst={dst}"
                    );
                }
            }
        }
    }

    #[test]
    fn deep_pixels() {
        let c = |f| Combiner::new(SrcFunc::Identity, f);
        // dst>1 keeps the destination.
        assert_eq!(c(DstFunc::SrcIfDstLe1).apply(7, 5), 5);
        assert_eq!(c(DstFunc::SrcIfDstLe1).apply(7, 1), 7);
        // Boolean XOR keeps the single non-zero operand.
        assert_eq!(c(DstFunc::PixelXor).apply(3, 0), 3);
        assert_eq!(c(DstFunc::PixelXor).apply(0, 9), 9);
        assert_eq!(c(DstFunc::PixelXor).apply(3, 9), 0);
        // Index XOR is bitwise.
        assert_eq!(c(DstFunc::IndexXor).apply(0b0011, 0b0101), 0b0110);
        // Complement of a deep pixel is still a boolean.
        let k = Combiner::new(SrcFunc::Complement, DstFunc::Src);
        assert_eq!(k.apply(0xAB, 0), 0);
        assert_eq!(k.apply(0, 0), 1);
    }
}
