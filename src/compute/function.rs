//! Block function evaluation.
//!
//! Operands are widened to `u16` before arithmetic so that only `Sum` wraps.

use crate::schema::Function;

const MAX: u16 = u8::MAX as u16;

impl Function {
    /// Evaluate the function on two 8-bit operands.
    ///
    /// Unary functions ignore `y`.
    #[inline]
    pub fn eval(self, x: u8, y: u8) -> u8 {
        let (x, y) = (x as u16, y as u16);
        let out = match self {
            Function::MaxVal => MAX,
            Function::Identity => x,
            Function::Inversion => MAX - x,
            Function::BitOr => x | y,
            Function::BitOrWithInverse => (MAX - x) | y,
            Function::BitAnd => x & y,
            Function::InversionOfBitAnd => MAX - (x & y),
            Function::Xor => x ^ y,
            Function::DividingByTwo => x >> 1,
            Function::DividingByFour => x >> 2,
            Function::MultipleDivideAndOr => ((x << 4) | (y >> 4)) & MAX,
            Function::Sum => (x + y) & MAX,
            Function::SumWithSaturation => (x + y).min(MAX),
            Function::IntAvg => (x + y) >> 1,
            Function::Max => x.max(y),
            Function::Min => x.min(y),
            Function::Damaged => 0,
        };
        out as u8
    }
}
