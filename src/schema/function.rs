//! Block function set for CGP circuits.
//!
//! Every block applies one of these two-input, 8-bit-output operators.
//! Evaluation lives in `compute::function`; this module only defines the
//! closed set and its numeric encoding in chromosomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Function applied by a single block.
///
/// The discriminant is the value stored in the function gene of a chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum Function {
    /// Constant 255.
    MaxVal = 0,
    /// `x`
    Identity = 1,
    /// `255 - x`
    Inversion = 2,
    /// `x | y`
    BitOr = 3,
    /// `(255 - x) | y`
    BitOrWithInverse = 4,
    /// `x & y`
    BitAnd = 5,
    /// `255 - (x & y)`
    InversionOfBitAnd = 6,
    /// `x ^ y`
    Xor = 7,
    /// `x >> 1`
    DividingByTwo = 8,
    /// `x >> 2`
    DividingByFour = 9,
    /// `(x << 4) | (y >> 4)`
    MultipleDivideAndOr = 10,
    /// `x + y` wrapping.
    Sum = 11,
    /// `x + y` saturating at 255.
    SumWithSaturation = 12,
    /// `(x + y) >> 1`
    IntAvg = 13,
    /// `max(x, y)`
    Max = 14,
    /// `min(x, y)`
    Min = 15,
    /// Disabled block, always 0. Never produced by random generation.
    Damaged = 16,
}

impl Function {
    /// Every function, in encoding order.
    pub const ALL: [Function; 17] = [
        Function::MaxVal,
        Function::Identity,
        Function::Inversion,
        Function::BitOr,
        Function::BitOrWithInverse,
        Function::BitAnd,
        Function::InversionOfBitAnd,
        Function::Xor,
        Function::DividingByTwo,
        Function::DividingByFour,
        Function::MultipleDivideAndOr,
        Function::Sum,
        Function::SumWithSaturation,
        Function::IntAvg,
        Function::Max,
        Function::Min,
        Function::Damaged,
    ];

    /// Functions that may be drawn when generating or mutating blocks.
    pub const GENERATABLE: [Function; 16] = [
        Function::MaxVal,
        Function::Identity,
        Function::Inversion,
        Function::BitOr,
        Function::BitOrWithInverse,
        Function::BitAnd,
        Function::InversionOfBitAnd,
        Function::Xor,
        Function::DividingByTwo,
        Function::DividingByFour,
        Function::MultipleDivideAndOr,
        Function::Sum,
        Function::SumWithSaturation,
        Function::IntAvg,
        Function::Max,
        Function::Min,
    ];

    /// Gene value of this function.
    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Decode a gene value.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Whether this is the damaged sentinel.
    #[inline]
    pub fn is_damaged(self) -> bool {
        self == Function::Damaged
    }

    /// Upper-case name as used in reports.
    pub fn name(self) -> &'static str {
        match self {
            Function::MaxVal => "MAX_VAL",
            Function::Identity => "IDENTITY",
            Function::Inversion => "INVERSION",
            Function::BitOr => "BIT_OR",
            Function::BitOrWithInverse => "BIT_OR_WITH_INVERSE",
            Function::BitAnd => "BIT_AND",
            Function::InversionOfBitAnd => "INVERSION_OF_BIT_AND",
            Function::Xor => "XOR",
            Function::DividingByTwo => "DIVIDING_BY_TWO",
            Function::DividingByFour => "DIVIDING_BY_FOUR",
            Function::MultipleDivideAndOr => "MULTIPLE_DIVIDE_AND_OR",
            Function::Sum => "SUM",
            Function::SumWithSaturation => "SUM_WITH_SATURATION",
            Function::IntAvg => "INT_AVG",
            Function::Max => "MAX",
            Function::Min => "MIN",
            Function::Damaged => "DAMAGED",
        }
    }
}

impl TryFrom<u32> for Function {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(code)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
