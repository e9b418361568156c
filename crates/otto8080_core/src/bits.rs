//! Small bit-level helpers shared by the ALU and the decoder.

/// Combine two bytes into a 16-bit word, `hi` in the upper half.
#[inline]
pub fn combine(hi: u8, lo: u8) -> u16 {
    (u16::from(hi) << 8) | u16::from(lo)
}

/// True iff `value` has an even number of set bits.
///
/// This is the 8080 parity flag convention: parity is *set* for even
/// populations, including zero.
#[inline]
pub fn parity(value: u8) -> bool {
    value.count_ones() % 2 == 0
}

/// True iff adding `a` and `b` carries out of bit `bit - 1` into bit `bit`.
///
/// The Auxiliary-Carry flag is `half_carry(4, ..)` on the two 8-bit operands
/// of the addition in progress.
#[inline]
pub fn half_carry(bit: u8, a: u8, b: u8) -> bool {
    let sum = u16::from(a) + u16::from(b);
    let carries = sum ^ u16::from(a) ^ u16::from(b);
    carries & (1 << bit) != 0
}
