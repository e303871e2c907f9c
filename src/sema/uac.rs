//! Integer promotion and the usual arithmetic conversion (§4.3, §8
//! scenario 6).

use crate::sema::types::ElementaryType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UacFlag {
    Mix2u,
    Neg2u,
    EnumToInt,
    EnumIncompat,
    EnumNonEnum,
    Signed,
    NegativeConst,
}

/// Rank-below-`int` types promote to `int`, except that a type whose
/// values `int` cannot all represent promotes to `unsigned int` instead.
/// On this target `short`/`unsigned short` are the same width as `int`,
/// so `unsigned short` promotes to `unsigned int`.
pub fn integer_promote(e: ElementaryType) -> ElementaryType {
    use ElementaryType::*;
    match e {
        Bool | Char | SChar => Int,
        UChar => Int,
        Short => Int,
        UShort => {
            if UShort.width_bits() < Int.width_bits() {
                Int
            } else {
                UInt
            }
        }
        other => other,
    }
}

/// Computes the common type for a binary arithmetic operation on two
/// (already-promoted) integer operands, per the five rules of §4.3, plus
/// the side-channel flags that surface as warnings.
pub fn uac(a: ElementaryType, b: ElementaryType) -> (ElementaryType, Vec<UacFlag>) {
    let mut flags = Vec::new();
    let a = integer_promote(a);
    let b = integer_promote(b);

    if a == b {
        return (a, flags);
    }

    let (ra, rb) = (a.rank().unwrap_or(0), b.rank().unwrap_or(0));
    let (ua, ub) = (a.is_unsigned(), b.is_unsigned());

    if ua == ub {
        return (if ra >= rb { a } else { b }, flags);
    }

    let (unsigned_ty, unsigned_rank, signed_ty, signed_rank) = if ua {
        (a, ra, b, rb)
    } else {
        (b, rb, a, ra)
    };

    if unsigned_rank >= signed_rank {
        flags.push(UacFlag::Mix2u);
        return (unsigned_ty, flags);
    }
    if signed_rank > unsigned_rank && signed_can_represent_all_of(signed_ty, unsigned_ty) {
        return (signed_ty, flags);
    }
    flags.push(UacFlag::Neg2u);
    (signed_ty.with_sign(true), flags)
}

fn signed_can_represent_all_of(signed_ty: ElementaryType, unsigned_ty: ElementaryType) -> bool {
    signed_ty.width_bits() > unsigned_ty.width_bits()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ElementaryType::*;

    #[test]
    fn same_sign_picks_higher_rank() {
        let (t, flags) = uac(UShort, Int);
        assert_eq!(t, Int);
        assert!(flags.is_empty());
    }

    #[test]
    fn unsigned_rank_at_least_signed_rank_wins_with_warning() {
        let (t, flags) = uac(UInt, Long.with_sign(false));
        // UInt rank 2 < Long rank 3, and Long can represent all UInt
        // values on this target (32 > 16 bits), so plain Long wins.
        assert_eq!(t, Long);
        assert!(flags.is_empty());
    }

    #[test]
    fn equal_width_unsigned_and_signed_prefers_unsigned_with_warning() {
        let (t, flags) = uac(UInt, Int);
        assert_eq!(t, UInt);
        assert_eq!(flags, vec![UacFlag::Mix2u]);
    }
}
