//! CG (code-generator) types: the semantic type model distinct from the
//! AST's syntactic `TypeSpec`/`Declarator` trees (§3, §4.3).

use crate::sema::records::{EnumId, RecordId};

/// The elementary scalar types. Width/sign live on the type itself rather
/// than depending on host-platform `int`/`long` sizes, since the target
/// (Z80) fixes them independent of the implementation language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementaryType {
    Void,
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    /// The result type of relational/logical operators before any
    /// assignment to an actual variable: always `0` or `1`.
    Logic,
    VaList,
}

impl ElementaryType {
    /// Integer rank per §4.3: `char < short < int < long < longlong`.
    /// Returns `None` for `void`/`logic`/`va_list`, which never
    /// participate in the usual arithmetic conversion.
    pub fn rank(self) -> Option<u8> {
        use ElementaryType::*;
        Some(match self {
            Bool | Char | SChar | UChar => 0,
            Short | UShort => 1,
            Int | UInt => 2,
            Long | ULong => 3,
            LongLong | ULongLong => 4,
            Void | Logic | VaList => return None,
        })
    }

    pub fn is_unsigned(self) -> bool {
        use ElementaryType::*;
        matches!(self, Bool | UChar | UShort | UInt | ULong | ULongLong)
    }

    pub fn is_integer(self) -> bool {
        self.rank().is_some()
    }

    /// The signed/unsigned counterpart at the same rank.
    pub fn with_sign(self, unsigned: bool) -> ElementaryType {
        use ElementaryType::*;
        match (self.rank(), unsigned) {
            (Some(0), false) => Char,
            (Some(0), true) => UChar,
            (Some(1), false) => Short,
            (Some(1), true) => UShort,
            (Some(2), false) => Int,
            (Some(2), true) => UInt,
            (Some(3), false) => Long,
            (Some(3), true) => ULong,
            (Some(4), false) => LongLong,
            (Some(4), true) => ULongLong,
            _ => self,
        }
    }

    /// Width in bits on the Z80 target: `char`=8, `short`/`int`=16,
    /// `long`/`long long`=32. Pointers and `va_list` are 16 bits (a Z80
    /// address).
    pub fn width_bits(self) -> u32 {
        use ElementaryType::*;
        match self {
            Void => 0,
            Bool | Char | SChar | UChar | Logic => 8,
            Short | UShort | Int | UInt => 16,
            Long | ULong | LongLong | ULongLong => 32,
            VaList => 16,
        }
    }
}

pub const POINTER_WIDTH_BITS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CgType {
    Basic(ElementaryType),
    Pointer(Box<CgType>),
    Func {
        ret: Box<CgType>,
        args: Vec<CgType>,
        variadic: bool,
    },
    Record(RecordId),
    Enum(EnumId),
    Array {
        element: Box<CgType>,
        size: Option<u64>,
    },
}

impl CgType {
    pub fn is_pointer(&self) -> bool {
        matches!(self, CgType::Pointer(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, CgType::Basic(e) if e.is_integer())
            || matches!(self, CgType::Enum(_))
    }

    pub fn is_arithmetic(&self) -> bool {
        self.is_integer()
    }

    /// Array-to-pointer / function-to-pointer decay on use, per §4.3.
    /// Returns the decayed type, or a clone of `self` if no decay applies.
    pub fn decay(&self) -> CgType {
        match self {
            CgType::Array { element, .. } => CgType::Pointer(element.clone()),
            CgType::Func { .. } => CgType::Pointer(Box::new(self.clone())),
            other => other.clone(),
        }
    }

    pub fn width_bits(&self, records: &crate::sema::records::RecordTable) -> u32 {
        match self {
            CgType::Basic(e) => e.width_bits(),
            CgType::Pointer(_) => POINTER_WIDTH_BITS,
            CgType::Func { .. } => POINTER_WIDTH_BITS,
            CgType::Enum(_) => ElementaryType::Int.width_bits(),
            CgType::Array { element, size } => {
                element.width_bits(records) * size.unwrap_or(0) as u32
            }
            CgType::Record(id) => records.get(*id).map(|r| r.size_bits(records)).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::records::RecordTable;

    #[test]
    fn rank_orders_char_below_short_below_int_below_long_below_longlong() {
        assert!(ElementaryType::Char.rank() < ElementaryType::Short.rank());
        assert!(ElementaryType::Short.rank() < ElementaryType::Int.rank());
        assert!(ElementaryType::Int.rank() < ElementaryType::Long.rank());
        assert!(ElementaryType::Long.rank() < ElementaryType::LongLong.rank());
    }

    #[test]
    fn void_logic_and_va_list_have_no_rank() {
        assert_eq!(ElementaryType::Void.rank(), None);
        assert_eq!(ElementaryType::Logic.rank(), None);
        assert_eq!(ElementaryType::VaList.rank(), None);
    }

    #[test]
    fn with_sign_round_trips_at_every_rank() {
        for (signed, unsigned) in [
            (ElementaryType::Char, ElementaryType::UChar),
            (ElementaryType::Short, ElementaryType::UShort),
            (ElementaryType::Int, ElementaryType::UInt),
            (ElementaryType::Long, ElementaryType::ULong),
            (ElementaryType::LongLong, ElementaryType::ULongLong),
        ] {
            assert_eq!(signed.with_sign(true), unsigned);
            assert_eq!(unsigned.with_sign(false), signed);
        }
    }

    #[test]
    fn array_and_function_types_decay_to_pointer_on_use() {
        let elem = CgType::Basic(ElementaryType::Int);
        let arr = CgType::Array {
            element: Box::new(elem.clone()),
            size: Some(4),
        };
        assert_eq!(arr.decay(), CgType::Pointer(Box::new(elem.clone())));

        let func = CgType::Func {
            ret: Box::new(elem.clone()),
            args: vec![],
            variadic: false,
        };
        assert_eq!(func.decay(), CgType::Pointer(Box::new(func.clone())));

        // A plain scalar never decays.
        assert_eq!(elem.decay(), elem);
    }

    #[test]
    fn array_width_is_element_width_times_length() {
        let records = RecordTable::new();
        let arr = CgType::Array {
            element: Box::new(CgType::Basic(ElementaryType::Int)),
            size: Some(3),
        };
        assert_eq!(arr.width_bits(&records), 16 * 3);
    }

    #[test]
    fn pointer_and_function_widths_are_the_target_pointer_width() {
        let records = RecordTable::new();
        let ptr = CgType::Pointer(Box::new(CgType::Basic(ElementaryType::Char)));
        assert_eq!(ptr.width_bits(&records), POINTER_WIDTH_BITS);

        let func = CgType::Func {
            ret: Box::new(CgType::Basic(ElementaryType::Void)),
            args: vec![],
            variadic: false,
        };
        assert_eq!(func.width_bits(&records), POINTER_WIDTH_BITS);
    }
}
