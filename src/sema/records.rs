//! Record (struct/union) and enum definitions, keyed by C identifier, with
//! bitfield storage-unit packing (§3, §4.3).

use crate::sema::types::{CgType, ElementaryType};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumId(pub usize);

#[derive(Debug, Clone, Copy)]
pub struct BitfieldInfo {
    pub storage_unit: u32,
    pub bit_position: u32,
    pub bit_width: u32,
}

#[derive(Debug, Clone)]
pub struct Member {
    pub name: Option<String>,
    pub ty: CgType,
    pub bitfield: Option<BitfieldInfo>,
}

#[derive(Debug, Clone)]
pub struct RecordDef {
    pub is_union: bool,
    pub c_ident: Option<String>,
    pub ir_ident: String,
    pub defining: bool,
    pub members: Vec<Member>,
}

impl RecordDef {
    /// Storage units are packed back-to-back (unions alias every member at
    /// offset zero instead); this is a simplified layout rule, not a
    /// Z80-ABI-accurate one, since target ABI layout is out of scope.
    pub fn size_bits(&self, records: &RecordTable) -> u32 {
        if self.is_union {
            return self
                .members
                .iter()
                .map(|m| m.ty.width_bits(records))
                .max()
                .unwrap_or(0);
        }
        let mut total = 0u32;
        let mut last_unit: Option<u32> = None;
        for m in &self.members {
            match m.bitfield {
                Some(bf) if last_unit == Some(bf.storage_unit) => {}
                Some(_) => total += m.ty.width_bits(records),
                None => total += m.ty.width_bits(records),
            }
            last_unit = m.bitfield.map(|bf| bf.storage_unit);
        }
        total
    }
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub c_ident: Option<String>,
    pub defining: bool,
    pub members: Vec<(String, i64)>,
}

#[derive(Debug, Default)]
pub struct RecordTable {
    records: Vec<RecordDef>,
    by_name: HashMap<String, RecordId>,
    anon_counter: u32,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: RecordId) -> Option<&RecordDef> {
        self.records.get(id.0)
    }

    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut RecordDef> {
        self.records.get_mut(id.0)
    }

    pub fn lookup(&self, c_ident: &str) -> Option<RecordId> {
        self.by_name.get(c_ident).copied()
    }

    /// Finds the existing forward-declared entry for `c_ident`, or
    /// allocates a fresh one (anonymous if `c_ident` is `None`, with a
    /// synthetic `record_N` IR identifier).
    pub fn declare(&mut self, is_union: bool, c_ident: Option<&str>) -> RecordId {
        if let Some(name) = c_ident {
            if let Some(&id) = self.by_name.get(name) {
                return id;
            }
        }
        let ir_ident = match c_ident {
            Some(n) => n.to_string(),
            None => {
                let n = self.anon_counter;
                self.anon_counter += 1;
                format!("record_{n}")
            }
        };
        let id = RecordId(self.records.len());
        self.records.push(RecordDef {
            is_union,
            c_ident: c_ident.map(str::to_string),
            ir_ident,
            defining: false,
            members: Vec::new(),
        });
        if let Some(name) = c_ident {
            self.by_name.insert(name.to_string(), id);
        }
        id
    }
}

#[derive(Debug, Default)]
pub struct EnumTable {
    enums: Vec<EnumDef>,
    by_name: HashMap<String, EnumId>,
    anon_counter: u32,
}

impl EnumTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EnumId) -> Option<&EnumDef> {
        self.enums.get(id.0)
    }

    pub fn get_mut(&mut self, id: EnumId) -> Option<&mut EnumDef> {
        self.enums.get_mut(id.0)
    }

    pub fn lookup(&self, c_ident: &str) -> Option<EnumId> {
        self.by_name.get(c_ident).copied()
    }

    pub fn declare(&mut self, c_ident: Option<&str>) -> EnumId {
        if let Some(name) = c_ident {
            if let Some(&id) = self.by_name.get(name) {
                return id;
            }
        }
        let id = EnumId(self.enums.len());
        self.enums.push(EnumDef {
            c_ident: c_ident.map(str::to_string),
            defining: false,
            members: Vec::new(),
        });
        if let Some(name) = c_ident {
            self.by_name.insert(name.to_string(), id);
        }
        id
    }
}

/// Packs a run of member declarations (non-bitfields pass through
/// untouched) into storage units, per §4.3: a new unit begins on a
/// non-bitfield or when the current unit cannot fit the next bitfield.
/// `base_width` is the width in bits of the bitfield's declared base type
/// (e.g. `unsigned` ⇒ 16 on this target).
pub fn pack_bitfields(decls: &[(Option<String>, CgType, Option<u32>)]) -> Vec<Member> {
    let mut members = Vec::with_capacity(decls.len());
    let mut unit_id = 0u32;
    let mut cursor = 0u32;
    let mut unit_width = 0u32;

    for (name, ty, bit_width) in decls {
        match bit_width {
            None => {
                members.push(Member {
                    name: name.clone(),
                    ty: ty.clone(),
                    bitfield: None,
                });
                unit_id += 1;
                cursor = 0;
                unit_width = 0;
            }
            Some(w) => {
                let base_width = elementary_width(ty);
                if cursor == 0 {
                    unit_width = base_width;
                }
                if cursor + w > unit_width {
                    unit_id += 1;
                    cursor = 0;
                    unit_width = base_width;
                }
                members.push(Member {
                    name: name.clone(),
                    ty: ty.clone(),
                    bitfield: Some(BitfieldInfo {
                        storage_unit: unit_id,
                        bit_position: cursor,
                        bit_width: *w,
                    }),
                });
                cursor += w;
            }
        }
    }
    members
}

fn elementary_width(ty: &CgType) -> u32 {
    match ty {
        CgType::Basic(e) => e.width_bits(),
        _ => ElementaryType::Int.width_bits(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitfields_share_a_storage_unit_until_full() {
        let decls = vec![
            (Some("a".into()), CgType::Basic(ElementaryType::UInt), Some(3)),
            (Some("b".into()), CgType::Basic(ElementaryType::UInt), Some(5)),
            (Some("c".into()), CgType::Basic(ElementaryType::Int), None),
        ];
        let members = pack_bitfields(&decls);
        let a = members[0].bitfield.unwrap();
        let b = members[1].bitfield.unwrap();
        assert_eq!((a.storage_unit, a.bit_position, a.bit_width), (0, 0, 3));
        assert_eq!((b.storage_unit, b.bit_position, b.bit_width), (0, 3, 5));
        assert!(members[2].bitfield.is_none());
        assert!(a.bit_position + a.bit_width <= 16);
        assert!(b.bit_position + b.bit_width <= 16);
    }

    #[test]
    fn record_declare_is_idempotent_by_name() {
        let mut t = RecordTable::new();
        let a = t.declare(false, Some("s"));
        let b = t.declare(false, Some("s"));
        assert_eq!(a, b);
    }
}
