//! Coded index encoding for cross-table references.
//!
//! A coded index packs a `(table, rid)` pair into a single value: the low
//! `tag_bits` select one member of a fixed table set, the remaining bits
//! carry the RID. Each column kind admits its own table set and order.
//!
//! # Reference
//! - [ECMA-335 II.24.2.6](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use strum::{EnumCount, EnumIter};

use crate::{metadata::tables::TableId, Error, Result};

/// The coded index kinds used by the tables this writer emits.
///
/// Each kind defines which tables a column of that kind can reference and
/// in which tag order. Encoding a table outside the kind's set is a fatal
/// build error: the graph placed an entity where the format cannot
/// represent it.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
pub enum CodedIndexType {
    /// References `TypeDef`, `TypeRef`, or `TypeSpec` tables.
    TypeDefOrRef,

    /// References `Field`, `Param`, or `Property` tables; parents of
    /// `Constant` rows.
    HasConstant,

    /// References any entity that can carry custom attributes.
    HasCustomAttribute,

    /// References `Field` or `Param` tables; parents of `FieldMarshal` rows.
    HasFieldMarshal,

    /// References `TypeDef`, `MethodDef`, or `Assembly` tables; parents of
    /// `DeclSecurity` rows.
    HasDeclSecurity,

    /// References the parent of a `MemberRef`: a type, a module ref, or a
    /// vararg method.
    MemberRefParent,

    /// References `Event` or `Property` tables; associations of
    /// `MethodSemantics` rows.
    HasSemantics,

    /// References `MethodDef` or `MemberRef` tables.
    MethodDefOrRef,

    /// References `Field` or `MethodDef` tables; parents of `ImplMap` rows.
    MemberForwarded,

    /// References `File`, `AssemblyRef`, or `ExportedType` tables; the
    /// location of an exported type or resource.
    Implementation,

    /// References the constructor of a custom attribute. Tags 0, 1, and 4
    /// are reserved by the standard; only `MethodDef` (2) and `MemberRef`
    /// (3) are encodable.
    CustomAttributeType,

    /// References `Module`, `ModuleRef`, `AssemblyRef`, or `TypeRef`
    /// tables; the scope a `TypeRef` resolves in.
    ResolutionScope,

    /// References `TypeDef` or `MethodDef` tables; owners of
    /// `GenericParam` rows.
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// The tables this coded index kind can reference, in tag order.
    ///
    /// For [`CodedIndexType::CustomAttributeType`] the returned slice only
    /// lists the encodable members; its tags are fixed by
    /// [`CodedIndexType::tag`] because the standard reserves slots 0, 1,
    /// and 4.
    #[must_use]
    pub fn tables(&self) -> &'static [TableId] {
        match self {
            CodedIndexType::TypeDefOrRef => {
                &[TableId::TypeDef, TableId::TypeRef, TableId::TypeSpec]
            }
            CodedIndexType::HasConstant => &[TableId::Field, TableId::Param, TableId::Property],
            CodedIndexType::HasCustomAttribute => &[
                TableId::MethodDef,
                TableId::Field,
                TableId::TypeRef,
                TableId::TypeDef,
                TableId::Param,
                TableId::InterfaceImpl,
                TableId::MemberRef,
                TableId::Module,
                TableId::DeclSecurity,
                TableId::Property,
                TableId::Event,
                TableId::StandAloneSig,
                TableId::ModuleRef,
                TableId::TypeSpec,
                TableId::Assembly,
                TableId::AssemblyRef,
                TableId::File,
                TableId::ExportedType,
                TableId::ManifestResource,
                TableId::GenericParam,
                TableId::GenericParamConstraint,
                TableId::MethodSpec,
            ],
            CodedIndexType::HasFieldMarshal => &[TableId::Field, TableId::Param],
            CodedIndexType::HasDeclSecurity => {
                &[TableId::TypeDef, TableId::MethodDef, TableId::Assembly]
            }
            CodedIndexType::MemberRefParent => &[
                TableId::TypeDef,
                TableId::TypeRef,
                TableId::ModuleRef,
                TableId::MethodDef,
                TableId::TypeSpec,
            ],
            CodedIndexType::HasSemantics => &[TableId::Event, TableId::Property],
            CodedIndexType::MethodDefOrRef => &[TableId::MethodDef, TableId::MemberRef],
            CodedIndexType::MemberForwarded => &[TableId::Field, TableId::MethodDef],
            CodedIndexType::Implementation => &[
                TableId::File,
                TableId::AssemblyRef,
                TableId::ExportedType,
            ],
            CodedIndexType::CustomAttributeType => &[TableId::MethodDef, TableId::MemberRef],
            CodedIndexType::ResolutionScope => &[
                TableId::Module,
                TableId::ModuleRef,
                TableId::AssemblyRef,
                TableId::TypeRef,
            ],
            CodedIndexType::TypeOrMethodDef => &[TableId::TypeDef, TableId::MethodDef],
        }
    }

    /// Number of low bits used for the tag.
    #[must_use]
    pub fn tag_bits(&self) -> u32 {
        match self {
            CodedIndexType::HasFieldMarshal
            | CodedIndexType::HasSemantics
            | CodedIndexType::MethodDefOrRef
            | CodedIndexType::MemberForwarded
            | CodedIndexType::TypeOrMethodDef => 1,
            CodedIndexType::TypeDefOrRef
            | CodedIndexType::HasConstant
            | CodedIndexType::HasDeclSecurity
            | CodedIndexType::Implementation
            | CodedIndexType::ResolutionScope => 2,
            CodedIndexType::MemberRefParent | CodedIndexType::CustomAttributeType => 3,
            CodedIndexType::HasCustomAttribute => 5,
        }
    }

    /// The tag value for `table` within this kind, or `None` if the kind
    /// cannot reference that table.
    #[must_use]
    pub fn tag(&self, table: TableId) -> Option<u32> {
        if matches!(self, CodedIndexType::CustomAttributeType) {
            // Slots 0, 1, and 4 are reserved (II.24.2.6).
            return match table {
                TableId::MethodDef => Some(2),
                TableId::MemberRef => Some(3),
                _ => None,
            };
        }

        #[allow(clippy::cast_possible_truncation)]
        self.tables()
            .iter()
            .position(|candidate| *candidate == table)
            .map(|position| position as u32)
    }

    /// Encodes a `(table, rid)` pair into this kind's coded form.
    ///
    /// # Errors
    /// Returns [`Error::CodedIndexTarget`] if `table` is not a member of
    /// this kind's table set.
    pub fn encode(&self, table: TableId, rid: u32) -> Result<u32> {
        let tag = self.tag(table).ok_or(Error::CodedIndexTarget {
            kind: *self,
            table,
        })?;
        Ok((rid << self.tag_bits()) | tag)
    }

    /// Decodes a coded value back into its `(table, rid)` pair.
    ///
    /// # Errors
    /// Returns [`Error::CodedIndexTarget`] if the tag does not name a
    /// member of this kind's table set.
    pub fn decode(&self, coded: u32) -> Result<(TableId, u32)> {
        let tag = coded & ((1 << self.tag_bits()) - 1);
        let rid = coded >> self.tag_bits();

        if matches!(self, CodedIndexType::CustomAttributeType) {
            return match tag {
                2 => Ok((TableId::MethodDef, rid)),
                3 => Ok((TableId::MemberRef, rid)),
                _ => Err(Error::CodedIndexTarget {
                    kind: *self,
                    table: TableId::Module,
                }),
            };
        }

        match self.tables().get(tag as usize) {
            Some(table) => Ok((*table, rid)),
            None => Err(Error::CodedIndexTarget {
                kind: *self,
                table: TableId::Module,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn typedef_or_ref_tags() {
        let kind = CodedIndexType::TypeDefOrRef;
        assert_eq!(kind.encode(TableId::TypeDef, 5).unwrap(), 5 << 2);
        assert_eq!(kind.encode(TableId::TypeRef, 5).unwrap(), (5 << 2) | 1);
        assert_eq!(kind.encode(TableId::TypeSpec, 5).unwrap(), (5 << 2) | 2);
    }

    #[test]
    fn rejects_foreign_table() {
        let result = CodedIndexType::TypeDefOrRef.encode(TableId::Field, 1);
        assert!(matches!(
            result,
            Err(Error::CodedIndexTarget {
                kind: CodedIndexType::TypeDefOrRef,
                table: TableId::Field,
            })
        ));
    }

    #[test]
    fn custom_attribute_type_reserved_slots() {
        let kind = CodedIndexType::CustomAttributeType;
        assert_eq!(kind.encode(TableId::MethodDef, 1).unwrap(), (1 << 3) | 2);
        assert_eq!(kind.encode(TableId::MemberRef, 1).unwrap(), (1 << 3) | 3);
        assert!(kind.encode(TableId::TypeRef, 1).is_err());
    }

    #[test]
    fn has_custom_attribute_width() {
        let kind = CodedIndexType::HasCustomAttribute;
        assert_eq!(kind.tables().len(), 22);
        assert_eq!(kind.tag_bits(), 5);
        assert_eq!(
            kind.encode(TableId::GenericParam, 3).unwrap(),
            (3 << 5) | 19
        );
    }

    #[test]
    fn roundtrip_all_kinds() {
        for kind in CodedIndexType::iter() {
            for table in kind.tables() {
                let coded = kind.encode(*table, 42).unwrap();
                assert_eq!(kind.decode(coded).unwrap(), (*table, 42), "{kind:?}");
            }
        }
    }

    #[test]
    fn decode_reserved_custom_attribute_tag() {
        assert!(CodedIndexType::CustomAttributeType.decode(1 << 3).is_err());
    }

    #[test]
    fn tag_bits_cover_table_count() {
        for kind in CodedIndexType::iter() {
            let max_tag = match kind {
                CodedIndexType::CustomAttributeType => 3,
                _ => kind.tables().len() as u32 - 1,
            };
            assert!(max_tag < (1 << kind.tag_bits()), "{kind:?}");
        }
    }
}
