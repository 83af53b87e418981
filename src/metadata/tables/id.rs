use strum::{EnumCount, EnumIter};

/// Identifiers of the metadata tables this writer emits.
///
/// Discriminants are the ECMA-335 table numbers (II.22); the table number is
/// also the high byte of a metadata token referencing a row of that table.
#[derive(Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Copy, EnumIter, EnumCount)]
#[repr(u8)]
pub enum TableId {
    /// Current module identity. One row per image.
    Module = 0x00,
    /// Types defined in other modules or assemblies.
    TypeRef = 0x01,
    /// Types defined in this module.
    TypeDef = 0x02,
    /// Fields of the types in this module.
    Field = 0x04,
    /// Methods of the types in this module.
    MethodDef = 0x06,
    /// Parameters of the methods in this module.
    Param = 0x08,
    /// Interface implementations declared by types.
    InterfaceImpl = 0x09,
    /// Members (fields or methods) of external or constructed types.
    MemberRef = 0x0A,
    /// Compile-time constants of fields, params, and properties.
    Constant = 0x0B,
    /// Custom attributes attached to any attributable entity.
    CustomAttribute = 0x0C,
    /// Interop marshalling descriptors for fields and params.
    FieldMarshal = 0x0D,
    /// Declarative security attached to types, methods, or the assembly.
    DeclSecurity = 0x0E,
    /// Explicit packing and size for types.
    ClassLayout = 0x0F,
    /// Explicit byte offsets for fields.
    FieldLayout = 0x10,
    /// Standalone signatures (local variables, indirect calls).
    StandAloneSig = 0x11,
    /// Maps a type to its run of `Event` rows.
    EventMap = 0x12,
    /// Events of the types in this module.
    Event = 0x14,
    /// Maps a type to its run of `Property` rows.
    PropertyMap = 0x15,
    /// Properties of the types in this module.
    Property = 0x17,
    /// Links events and properties to their accessor methods.
    MethodSemantics = 0x18,
    /// Explicit method overrides.
    MethodImpl = 0x19,
    /// Modules referenced for platform invoke.
    ModuleRef = 0x1A,
    /// Constructed type signatures (arrays, generic instantiations, ...).
    TypeSpec = 0x1B,
    /// Platform-invoke mappings of fields and methods.
    ImplMap = 0x1C,
    /// Fields with initial data at a fixed RVA.
    FieldRVA = 0x1D,
    /// Assembly manifest of this module, if it hosts one.
    Assembly = 0x20,
    /// Assemblies referenced by this module.
    AssemblyRef = 0x23,
    /// Files belonging to this assembly.
    File = 0x26,
    /// Types exported from other modules of this assembly.
    ExportedType = 0x27,
    /// Resources declared by the assembly manifest.
    ManifestResource = 0x28,
    /// Nesting edges between types.
    NestedClass = 0x29,
    /// Generic parameters of types and methods.
    GenericParam = 0x2A,
    /// Generic method instantiations.
    MethodSpec = 0x2B,
    /// Constraints on generic parameters.
    GenericParamConstraint = 0x2C,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn discriminants_match_ecma_numbers() {
        assert_eq!(TableId::Module as u8, 0x00);
        assert_eq!(TableId::TypeDef as u8, 0x02);
        assert_eq!(TableId::MethodDef as u8, 0x06);
        assert_eq!(TableId::GenericParamConstraint as u8, 0x2C);
    }

    #[test]
    fn table_numbers_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for id in TableId::iter() {
            assert!(seen.insert(id as u8), "{id:?} reuses a table number");
        }
    }
}
