//! Row schemas for the metadata tables this writer emits.
//!
//! A row is a plain column record; its RID is its 1-based position inside
//! the owning [`TableRows`](crate::metadata::tables::TableRows) vector.
//! Columns hold either small scalars, heap offsets (`#Strings`, `#GUID`,
//! `#Blob`), simple RIDs into a named table, or already-encoded coded
//! indices (see [`CodedIndexType`](crate::metadata::tables::CodedIndexType)).
//!
//! # Reference
//! - [ECMA-335 II.22](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Semantics flags linking an accessor method to its event or property
    pub struct MethodSemanticsAttributes : u16 {
        /// Property setter
        const SETTER = 0x0001;
        /// Property getter
        const GETTER = 0x0002;
        /// Other accessor of an event or property
        const OTHER = 0x0004;
        /// Event subscribe method
        const ADD_ON = 0x0008;
        /// Event unsubscribe method
        const REMOVE_ON = 0x0010;
        /// Event raise method
        const FIRE = 0x0020;
    }
}

/// Row of the `Module` table, `TableId` = 0x00
#[derive(Debug, Clone, Default)]
pub struct ModuleRow {
    /// Edit-and-continue generation, 0 for a normal build
    pub generation: u16,
    /// Module name, an index into the `#Strings` heap
    pub name: u32,
    /// Module version id, an index into the `#GUID` heap
    pub mvid: u32,
    /// Edit-and-continue id, an index into the `#GUID` heap
    pub enc_id: u32,
    /// Edit-and-continue base id, an index into the `#GUID` heap
    pub enc_base_id: u32,
}

/// Row of the `TypeRef` table, `TableId` = 0x01
#[derive(Debug, Clone, Default)]
pub struct TypeRefRow {
    /// `ResolutionScope` coded index of the scope the reference resolves in
    pub resolution_scope: u32,
    /// Type name, an index into the `#Strings` heap
    pub name: u32,
    /// Type namespace, an index into the `#Strings` heap
    pub namespace: u32,
}

/// Row of the `TypeDef` table, `TableId` = 0x02
#[derive(Debug, Clone, Default)]
pub struct TypeDefRow {
    /// A 4-byte bitmask of `TypeAttributes`
    pub flags: u32,
    /// Type name, an index into the `#Strings` heap
    pub name: u32,
    /// Type namespace, an index into the `#Strings` heap
    pub namespace: u32,
    /// `TypeDefOrRef` coded index of the base type, 0 for none
    pub extends: u32,
    /// RID of the first `Field` row owned by this type
    pub field_list: u32,
    /// RID of the first `MethodDef` row owned by this type
    pub method_list: u32,
}

/// Row of the `Field` table, `TableId` = 0x04
#[derive(Debug, Clone, Default)]
pub struct FieldRow {
    /// A 2-byte bitmask of `FieldAttributes`
    pub flags: u16,
    /// Field name, an index into the `#Strings` heap
    pub name: u32,
    /// Field signature, an index into the `#Blob` heap
    pub signature: u32,
}

/// Row of the `MethodDef` table, `TableId` = 0x06
#[derive(Debug, Clone, Default)]
pub struct MethodDefRow {
    /// Relative virtual address of the method body; filled in by the
    /// method-body writer, 0 while the tables are under construction
    pub rva: u32,
    /// A 2-byte bitmask of `MethodImplAttributes`
    pub impl_flags: u16,
    /// A 2-byte bitmask of `MethodAttributes`
    pub flags: u16,
    /// Method name, an index into the `#Strings` heap
    pub name: u32,
    /// Method signature, an index into the `#Blob` heap
    pub signature: u32,
    /// RID of the first `Param` row owned by this method
    pub param_list: u32,
}

/// Row of the `Param` table, `TableId` = 0x08
#[derive(Debug, Clone, Default)]
pub struct ParamRow {
    /// A 2-byte bitmask of `ParamAttributes`
    pub flags: u16,
    /// 1-based parameter position, 0 for the return value
    pub sequence: u16,
    /// Parameter name, an index into the `#Strings` heap
    pub name: u32,
}

/// Row of the `InterfaceImpl` table, `TableId` = 0x09
#[derive(Debug, Clone, Default)]
pub struct InterfaceImplRow {
    /// RID of the implementing `TypeDef`
    pub class: u32,
    /// `TypeDefOrRef` coded index of the implemented interface
    pub interface: u32,
}

/// Row of the `MemberRef` table, `TableId` = 0x0A
#[derive(Debug, Clone, Default)]
pub struct MemberRefRow {
    /// `MemberRefParent` coded index of the owning type or module
    pub class: u32,
    /// Member name, an index into the `#Strings` heap
    pub name: u32,
    /// Member signature, an index into the `#Blob` heap
    pub signature: u32,
}

/// Row of the `Constant` table, `TableId` = 0x0B
#[derive(Debug, Clone, Default)]
pub struct ConstantRow {
    /// `ElementType` of the constant value; the padding byte that follows
    /// it on disk is always zero
    pub element_type: u8,
    /// `HasConstant` coded index of the owning field, param, or property
    pub parent: u32,
    /// Constant value bytes, an index into the `#Blob` heap
    pub value: u32,
}

/// Row of the `CustomAttribute` table, `TableId` = 0x0C
#[derive(Debug, Clone, Default)]
pub struct CustomAttributeRow {
    /// `HasCustomAttribute` coded index of the attributed entity
    pub parent: u32,
    /// `CustomAttributeType` coded index of the attribute constructor
    pub attribute_type: u32,
    /// Encoded attribute arguments, an index into the `#Blob` heap
    pub value: u32,
}

/// Row of the `FieldMarshal` table, `TableId` = 0x0D
#[derive(Debug, Clone, Default)]
pub struct FieldMarshalRow {
    /// `HasFieldMarshal` coded index of the owning field or param
    pub parent: u32,
    /// Marshalling descriptor, an index into the `#Blob` heap
    pub native_type: u32,
}

/// Row of the `DeclSecurity` table, `TableId` = 0x0E
#[derive(Debug, Clone, Default)]
pub struct DeclSecurityRow {
    /// Security action code
    pub action: u16,
    /// `HasDeclSecurity` coded index of the secured entity
    pub parent: u32,
    /// Permission set, an index into the `#Blob` heap
    pub permission_set: u32,
}

/// Row of the `ClassLayout` table, `TableId` = 0x0F
#[derive(Debug, Clone, Default)]
pub struct ClassLayoutRow {
    /// Field packing alignment in bytes
    pub packing_size: u16,
    /// Total type size in bytes, 0 to let the loader decide
    pub class_size: u32,
    /// RID of the `TypeDef` this layout belongs to
    pub parent: u32,
}

/// Row of the `FieldLayout` table, `TableId` = 0x10
#[derive(Debug, Clone, Default)]
pub struct FieldLayoutRow {
    /// Byte offset of the field within its type
    pub offset: u32,
    /// RID of the `Field` this layout belongs to
    pub field: u32,
}

/// Row of the `StandAloneSig` table, `TableId` = 0x11
#[derive(Debug, Clone, Default)]
pub struct StandAloneSigRow {
    /// Signature bytes, an index into the `#Blob` heap
    pub signature: u32,
}

/// Row of the `EventMap` table, `TableId` = 0x12
#[derive(Debug, Clone, Default)]
pub struct EventMapRow {
    /// RID of the `TypeDef` owning the events
    pub parent: u32,
    /// RID of the first `Event` row owned by the type
    pub event_list: u32,
}

/// Row of the `Event` table, `TableId` = 0x14
#[derive(Debug, Clone, Default)]
pub struct EventRow {
    /// A 2-byte bitmask of `EventAttributes`
    pub event_flags: u16,
    /// Event name, an index into the `#Strings` heap
    pub name: u32,
    /// `TypeDefOrRef` coded index of the delegate type, 0 for none
    pub event_type: u32,
}

/// Row of the `PropertyMap` table, `TableId` = 0x15
#[derive(Debug, Clone, Default)]
pub struct PropertyMapRow {
    /// RID of the `TypeDef` owning the properties
    pub parent: u32,
    /// RID of the first `Property` row owned by the type
    pub property_list: u32,
}

/// Row of the `Property` table, `TableId` = 0x17
#[derive(Debug, Clone, Default)]
pub struct PropertyRow {
    /// A 2-byte bitmask of `PropertyAttributes`
    pub flags: u16,
    /// Property name, an index into the `#Strings` heap
    pub name: u32,
    /// Property signature, an index into the `#Blob` heap
    pub signature: u32,
}

/// Row of the `MethodSemantics` table, `TableId` = 0x18
#[derive(Debug, Clone, Default)]
pub struct MethodSemanticsRow {
    /// A 2-byte bitmask of [`MethodSemanticsAttributes`]
    pub semantics: u16,
    /// RID of the accessor `MethodDef`
    pub method: u32,
    /// `HasSemantics` coded index of the owning event or property
    pub association: u32,
}

/// Row of the `MethodImpl` table, `TableId` = 0x19
#[derive(Debug, Clone, Default)]
pub struct MethodImplRow {
    /// RID of the `TypeDef` the override takes effect in
    pub class: u32,
    /// `MethodDefOrRef` coded index of the implementing method
    pub method_body: u32,
    /// `MethodDefOrRef` coded index of the overridden declaration
    pub method_declaration: u32,
}

/// Row of the `ModuleRef` table, `TableId` = 0x1A
#[derive(Debug, Clone, Default)]
pub struct ModuleRefRow {
    /// Referenced module name, an index into the `#Strings` heap
    pub name: u32,
}

/// Row of the `TypeSpec` table, `TableId` = 0x1B
#[derive(Debug, Clone, Default)]
pub struct TypeSpecRow {
    /// Type signature, an index into the `#Blob` heap
    pub signature: u32,
}

/// Row of the `ImplMap` table, `TableId` = 0x1C
#[derive(Debug, Clone, Default)]
pub struct ImplMapRow {
    /// A 2-byte bitmask of `PInvokeAttributes`
    pub mapping_flags: u16,
    /// `MemberForwarded` coded index of the forwarded field or method
    pub member_forwarded: u32,
    /// Import entry point name, an index into the `#Strings` heap
    pub import_name: u32,
    /// RID of the `ModuleRef` naming the target module
    pub import_scope: u32,
}

/// Row of the `FieldRVA` table, `TableId` = 0x1D
#[derive(Debug, Clone, Default)]
pub struct FieldRvaRow {
    /// Offset of the field's initial data inside the constants store; the
    /// PE writer turns it into a final RVA during layout
    pub rva: u32,
    /// RID of the `Field` the data belongs to
    pub field: u32,
}

/// Row of the `Assembly` table, `TableId` = 0x20
#[derive(Debug, Clone, Default)]
pub struct AssemblyRow {
    /// Hash algorithm used for file hashes
    pub hash_alg_id: u32,
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Build number
    pub build_number: u16,
    /// Revision number
    pub revision_number: u16,
    /// A 4-byte bitmask of `AssemblyFlags`
    pub flags: u32,
    /// Public key, an index into the `#Blob` heap
    pub public_key: u32,
    /// Assembly name without extension, an index into the `#Strings` heap
    pub name: u32,
    /// Culture name, an index into the `#Strings` heap
    pub culture: u32,
}

/// Row of the `AssemblyRef` table, `TableId` = 0x23
#[derive(Debug, Clone, Default)]
pub struct AssemblyRefRow {
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Build number
    pub build_number: u16,
    /// Revision number
    pub revision_number: u16,
    /// A 4-byte bitmask of `AssemblyFlags`
    pub flags: u32,
    /// Public key or its 8-byte token, an index into the `#Blob` heap
    pub public_key_or_token: u32,
    /// Referenced assembly name, an index into the `#Strings` heap
    pub name: u32,
    /// Culture name, an index into the `#Strings` heap
    pub culture: u32,
    /// Hash of the referenced assembly, an index into the `#Blob` heap
    pub hash_value: u32,
}

/// Row of the `File` table, `TableId` = 0x26
#[derive(Debug, Clone, Default)]
pub struct FileRow {
    /// A 4-byte bitmask of `FileAttributes`
    pub flags: u32,
    /// File name, an index into the `#Strings` heap
    pub name: u32,
    /// File content hash, an index into the `#Blob` heap
    pub hash_value: u32,
}

/// Row of the `ExportedType` table, `TableId` = 0x27
#[derive(Debug, Clone, Default)]
pub struct ExportedTypeRow {
    /// A 4-byte bitmask of `TypeAttributes`
    pub flags: u32,
    /// Hint: the `TypeDef` RID of the type inside the file that defines it
    pub type_def_id: u32,
    /// Type name, an index into the `#Strings` heap
    pub name: u32,
    /// Type namespace, an index into the `#Strings` heap
    pub namespace: u32,
    /// `Implementation` coded index locating the defining file or assembly
    pub implementation: u32,
}

/// Row of the `ManifestResource` table, `TableId` = 0x28
#[derive(Debug, Clone, Default)]
pub struct ManifestResourceRow {
    /// Byte offset of an embedded resource inside the resources store,
    /// 0 for linked resources
    pub offset: u32,
    /// A 4-byte bitmask of `ManifestResourceAttributes`
    pub flags: u32,
    /// Resource name, an index into the `#Strings` heap
    pub name: u32,
    /// `Implementation` coded index of the defining file or assembly,
    /// 0 for an embedded resource
    pub implementation: u32,
}

/// Row of the `NestedClass` table, `TableId` = 0x29
#[derive(Debug, Clone, Default)]
pub struct NestedClassRow {
    /// RID of the nested `TypeDef`
    pub nested_class: u32,
    /// RID of the enclosing `TypeDef`
    pub enclosing_class: u32,
}

/// Row of the `GenericParam` table, `TableId` = 0x2A
#[derive(Debug, Clone, Default)]
pub struct GenericParamRow {
    /// Zero-based position within the owner's generic parameter list
    pub number: u16,
    /// A 2-byte bitmask of `GenericParamAttributes`
    pub flags: u16,
    /// `TypeOrMethodDef` coded index of the owning type or method
    pub owner: u32,
    /// Generic parameter name, an index into the `#Strings` heap
    pub name: u32,
}

/// Row of the `MethodSpec` table, `TableId` = 0x2B
#[derive(Debug, Clone, Default)]
pub struct MethodSpecRow {
    /// `MethodDefOrRef` coded index of the instantiated generic method
    pub method: u32,
    /// Instantiation signature, an index into the `#Blob` heap
    pub instantiation: u32,
}

/// Row of the `GenericParamConstraint` table, `TableId` = 0x2C
#[derive(Debug, Clone, Default)]
pub struct GenericParamConstraintRow {
    /// RID of the constrained `GenericParam`
    pub owner: u32,
    /// `TypeDefOrRef` coded index of the constraint type
    pub constraint: u32,
}
