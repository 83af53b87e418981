//! The input module model.
//!
//! A build consumes one [`ModuleDef`]: a rooted graph of type definitions,
//! members, references, and resources. The host constructs the graph
//! leaf-first, shares entities through `Arc`, and never mutates them once
//! the build starts. Deduplicated reference entities (`TypeRef`,
//! `MemberRef`, ...) are identified by `Arc` pointer identity; handing the
//! same `Arc` to two places yields a single metadata row.
//!
//! Member lists use `Vec<Option<...>>` so a graph produced from a damaged
//! source can carry holes; the builder warns about each hole and skips it.
//!
//! Cross-reference seams are sum types mirroring the coded index kinds
//! that will encode them: [`TypeDefOrRef`], [`ResolutionScope`],
//! [`MemberRefParent`], [`MethodDefOrRef`], [`ExportedTypeImpl`].

use std::sync::Arc;

use uuid::Uuid;

use crate::metadata::signatures::{
    FieldSig, GenericInstMethodSig, LocalVarSig, MethodSig, PropertySig, TypeSig,
};

/// Shared reference to a [`TypeDef`]
pub type TypeDefRc = Arc<TypeDef>;
/// Shared reference to a [`TypeRef`]
pub type TypeRefRc = Arc<TypeRef>;
/// Shared reference to a [`TypeSpec`]
pub type TypeSpecRc = Arc<TypeSpec>;
/// Shared reference to a [`FieldDef`]
pub type FieldRc = Arc<FieldDef>;
/// Shared reference to a [`MethodDef`]
pub type MethodRc = Arc<MethodDef>;
/// Shared reference to a [`ParamDef`]
pub type ParamRc = Arc<ParamDef>;
/// Shared reference to an [`EventDef`]
pub type EventRc = Arc<EventDef>;
/// Shared reference to a [`PropertyDef`]
pub type PropertyRc = Arc<PropertyDef>;
/// Shared reference to a [`MemberRef`]
pub type MemberRefRc = Arc<MemberRef>;
/// Shared reference to a [`ModuleRef`]
pub type ModuleRefRc = Arc<ModuleRef>;
/// Shared reference to an [`AssemblyRef`]
pub type AssemblyRefRc = Arc<AssemblyRef>;
/// Shared reference to a [`MethodSpec`]
pub type MethodSpecRc = Arc<MethodSpec>;
/// Shared reference to a [`StandAloneSig`]
pub type StandAloneSigRc = Arc<StandAloneSig>;
/// Shared reference to a [`FileDef`]
pub type FileRc = Arc<FileDef>;
/// Shared reference to an [`ExportedType`]
pub type ExportedTypeRc = Arc<ExportedType>;

/// The root of the input graph: one managed module.
#[derive(Debug, Clone, Default)]
pub struct ModuleDef {
    /// Module file name, e.g. `Lib.dll`
    pub name: String,
    /// Module version id; `None` writes GUID index 0
    pub mvid: Option<Uuid>,
    /// Edit-and-continue id, normally `None`
    pub enc_id: Option<Uuid>,
    /// Edit-and-continue base id, normally `None`
    pub enc_base_id: Option<Uuid>,
    /// Edit-and-continue generation, normally 0
    pub generation: u16,
    /// Assembly manifest when this module hosts one
    pub assembly: Option<AssemblyDef>,
    /// Top-level types in declaration order; index 0 must be the module's
    /// synthetic `<Module>` type
    pub types: Vec<TypeDefRc>,
    /// Manifest resources in declaration order
    pub resources: Vec<Resource>,
    /// Types this assembly exports from its other modules
    pub exported_types: Vec<ExportedTypeRc>,
    /// Custom attributes attached to the module
    pub custom_attributes: Vec<CustomAttribute>,
}

/// The assembly manifest of a module.
#[derive(Debug, Clone, Default)]
pub struct AssemblyDef {
    /// Hash algorithm id for file hashes, e.g. 0x8004 (SHA-1)
    pub hash_algorithm: u32,
    /// Assembly version
    pub version: Version,
    /// `AssemblyFlags` bitmask
    pub flags: u32,
    /// Full public key; empty when the assembly is not signed
    pub public_key: Vec<u8>,
    /// Assembly simple name, no extension
    pub name: String,
    /// Culture name; empty for culture-neutral
    pub culture: String,
    /// Declarative security attached to the assembly
    pub security: Vec<DeclSecurityDef>,
    /// Custom attributes attached to the assembly
    pub custom_attributes: Vec<CustomAttribute>,
}

/// A four-part assembly version number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Version {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
    /// Build number
    pub build: u16,
    /// Revision number
    pub revision: u16,
}

impl Version {
    /// Creates a version from its four components.
    #[must_use]
    pub fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Version {
            major,
            minor,
            build,
            revision,
        }
    }
}

/// A type defined in this module.
#[derive(Debug, Clone, Default)]
pub struct TypeDef {
    /// `TypeAttributes` bitmask
    pub flags: u32,
    /// Simple type name
    pub name: String,
    /// Namespace; empty for the global namespace
    pub namespace: String,
    /// Base type; `None` for interfaces and the `<Module>` type
    pub extends: Option<TypeDefOrRef>,
    /// Fields in declaration order; holes are warned about and skipped
    pub fields: Vec<Option<FieldRc>>,
    /// Methods in declaration order; holes are warned about and skipped
    pub methods: Vec<Option<MethodRc>>,
    /// Events in declaration order; holes are warned about and skipped
    pub events: Vec<Option<EventRc>>,
    /// Properties in declaration order; holes are warned about and skipped
    pub properties: Vec<Option<PropertyRc>>,
    /// Types nested inside this one, in declaration order
    pub nested_types: Vec<TypeDefRc>,
    /// Generic parameters in number order
    pub generic_params: Vec<GenericParamDef>,
    /// Implemented interfaces in declaration order
    pub interfaces: Vec<InterfaceImplDef>,
    /// Explicit layout, if any
    pub layout: Option<ClassLayoutDef>,
    /// Declarative security attached to the type
    pub security: Vec<DeclSecurityDef>,
    /// Custom attributes attached to the type
    pub custom_attributes: Vec<CustomAttribute>,
}

/// One implemented interface of a type.
#[derive(Debug, Clone)]
pub struct InterfaceImplDef {
    /// The implemented interface
    pub interface: TypeDefOrRef,
    /// Custom attributes attached to the implementation edge
    pub custom_attributes: Vec<CustomAttribute>,
}

/// Explicit packing and size of a type.
#[derive(Debug, Clone, Copy)]
pub struct ClassLayoutDef {
    /// Field packing alignment in bytes
    pub packing_size: u16,
    /// Total size in bytes, 0 to let the loader decide
    pub class_size: u32,
}

/// A generic parameter of a type or method.
#[derive(Debug, Clone, Default)]
pub struct GenericParamDef {
    /// Zero-based position in the owner's parameter list
    pub number: u16,
    /// `GenericParamAttributes` bitmask
    pub flags: u16,
    /// Parameter name
    pub name: String,
    /// Constraint types, in declaration order
    pub constraints: Vec<TypeDefOrRef>,
    /// Custom attributes attached to the parameter
    pub custom_attributes: Vec<CustomAttribute>,
}

/// A field of a type.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// `FieldAttributes` bitmask
    pub flags: u16,
    /// Field name
    pub name: String,
    /// Field signature
    pub signature: FieldSig,
    /// Explicit byte offset within the type, if the type uses explicit
    /// layout
    pub layout_offset: Option<u32>,
    /// Raw marshalling descriptor for interop, if any
    pub marshal: Option<Vec<u8>>,
    /// Initial data mapped at a fixed RVA, if any
    pub rva_data: Option<Vec<u8>>,
    /// Platform-invoke mapping, if the field is a pinvoke import
    pub impl_map: Option<ImplMapDef>,
    /// Compile-time constant, if any
    pub constant: Option<ConstantDef>,
    /// Custom attributes attached to the field
    pub custom_attributes: Vec<CustomAttribute>,
}

/// A method of a type.
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// `MethodAttributes` bitmask
    pub flags: u16,
    /// `MethodImplAttributes` bitmask
    pub impl_flags: u16,
    /// Method name
    pub name: String,
    /// Method signature
    pub signature: MethodSig,
    /// Parameter records in sequence order; holes are warned about and
    /// skipped. Records are optional per parameter, a method with no
    /// interesting parameter metadata carries an empty list.
    pub params: Vec<Option<ParamRc>>,
    /// Generic parameters in number order
    pub generic_params: Vec<GenericParamDef>,
    /// Explicit overrides this method declares
    pub overrides: Vec<MethodOverride>,
    /// Platform-invoke mapping, if the method is a pinvoke import
    pub impl_map: Option<ImplMapDef>,
    /// Declarative security attached to the method
    pub security: Vec<DeclSecurityDef>,
    /// Custom attributes attached to the method
    pub custom_attributes: Vec<CustomAttribute>,
}

/// An explicit method override edge.
#[derive(Debug, Clone)]
pub struct MethodOverride {
    /// The implementing method body
    pub body: MethodDefOrRef,
    /// The declaration being overridden
    pub declaration: MethodDefOrRef,
}

/// A parameter record of a method.
#[derive(Debug, Clone, Default)]
pub struct ParamDef {
    /// `ParamAttributes` bitmask
    pub flags: u16,
    /// 1-based parameter position; 0 names the return value
    pub sequence: u16,
    /// Parameter name
    pub name: String,
    /// Raw marshalling descriptor for interop, if any
    pub marshal: Option<Vec<u8>>,
    /// Compile-time default value, if any
    pub constant: Option<ConstantDef>,
    /// Custom attributes attached to the parameter
    pub custom_attributes: Vec<CustomAttribute>,
}

/// An event of a type.
#[derive(Debug, Clone, Default)]
pub struct EventDef {
    /// `EventAttributes` bitmask
    pub flags: u16,
    /// Event name
    pub name: String,
    /// Delegate type of the event
    pub event_type: Option<TypeDefOrRef>,
    /// Subscribe accessor
    pub add_method: Option<MethodRc>,
    /// Unsubscribe accessor
    pub remove_method: Option<MethodRc>,
    /// Raise accessor
    pub invoke_method: Option<MethodRc>,
    /// Additional accessors
    pub other_methods: Vec<MethodRc>,
    /// Custom attributes attached to the event
    pub custom_attributes: Vec<CustomAttribute>,
}

/// A property of a type.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    /// `PropertyAttributes` bitmask
    pub flags: u16,
    /// Property name
    pub name: String,
    /// Property signature
    pub signature: PropertySig,
    /// Getter accessor
    pub get_method: Option<MethodRc>,
    /// Setter accessor
    pub set_method: Option<MethodRc>,
    /// Additional accessors
    pub other_methods: Vec<MethodRc>,
    /// Compile-time default value, if any
    pub constant: Option<ConstantDef>,
    /// Custom attributes attached to the property
    pub custom_attributes: Vec<CustomAttribute>,
}

/// A platform-invoke mapping.
#[derive(Debug, Clone)]
pub struct ImplMapDef {
    /// `PInvokeAttributes` bitmask
    pub flags: u16,
    /// Entry point name in the target module
    pub import_name: String,
    /// The unmanaged module the entry point lives in
    pub import_scope: ModuleRefRc,
}

/// A declarative security record.
#[derive(Debug, Clone)]
pub struct DeclSecurityDef {
    /// Security action code
    pub action: u16,
    /// Encoded permission set
    pub permission_set: Vec<u8>,
    /// Custom attributes attached to the record
    pub custom_attributes: Vec<CustomAttribute>,
}

/// A compile-time constant with its declared element type.
#[derive(Debug, Clone)]
pub struct ConstantDef {
    /// Declared `ElementType` of the constant
    pub element_type: u8,
    /// The constant's value
    pub value: ConstantValue,
}

/// The value of a compile-time constant.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// System.Boolean
    Boolean(bool),
    /// System.Char, stored as its UTF-16 code unit
    Char(u16),
    /// System.SByte
    I1(i8),
    /// System.Byte
    U1(u8),
    /// System.Int16
    I2(i16),
    /// System.UInt16
    U2(u16),
    /// System.Int32
    I4(i32),
    /// System.UInt32
    U4(u32),
    /// System.Int64
    I8(i64),
    /// System.UInt64
    U8(u64),
    /// System.Single
    R4(f32),
    /// System.Double
    R8(f64),
    /// System.String
    String(String),
    /// A null reference
    Null,
}

/// A type defined outside this module.
#[derive(Debug, Clone)]
pub struct TypeRef {
    /// The scope the reference resolves in; `None` means the current
    /// module
    pub scope: Option<ResolutionScope>,
    /// Simple type name
    pub name: String,
    /// Namespace; empty for the global namespace
    pub namespace: String,
}

/// Where a [`TypeRef`] resolves.
#[derive(Debug, Clone)]
pub enum ResolutionScope {
    /// The current module
    Module,
    /// Another module of this assembly
    ModuleRef(ModuleRefRc),
    /// Another assembly
    AssemblyRef(AssemblyRefRc),
    /// The enclosing type, for references to nested types
    TypeRef(TypeRefRc),
}

/// A constructed type signature used as a type.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    /// The constructed type
    pub signature: TypeSig,
}

/// A reference to a type, definition or otherwise, as stored wherever a
/// `TypeDefOrRef` coded index will encode it.
#[derive(Debug, Clone)]
pub enum TypeDefOrRef {
    /// A type defined in this module
    TypeDef(TypeDefRc),
    /// A type defined elsewhere
    TypeRef(TypeRefRc),
    /// A constructed type
    TypeSpec(TypeSpecRc),
}

/// A reference to another module, used by platform invoke.
#[derive(Debug, Clone)]
pub struct ModuleRef {
    /// Referenced module name
    pub name: String,
    /// Custom attributes attached to the reference
    pub custom_attributes: Vec<CustomAttribute>,
}

/// A reference to another assembly.
#[derive(Debug, Clone, Default)]
pub struct AssemblyRef {
    /// Referenced assembly simple name
    pub name: String,
    /// Referenced assembly version
    pub version: Version,
    /// `AssemblyFlags` bitmask
    pub flags: u32,
    /// Full public key or its 8-byte token; empty for none
    pub public_key_or_token: Vec<u8>,
    /// Culture name; empty for culture-neutral
    pub culture: String,
    /// Hash of the referenced assembly; empty for none
    pub hash_value: Vec<u8>,
    /// Custom attributes attached to the reference
    pub custom_attributes: Vec<CustomAttribute>,
}

/// A member of an external or constructed type.
#[derive(Debug, Clone)]
pub struct MemberRef {
    /// The type or module the member belongs to
    pub parent: MemberRefParent,
    /// Member name
    pub name: String,
    /// Member signature
    pub signature: MemberRefSignature,
}

/// The parent of a [`MemberRef`].
#[derive(Debug, Clone)]
pub enum MemberRefParent {
    /// A type defined in this module
    TypeDef(TypeDefRc),
    /// A type defined elsewhere
    TypeRef(TypeRefRc),
    /// A module, for global members
    ModuleRef(ModuleRefRc),
    /// A method, for vararg call sites
    MethodDef(MethodRc),
    /// A constructed type
    TypeSpec(TypeSpecRc),
}

/// The signature of a [`MemberRef`]: method-shaped or field-shaped.
#[derive(Debug, Clone)]
pub enum MemberRefSignature {
    /// A method reference
    Method(MethodSig),
    /// A field reference
    Field(FieldSig),
}

/// A method definition or reference, as stored wherever a `MethodDefOrRef`
/// coded index will encode it.
#[derive(Debug, Clone)]
pub enum MethodDefOrRef {
    /// A method defined in this module
    MethodDef(MethodRc),
    /// A method referenced from elsewhere
    MemberRef(MemberRefRc),
}

/// A generic method instantiation.
#[derive(Debug, Clone)]
pub struct MethodSpec {
    /// The generic method being instantiated
    pub method: MethodDefOrRef,
    /// The type arguments
    pub instantiation: GenericInstMethodSig,
    /// Custom attributes attached to the instantiation
    pub custom_attributes: Vec<CustomAttribute>,
}

/// A standalone signature row: local variables or an indirect call site.
#[derive(Debug, Clone)]
pub struct StandAloneSig {
    /// The signature content
    pub signature: StandAloneSignature,
    /// Custom attributes attached to the row
    pub custom_attributes: Vec<CustomAttribute>,
}

/// Content of a [`StandAloneSig`].
#[derive(Debug, Clone)]
pub enum StandAloneSignature {
    /// A method's local variable layout
    LocalVars(LocalVarSig),
    /// A method signature for `calli`
    Method(MethodSig),
}

/// A file that belongs to this assembly.
#[derive(Debug, Clone)]
pub struct FileDef {
    /// `FileAttributes` bitmask
    pub flags: u32,
    /// File name
    pub name: String,
    /// Hash of the file contents
    pub hash_value: Vec<u8>,
    /// Custom attributes attached to the file record
    pub custom_attributes: Vec<CustomAttribute>,
}

/// A type this assembly exports from one of its other modules.
#[derive(Debug, Clone)]
pub struct ExportedType {
    /// `TypeAttributes` bitmask
    pub flags: u32,
    /// Hint: `TypeDef` RID of the type inside its defining file
    pub type_def_id: u32,
    /// Simple type name
    pub name: String,
    /// Namespace; empty for the global namespace
    pub namespace: String,
    /// Where the type's definition lives
    pub implementation: ExportedTypeImpl,
    /// Custom attributes attached to the export record
    pub custom_attributes: Vec<CustomAttribute>,
}

/// The location of an [`ExportedType`]'s definition.
#[derive(Debug, Clone)]
pub enum ExportedTypeImpl {
    /// A file of this assembly
    File(FileRc),
    /// A forwarded type in another assembly
    AssemblyRef(AssemblyRefRc),
    /// A nested type exported through its enclosing export record
    ExportedType(ExportedTypeRc),
}

/// A manifest resource.
#[derive(Debug, Clone)]
pub enum Resource {
    /// Resource bytes embedded in this image
    Embedded(EmbeddedResource),
    /// Resource living in another assembly
    AssemblyLinked(AssemblyLinkedResource),
    /// Resource living in another file of this assembly
    FileLinked(FileLinkedResource),
}

impl Resource {
    /// The resource's manifest name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Resource::Embedded(resource) => &resource.name,
            Resource::AssemblyLinked(resource) => &resource.name,
            Resource::FileLinked(resource) => &resource.name,
        }
    }
}

/// A resource embedded in this image.
#[derive(Debug, Clone)]
pub struct EmbeddedResource {
    /// Resource name
    pub name: String,
    /// `ManifestResourceAttributes` bitmask
    pub flags: u32,
    /// The resource bytes
    pub data: Vec<u8>,
    /// Custom attributes attached to the resource
    pub custom_attributes: Vec<CustomAttribute>,
}

/// A resource living in another assembly.
#[derive(Debug, Clone)]
pub struct AssemblyLinkedResource {
    /// Resource name
    pub name: String,
    /// `ManifestResourceAttributes` bitmask
    pub flags: u32,
    /// The assembly holding the resource
    pub assembly: AssemblyRefRc,
    /// Custom attributes attached to the resource
    pub custom_attributes: Vec<CustomAttribute>,
}

/// A resource living in another file of this assembly.
#[derive(Debug, Clone)]
pub struct FileLinkedResource {
    /// Resource name
    pub name: String,
    /// `ManifestResourceAttributes` bitmask
    pub flags: u32,
    /// The file holding the resource
    pub file: FileRc,
    /// Custom attributes attached to the resource
    pub custom_attributes: Vec<CustomAttribute>,
}

/// A custom attribute instance.
#[derive(Debug, Clone)]
pub struct CustomAttribute {
    /// The attribute constructor
    pub ctor: CustomAttributeCtor,
    /// Pre-encoded attribute arguments (II.23.3), stored verbatim
    pub value: Vec<u8>,
}

/// The constructor of a [`CustomAttribute`].
#[derive(Debug, Clone)]
pub enum CustomAttributeCtor {
    /// A constructor defined in this module
    MethodDef(MethodRc),
    /// A constructor referenced from elsewhere
    MemberRef(MemberRefRc),
}

/// Every entity kind the token service can answer for, plus literal
/// strings destined for the `#US` heap.
///
/// The service is an exhaustive match over this type; callers outside the
/// signature encoder (the IL body serializer above all) use it to turn
/// graph entities into metadata tokens.
#[derive(Debug, Clone)]
pub enum TokenProvider {
    /// A type defined in this module
    TypeDef(TypeDefRc),
    /// A type defined elsewhere
    TypeRef(TypeRefRc),
    /// A constructed type
    TypeSpec(TypeSpecRc),
    /// A field of a type in this module
    Field(FieldRc),
    /// A method of a type in this module
    MethodDef(MethodRc),
    /// A member of an external or constructed type
    MemberRef(MemberRefRc),
    /// A module reference
    ModuleRef(ModuleRefRc),
    /// An assembly reference
    AssemblyRef(AssemblyRefRc),
    /// A generic method instantiation
    MethodSpec(MethodSpecRc),
    /// A standalone signature
    StandAloneSig(StandAloneSigRc),
    /// An exported type
    ExportedType(ExportedTypeRc),
    /// A file of this assembly
    File(FileRc),
    /// A string literal, answered with a `#US` heap token
    UserString(String),
}
