//! Signature model and blob encoding.
//!
//! Signatures describe the shape of types, fields, methods, properties,
//! and local variables as compact blobs (ECMA-335 II.23.2). The writer
//! models them as trees over module-graph entities; the encoder serializes
//! a tree to bytes, asking the token service for a `TypeDefOrRef` coded
//! index whenever a tree node references a type entity.

mod encoder;

pub use encoder::{
    encode_field_sig, encode_local_var_sig, encode_method_sig, encode_method_spec_sig,
    encode_property_sig, encode_type_sig, encode_typespec_sig, TokenService,
};

use crate::metadata::model::TypeDefOrRef;

/// Element type constants used throughout signature blobs.
///
/// ## References
/// - [ECMA-335 II.23.1.16](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)
#[allow(non_snake_case, dead_code, missing_docs)]
pub mod ELEMENT_TYPE {
    /// Marks the end of a list in signatures
    pub const END: u8 = 0x00;
    /// Void type (no return value)
    pub const VOID: u8 = 0x01;
    /// Boolean type (true/false)
    pub const BOOLEAN: u8 = 0x02;
    /// 16-bit Unicode character
    pub const CHAR: u8 = 0x03;
    /// Signed 8-bit integer
    pub const I1: u8 = 0x04;
    /// Unsigned 8-bit integer
    pub const U1: u8 = 0x05;
    /// Signed 16-bit integer
    pub const I2: u8 = 0x06;
    /// Unsigned 16-bit integer
    pub const U2: u8 = 0x07;
    /// Signed 32-bit integer
    pub const I4: u8 = 0x08;
    /// Unsigned 32-bit integer
    pub const U4: u8 = 0x09;
    /// Signed 64-bit integer
    pub const I8: u8 = 0x0a;
    /// Unsigned 64-bit integer
    pub const U8: u8 = 0x0b;
    /// 32-bit floating point
    pub const R4: u8 = 0x0c;
    /// 64-bit floating point
    pub const R8: u8 = 0x0d;
    /// String type
    pub const STRING: u8 = 0x0e;
    /// Unmanaged pointer (followed by type)
    pub const PTR: u8 = 0x0f;
    /// Managed reference (followed by type)
    pub const BYREF: u8 = 0x10;
    /// Value type (followed by a `TypeDefOrRef` coded index)
    pub const VALUETYPE: u8 = 0x11;
    /// Reference type (followed by a `TypeDefOrRef` coded index)
    pub const CLASS: u8 = 0x12;
    /// Generic parameter of a type (followed by its number)
    pub const VAR: u8 = 0x13;
    /// Multi-dimensional array with shape
    pub const ARRAY: u8 = 0x14;
    /// Generic type instantiation
    pub const GENERICINST: u8 = 0x15;
    /// Typed reference
    pub const TYPEDBYREF: u8 = 0x16;
    /// Native integer (System.IntPtr)
    pub const I: u8 = 0x18;
    /// Native unsigned integer (System.UIntPtr)
    pub const U: u8 = 0x19;
    /// Function pointer (followed by a full method signature)
    pub const FNPTR: u8 = 0x1b;
    /// System.Object
    pub const OBJECT: u8 = 0x1c;
    /// Single-dimension zero-based array
    pub const SZARRAY: u8 = 0x1d;
    /// Generic parameter of a method (followed by its number)
    pub const MVAR: u8 = 0x1e;
    /// Required custom modifier (followed by a `TypeDefOrRef` coded index)
    pub const CMOD_REQD: u8 = 0x1f;
    /// Optional custom modifier (followed by a `TypeDefOrRef` coded index)
    pub const CMOD_OPT: u8 = 0x20;
    /// Sentinel separating fixed and variadic arguments
    pub const SENTINEL: u8 = 0x41;
    /// Pinned local variable
    pub const PINNED: u8 = 0x45;
}

/// Calling convention bits of the leading signature byte.
///
/// ## References
/// - [ECMA-335 II.23.2.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)
#[allow(non_snake_case, dead_code, missing_docs)]
pub mod CALLING_CONVENTION {
    /// Default managed calling convention
    pub const DEFAULT: u8 = 0x00;
    /// Unmanaged cdecl
    pub const C: u8 = 0x01;
    /// Unmanaged stdcall
    pub const STDCALL: u8 = 0x02;
    /// Unmanaged thiscall
    pub const THISCALL: u8 = 0x03;
    /// Unmanaged fastcall
    pub const FASTCALL: u8 = 0x04;
    /// Managed variable-argument convention
    pub const VARARG: u8 = 0x05;
    /// The method has a generic parameter list
    pub const GENERIC: u8 = 0x10;
    /// The method has a `this` parameter
    pub const HASTHIS: u8 = 0x20;
    /// The `this` parameter is explicitly in the signature
    pub const EXPLICITTHIS: u8 = 0x40;
}

/// Leading bytes identifying non-method signature kinds.
#[allow(non_snake_case, dead_code, missing_docs)]
pub mod SIGNATURE_HEADER {
    /// Field signature prolog
    pub const FIELD: u8 = 0x06;
    /// Local variable signature prolog
    pub const LOCAL_SIG: u8 = 0x07;
    /// Property signature prolog (HASTHIS may be OR-ed in)
    pub const PROPERTY: u8 = 0x08;
    /// Generic method instantiation prolog
    pub const GENERIC_INST: u8 = 0x0A;
}

/// A required or optional custom modifier applied to a type.
#[derive(Debug, Clone)]
pub struct CustomModifier {
    /// True for `modreq`, false for `modopt`
    pub required: bool,
    /// The modifier type
    pub modifier: TypeDefOrRef,
}

/// A type as it appears inside a signature blob.
///
/// Where the on-disk encoding stores a `TypeDefOrRef` coded index, the
/// model stores the referenced entity; the encoder resolves it through the
/// token service at serialization time.
#[derive(Debug, Clone)]
pub enum TypeSig {
    /// No value (return types only)
    Void,
    /// System.Boolean
    Boolean,
    /// System.Char
    Char,
    /// System.SByte
    I1,
    /// System.Byte
    U1,
    /// System.Int16
    I2,
    /// System.UInt16
    U2,
    /// System.Int32
    I4,
    /// System.UInt32
    U4,
    /// System.Int64
    I8,
    /// System.UInt64
    U8,
    /// System.Single
    R4,
    /// System.Double
    R8,
    /// System.String
    String,
    /// System.Object
    Object,
    /// System.IntPtr
    I,
    /// System.UIntPtr
    U,
    /// System.TypedReference
    TypedByRef,
    /// A reference type
    Class(TypeDefOrRef),
    /// A value type
    ValueType(TypeDefOrRef),
    /// Unmanaged pointer to the inner type
    Ptr(Box<TypeSig>),
    /// Managed reference to the inner type
    ByRef(Box<TypeSig>),
    /// Single-dimension zero-based array of the inner type
    SzArray(Box<TypeSig>),
    /// Multi-dimensional array with explicit shape
    Array(ArraySig),
    /// Instantiation of a generic type
    GenericInst(GenericInstSig),
    /// Pointer to a function with the given signature
    FnPtr(Box<MethodSig>),
    /// Generic parameter of the enclosing type, by position
    Var(u32),
    /// Generic parameter of the enclosing method, by position
    MVar(u32),
    /// Pinned local variable type
    Pinned(Box<TypeSig>),
}

/// Shape of a multi-dimensional array (II.23.2.13).
#[derive(Debug, Clone)]
pub struct ArraySig {
    /// Element type
    pub element: Box<TypeSig>,
    /// Number of dimensions
    pub rank: u32,
    /// Declared sizes, one per leading dimension that has one
    pub sizes: Vec<u32>,
    /// Declared lower bounds, one per leading dimension that has one
    pub lower_bounds: Vec<i32>,
}

/// Instantiation of a generic type (II.23.2.14).
#[derive(Debug, Clone)]
pub struct GenericInstSig {
    /// The open generic type being instantiated
    pub base: TypeDefOrRef,
    /// True when the open type is a value type
    pub is_value_type: bool,
    /// Type arguments, one per generic parameter
    pub args: Vec<TypeSig>,
}

/// One parameter or return type slot of a method or property signature.
#[derive(Debug, Clone)]
pub struct ParamSig {
    /// Custom modifiers preceding the type
    pub modifiers: Vec<CustomModifier>,
    /// True when the slot is passed by managed reference
    pub by_ref: bool,
    /// The slot's type
    pub ty: TypeSig,
}

impl ParamSig {
    /// A plain by-value slot of the given type with no modifiers.
    #[must_use]
    pub fn new(ty: TypeSig) -> Self {
        ParamSig {
            modifiers: Vec::new(),
            by_ref: false,
            ty,
        }
    }
}

/// A method signature: calling convention, return type, parameters
/// (II.23.2.1).
#[derive(Debug, Clone)]
pub struct MethodSig {
    /// Low-nibble calling convention, one of the
    /// [`CALLING_CONVENTION`] kind constants
    pub call_conv: u8,
    /// True when the method has a `this` parameter
    pub has_this: bool,
    /// True when `this` appears explicitly in the parameter list
    pub explicit_this: bool,
    /// Number of generic parameters, 0 for a non-generic method
    pub generic_param_count: u32,
    /// Return type slot
    pub return_type: ParamSig,
    /// Fixed parameters
    pub params: Vec<ParamSig>,
    /// Variadic parameters after the sentinel; only meaningful for
    /// vararg call-site signatures
    pub params_after_sentinel: Vec<ParamSig>,
}

impl MethodSig {
    /// A static method with the default managed calling convention.
    #[must_use]
    pub fn new_static(return_type: TypeSig, params: Vec<TypeSig>) -> Self {
        MethodSig {
            call_conv: CALLING_CONVENTION::DEFAULT,
            has_this: false,
            explicit_this: false,
            generic_param_count: 0,
            return_type: ParamSig::new(return_type),
            params: params.into_iter().map(ParamSig::new).collect(),
            params_after_sentinel: Vec::new(),
        }
    }

    /// An instance method with the default managed calling convention.
    #[must_use]
    pub fn new_instance(return_type: TypeSig, params: Vec<TypeSig>) -> Self {
        MethodSig {
            has_this: true,
            ..Self::new_static(return_type, params)
        }
    }
}

/// A field signature (II.23.2.4).
#[derive(Debug, Clone)]
pub struct FieldSig {
    /// Custom modifiers preceding the field type
    pub modifiers: Vec<CustomModifier>,
    /// The field's type
    pub ty: TypeSig,
}

impl FieldSig {
    /// A field of the given type with no modifiers.
    #[must_use]
    pub fn new(ty: TypeSig) -> Self {
        FieldSig {
            modifiers: Vec::new(),
            ty,
        }
    }
}

/// A property signature (II.23.2.5).
#[derive(Debug, Clone)]
pub struct PropertySig {
    /// True for instance properties
    pub has_this: bool,
    /// Custom modifiers preceding the property type
    pub modifiers: Vec<CustomModifier>,
    /// The property's type
    pub ty: TypeSig,
    /// Index parameters, empty for a non-indexer
    pub params: Vec<ParamSig>,
}

impl PropertySig {
    /// An instance property of the given type with no index parameters.
    #[must_use]
    pub fn new_instance(ty: TypeSig) -> Self {
        PropertySig {
            has_this: true,
            modifiers: Vec::new(),
            ty,
            params: Vec::new(),
        }
    }
}

/// One local variable slot.
#[derive(Debug, Clone)]
pub struct LocalSig {
    /// Custom modifiers preceding the type
    pub modifiers: Vec<CustomModifier>,
    /// True for a pinned local
    pub pinned: bool,
    /// True for a by-reference local
    pub by_ref: bool,
    /// The local's type
    pub ty: TypeSig,
}

/// A local variable signature (II.23.2.6).
#[derive(Debug, Clone)]
pub struct LocalVarSig {
    /// The method's local variable slots, in order
    pub locals: Vec<LocalSig>,
}

/// A generic method instantiation signature (II.23.2.15).
#[derive(Debug, Clone)]
pub struct GenericInstMethodSig {
    /// Type arguments, one per generic parameter of the method
    pub args: Vec<TypeSig>,
}
