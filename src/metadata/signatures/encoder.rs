//! Signature blob encoders.
//!
//! Pure serializers: each function turns a signature tree into bytes which
//! the caller inserts into `#Blob`. Entity references are resolved through
//! the [`TokenService`] passed to every call; the service materializes the
//! referenced row on demand and answers with a `TypeDefOrRef` coded index,
//! which is written in the compressed form of II.23.2.8.

use crate::{
    metadata::{
        model::{TokenProvider, TypeDefOrRef},
        signatures::{
            ArraySig, CustomModifier, FieldSig, GenericInstMethodSig, LocalVarSig, MethodSig,
            ParamSig, PropertySig, TypeSig, CALLING_CONVENTION, ELEMENT_TYPE, SIGNATURE_HEADER,
        },
        token::Token,
    },
    utils::{write_compressed_int, write_compressed_uint},
    Error, Result,
};

/// Token creation service the builders expose to the signature encoder.
///
/// Both sides need mutual visibility but neither owns the other: the
/// builder hands itself to each encoding call, the encoder calls back for
/// every type reference it hits.
pub trait TokenService {
    /// Materializes `entity`'s row if it does not exist yet and returns its
    /// `TypeDefOrRef` coded index.
    ///
    /// # Errors
    /// Fails when the entity cannot be represented in this module's tables.
    fn encoded_typedef_or_ref(&mut self, entity: &TypeDefOrRef) -> Result<u32>;

    /// Returns the metadata token for any token-bearing entity, or a `#US`
    /// token for a string. Unsupported requests answer with
    /// [`Token::INVALID`] and record a warning.
    fn get_token(&mut self, provider: &TokenProvider) -> Token;
}

fn encode_modifiers(
    modifiers: &[CustomModifier],
    tokens: &mut dyn TokenService,
    buffer: &mut Vec<u8>,
) -> Result<()> {
    for modifier in modifiers {
        buffer.push(if modifier.required {
            ELEMENT_TYPE::CMOD_REQD
        } else {
            ELEMENT_TYPE::CMOD_OPT
        });
        let coded = tokens.encoded_typedef_or_ref(&modifier.modifier)?;
        write_compressed_uint(coded, buffer);
    }
    Ok(())
}

fn encode_param(
    param: &ParamSig,
    tokens: &mut dyn TokenService,
    buffer: &mut Vec<u8>,
) -> Result<()> {
    encode_modifiers(&param.modifiers, tokens, buffer)?;
    if param.by_ref {
        buffer.push(ELEMENT_TYPE::BYREF);
    }
    encode_type_sig(&param.ty, tokens, buffer)
}

/// Serializes one type node into `buffer` (II.23.2.12).
///
/// # Errors
/// Propagates token-service failures for entity references.
pub fn encode_type_sig(
    sig: &TypeSig,
    tokens: &mut dyn TokenService,
    buffer: &mut Vec<u8>,
) -> Result<()> {
    match sig {
        TypeSig::Void => buffer.push(ELEMENT_TYPE::VOID),
        TypeSig::Boolean => buffer.push(ELEMENT_TYPE::BOOLEAN),
        TypeSig::Char => buffer.push(ELEMENT_TYPE::CHAR),
        TypeSig::I1 => buffer.push(ELEMENT_TYPE::I1),
        TypeSig::U1 => buffer.push(ELEMENT_TYPE::U1),
        TypeSig::I2 => buffer.push(ELEMENT_TYPE::I2),
        TypeSig::U2 => buffer.push(ELEMENT_TYPE::U2),
        TypeSig::I4 => buffer.push(ELEMENT_TYPE::I4),
        TypeSig::U4 => buffer.push(ELEMENT_TYPE::U4),
        TypeSig::I8 => buffer.push(ELEMENT_TYPE::I8),
        TypeSig::U8 => buffer.push(ELEMENT_TYPE::U8),
        TypeSig::R4 => buffer.push(ELEMENT_TYPE::R4),
        TypeSig::R8 => buffer.push(ELEMENT_TYPE::R8),
        TypeSig::String => buffer.push(ELEMENT_TYPE::STRING),
        TypeSig::Object => buffer.push(ELEMENT_TYPE::OBJECT),
        TypeSig::I => buffer.push(ELEMENT_TYPE::I),
        TypeSig::U => buffer.push(ELEMENT_TYPE::U),
        TypeSig::TypedByRef => buffer.push(ELEMENT_TYPE::TYPEDBYREF),
        TypeSig::Class(entity) => {
            buffer.push(ELEMENT_TYPE::CLASS);
            let coded = tokens.encoded_typedef_or_ref(entity)?;
            write_compressed_uint(coded, buffer);
        }
        TypeSig::ValueType(entity) => {
            buffer.push(ELEMENT_TYPE::VALUETYPE);
            let coded = tokens.encoded_typedef_or_ref(entity)?;
            write_compressed_uint(coded, buffer);
        }
        TypeSig::Ptr(inner) => {
            buffer.push(ELEMENT_TYPE::PTR);
            encode_type_sig(inner, tokens, buffer)?;
        }
        TypeSig::ByRef(inner) => {
            buffer.push(ELEMENT_TYPE::BYREF);
            encode_type_sig(inner, tokens, buffer)?;
        }
        TypeSig::SzArray(element) => {
            buffer.push(ELEMENT_TYPE::SZARRAY);
            encode_type_sig(element, tokens, buffer)?;
        }
        TypeSig::Array(array) => {
            buffer.push(ELEMENT_TYPE::ARRAY);
            encode_type_sig(&array.element, tokens, buffer)?;
            write_compressed_uint(array.rank, buffer);
            write_compressed_uint(len_u32(array.sizes.len())?, buffer);
            for size in &array.sizes {
                write_compressed_uint(*size, buffer);
            }
            write_compressed_uint(len_u32(array.lower_bounds.len())?, buffer);
            for bound in &array.lower_bounds {
                write_compressed_int(*bound, buffer);
            }
        }
        TypeSig::GenericInst(inst) => {
            buffer.push(ELEMENT_TYPE::GENERICINST);
            buffer.push(if inst.is_value_type {
                ELEMENT_TYPE::VALUETYPE
            } else {
                ELEMENT_TYPE::CLASS
            });
            let coded = tokens.encoded_typedef_or_ref(&inst.base)?;
            write_compressed_uint(coded, buffer);
            write_compressed_uint(len_u32(inst.args.len())?, buffer);
            for arg in &inst.args {
                encode_type_sig(arg, tokens, buffer)?;
            }
        }
        TypeSig::FnPtr(method) => {
            buffer.push(ELEMENT_TYPE::FNPTR);
            let inner = encode_method_sig(method, tokens)?;
            buffer.extend_from_slice(&inner);
        }
        TypeSig::Var(number) => {
            buffer.push(ELEMENT_TYPE::VAR);
            write_compressed_uint(*number, buffer);
        }
        TypeSig::MVar(number) => {
            buffer.push(ELEMENT_TYPE::MVAR);
            write_compressed_uint(*number, buffer);
        }
        TypeSig::Pinned(inner) => {
            buffer.push(ELEMENT_TYPE::PINNED);
            encode_type_sig(inner, tokens, buffer)?;
        }
    }
    Ok(())
}

/// Serializes a method signature (II.23.2.1).
///
/// # Errors
/// Fails when a parameter count exceeds the compressed-integer range or a
/// type reference cannot be encoded.
pub fn encode_method_sig(sig: &MethodSig, tokens: &mut dyn TokenService) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    let mut head = sig.call_conv & 0x0F;
    if sig.has_this {
        head |= CALLING_CONVENTION::HASTHIS;
    }
    if sig.explicit_this {
        head |= CALLING_CONVENTION::EXPLICITTHIS;
    }
    if sig.generic_param_count > 0 {
        head |= CALLING_CONVENTION::GENERIC;
    }
    buffer.push(head);

    if sig.generic_param_count > 0 {
        write_compressed_uint(sig.generic_param_count, &mut buffer);
    }

    let total = sig.params.len() + sig.params_after_sentinel.len();
    write_compressed_uint(len_u32(total)?, &mut buffer);

    encode_param(&sig.return_type, tokens, &mut buffer)?;
    for param in &sig.params {
        encode_param(param, tokens, &mut buffer)?;
    }
    if !sig.params_after_sentinel.is_empty() {
        buffer.push(ELEMENT_TYPE::SENTINEL);
        for param in &sig.params_after_sentinel {
            encode_param(param, tokens, &mut buffer)?;
        }
    }

    Ok(buffer)
}

/// Serializes a field signature (II.23.2.4).
///
/// # Errors
/// Propagates token-service failures for entity references.
pub fn encode_field_sig(sig: &FieldSig, tokens: &mut dyn TokenService) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.push(SIGNATURE_HEADER::FIELD);
    encode_modifiers(&sig.modifiers, tokens, &mut buffer)?;
    encode_type_sig(&sig.ty, tokens, &mut buffer)?;
    Ok(buffer)
}

/// Serializes a property signature (II.23.2.5).
///
/// # Errors
/// Fails when the parameter count exceeds the compressed-integer range or
/// a type reference cannot be encoded.
pub fn encode_property_sig(sig: &PropertySig, tokens: &mut dyn TokenService) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    let mut head = SIGNATURE_HEADER::PROPERTY;
    if sig.has_this {
        head |= CALLING_CONVENTION::HASTHIS;
    }
    buffer.push(head);

    write_compressed_uint(len_u32(sig.params.len())?, &mut buffer);
    encode_modifiers(&sig.modifiers, tokens, &mut buffer)?;
    encode_type_sig(&sig.ty, tokens, &mut buffer)?;
    for param in &sig.params {
        encode_param(param, tokens, &mut buffer)?;
    }

    Ok(buffer)
}

/// Serializes a local variable signature (II.23.2.6).
///
/// # Errors
/// Fails when the local count exceeds the compressed-integer range or a
/// type reference cannot be encoded.
pub fn encode_local_var_sig(sig: &LocalVarSig, tokens: &mut dyn TokenService) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.push(SIGNATURE_HEADER::LOCAL_SIG);
    write_compressed_uint(len_u32(sig.locals.len())?, &mut buffer);

    for local in &sig.locals {
        encode_modifiers(&local.modifiers, tokens, &mut buffer)?;
        if local.pinned {
            buffer.push(ELEMENT_TYPE::PINNED);
        }
        if local.by_ref {
            buffer.push(ELEMENT_TYPE::BYREF);
        }
        encode_type_sig(&local.ty, tokens, &mut buffer)?;
    }

    Ok(buffer)
}

/// Serializes a generic method instantiation (II.23.2.15).
///
/// # Errors
/// Fails when the argument count exceeds the compressed-integer range or a
/// type reference cannot be encoded.
pub fn encode_method_spec_sig(
    sig: &GenericInstMethodSig,
    tokens: &mut dyn TokenService,
) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.push(SIGNATURE_HEADER::GENERIC_INST);
    write_compressed_uint(len_u32(sig.args.len())?, &mut buffer);
    for arg in &sig.args {
        encode_type_sig(arg, tokens, &mut buffer)?;
    }
    Ok(buffer)
}

/// Serializes a `TypeSpec` signature: the bare type with no prolog
/// (II.23.2.14).
///
/// # Errors
/// Propagates token-service failures for entity references.
pub fn encode_typespec_sig(sig: &TypeSig, tokens: &mut dyn TokenService) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    encode_type_sig(sig, tokens, &mut buffer)?;
    Ok(buffer)
}

fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| Error::SignatureEncoding(format!("count {len} exceeds the encodable range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::signatures::{GenericInstSig, LocalSig, PropertySig};

    /// Answers every type reference with a fixed coded index and every
    /// token request with the sentinel.
    struct FixedTokens(u32);

    impl TokenService for FixedTokens {
        fn encoded_typedef_or_ref(&mut self, _: &TypeDefOrRef) -> Result<u32> {
            Ok(self.0)
        }

        fn get_token(&mut self, _: &TokenProvider) -> Token {
            Token::INVALID
        }
    }

    #[test]
    fn field_sig_i4() {
        let sig = FieldSig::new(TypeSig::I4);
        let bytes = encode_field_sig(&sig, &mut FixedTokens(0)).unwrap();
        assert_eq!(bytes, [0x06, 0x08]);
    }

    #[test]
    fn static_method_void_i4() {
        let sig = MethodSig::new_static(TypeSig::Void, vec![TypeSig::I4]);
        let bytes = encode_method_sig(&sig, &mut FixedTokens(0)).unwrap();
        assert_eq!(bytes, [0x00, 0x01, 0x01, 0x08]);
    }

    #[test]
    fn instance_method_sets_hasthis() {
        let sig = MethodSig::new_instance(TypeSig::String, vec![]);
        let bytes = encode_method_sig(&sig, &mut FixedTokens(0)).unwrap();
        assert_eq!(bytes, [0x20, 0x00, 0x0e]);
    }

    #[test]
    fn generic_method_head() {
        let mut sig = MethodSig::new_static(TypeSig::Void, vec![TypeSig::MVar(0)]);
        sig.generic_param_count = 1;
        let bytes = encode_method_sig(&sig, &mut FixedTokens(0)).unwrap();
        // GENERIC flag, generic arity, param count, return, MVAR 0
        assert_eq!(bytes, [0x10, 0x01, 0x01, 0x01, 0x1e, 0x00]);
    }

    #[test]
    fn vararg_sentinel_split() {
        let mut sig = MethodSig::new_static(TypeSig::Void, vec![TypeSig::I4]);
        sig.call_conv = CALLING_CONVENTION::VARARG;
        sig.params_after_sentinel = vec![ParamSig::new(TypeSig::R8)];
        let bytes = encode_method_sig(&sig, &mut FixedTokens(0)).unwrap();
        assert_eq!(bytes, [0x05, 0x02, 0x01, 0x08, 0x41, 0x0d]);
    }

    #[test]
    fn class_reference_goes_through_token_service() {
        // TypeRef rid 3 coded under TypeDefOrRef: (3 << 2) | 1 = 0x0D
        let sig = FieldSig::new(TypeSig::Class(crate::metadata::model::TypeDefOrRef::TypeRef(
            std::sync::Arc::new(crate::metadata::model::TypeRef {
                scope: None,
                name: "Object".into(),
                namespace: "System".into(),
            }),
        )));
        let bytes = encode_field_sig(&sig, &mut FixedTokens(0x0D)).unwrap();
        assert_eq!(bytes, [0x06, 0x12, 0x0D]);
    }

    #[test]
    fn szarray_and_byref() {
        let sig = MethodSig::new_static(
            TypeSig::Void,
            vec![TypeSig::SzArray(Box::new(TypeSig::U1))],
        );
        let bytes = encode_method_sig(&sig, &mut FixedTokens(0)).unwrap();
        assert_eq!(bytes, [0x00, 0x01, 0x01, 0x1d, 0x05]);

        let mut by_ref = MethodSig::new_static(TypeSig::Void, vec![TypeSig::I4]);
        by_ref.params[0].by_ref = true;
        let bytes = encode_method_sig(&by_ref, &mut FixedTokens(0)).unwrap();
        assert_eq!(bytes, [0x00, 0x01, 0x01, 0x10, 0x08]);
    }

    #[test]
    fn array_shape() {
        let sig = TypeSig::Array(ArraySig {
            element: Box::new(TypeSig::I4),
            rank: 2,
            sizes: vec![3, 4],
            lower_bounds: vec![0, -1],
        });
        let bytes = encode_typespec_sig(&sig, &mut FixedTokens(0)).unwrap();
        // ARRAY I4 rank numSizes 3 4 numLoBounds 0 -1
        assert_eq!(bytes, [0x14, 0x08, 0x02, 0x02, 0x03, 0x04, 0x02, 0x00, 0x01]);
    }

    #[test]
    fn generic_inst_layout() {
        let base = crate::metadata::model::TypeDefOrRef::TypeRef(std::sync::Arc::new(
            crate::metadata::model::TypeRef {
                scope: None,
                name: "List`1".into(),
                namespace: "System.Collections.Generic".into(),
            },
        ));
        let sig = TypeSig::GenericInst(GenericInstSig {
            base,
            is_value_type: false,
            args: vec![TypeSig::I4],
        });
        let bytes = encode_typespec_sig(&sig, &mut FixedTokens(0x05)).unwrap();
        assert_eq!(bytes, [0x15, 0x12, 0x05, 0x01, 0x08]);
    }

    #[test]
    fn local_var_pinned() {
        let sig = LocalVarSig {
            locals: vec![
                LocalSig {
                    modifiers: vec![],
                    pinned: true,
                    by_ref: false,
                    ty: TypeSig::I,
                },
                LocalSig {
                    modifiers: vec![],
                    pinned: false,
                    by_ref: true,
                    ty: TypeSig::I4,
                },
            ],
        };
        let bytes = encode_local_var_sig(&sig, &mut FixedTokens(0)).unwrap();
        assert_eq!(bytes, [0x07, 0x02, 0x45, 0x18, 0x10, 0x08]);
    }

    #[test]
    fn property_sig_head() {
        let sig = PropertySig::new_instance(TypeSig::I4);
        let bytes = encode_property_sig(&sig, &mut FixedTokens(0)).unwrap();
        assert_eq!(bytes, [0x28, 0x00, 0x08]);
    }

    #[test]
    fn method_spec_instantiation() {
        let sig = GenericInstMethodSig {
            args: vec![TypeSig::String, TypeSig::I4],
        };
        let bytes = encode_method_spec_sig(&sig, &mut FixedTokens(0)).unwrap();
        assert_eq!(bytes, [0x0A, 0x02, 0x0e, 0x08]);
    }
}
