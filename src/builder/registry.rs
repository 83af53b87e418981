//! RID registry: per-entity-kind mapping from logical entity to assigned
//! row identifier.
//!
//! Identity is `Arc` pointer identity; the input graph is expected to have
//! collapsed structurally equal references already. The one exception is
//! [`TypeRefMap`]: `TypeRef`s are additionally deduplicated by
//! name/namespace/scope so that two separately-allocated but identical
//! references still share a row.
//!
//! A tentative RID of 0 is installed before a reference entity's children
//! are resolved; cycles hit the placeholder instead of recursing forever,
//! and the real RID replaces it once the row exists.

use std::marker::PhantomData;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{
    metadata::model::{
        EventDef, ExportedType, FieldDef, FileDef, MemberRef, MethodDef, MethodSpec, ModuleRef,
        AssemblyRef, PropertyDef, ResolutionScope, StandAloneSig, TypeDef, TypeRef, TypeRefRc,
        TypeSpec,
    },
    Error, Result,
};

/// `entity -> rid` map for one entity kind, keyed by `Arc` address.
#[derive(Debug)]
pub struct RidMap<T> {
    map: FxHashMap<usize, u32>,
    kind: &'static str,
    _entity: PhantomData<fn() -> T>,
}

impl<T> RidMap<T> {
    /// Creates an empty map; `kind` names the entity kind in error messages.
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        RidMap {
            map: FxHashMap::default(),
            kind,
            _entity: PhantomData,
        }
    }

    fn key(entity: &Arc<T>) -> usize {
        Arc::as_ptr(entity) as usize
    }

    /// Returns the RID assigned to `entity`, including a tentative 0.
    #[must_use]
    pub fn try_get(&self, entity: &Arc<T>) -> Option<u32> {
        self.map.get(&Self::key(entity)).copied()
    }

    /// Installs a mapping; rejects a second insertion for the same entity.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateRid`] when the entity already has a
    /// mapping (tentative or final).
    pub fn insert(&mut self, entity: &Arc<T>, rid: u32) -> Result<()> {
        if self.map.insert(Self::key(entity), rid).is_some() {
            return Err(Error::DuplicateRid(self.kind));
        }
        Ok(())
    }

    /// Replaces a tentative 0 (or installs a fresh mapping) with `rid`.
    pub fn set(&mut self, entity: &Arc<T>, rid: u32) {
        self.map.insert(Self::key(entity), rid);
    }

    /// Number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Structural identity of a `TypeRef`: name, namespace, and the pointer
/// identity of its resolution scope target.
#[derive(Debug, Hash, PartialEq, Eq)]
struct TypeRefKey {
    name: String,
    namespace: String,
    scope: (u8, usize),
}

impl TypeRefKey {
    fn of(entity: &TypeRefRc) -> Self {
        let scope = match &entity.scope {
            None => (0, 0),
            Some(ResolutionScope::Module) => (1, 0),
            Some(ResolutionScope::ModuleRef(target)) => (2, Arc::as_ptr(target) as usize),
            Some(ResolutionScope::AssemblyRef(target)) => (3, Arc::as_ptr(target) as usize),
            Some(ResolutionScope::TypeRef(target)) => (4, Arc::as_ptr(target) as usize),
        };
        TypeRefKey {
            name: entity.name.clone(),
            namespace: entity.namespace.clone(),
            scope,
        }
    }
}

/// `TypeRef -> rid` map with structural dedup.
///
/// Two distinct `TypeRef` allocations with the same name, namespace, and
/// scope target collapse to a single row.
#[derive(Debug, Default)]
pub struct TypeRefMap {
    map: FxHashMap<TypeRefKey, u32>,
}

impl TypeRefMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the RID assigned to `entity`, including a tentative 0.
    #[must_use]
    pub fn try_get(&self, entity: &TypeRefRc) -> Option<u32> {
        self.map.get(&TypeRefKey::of(entity)).copied()
    }

    /// Installs a mapping; rejects a second insertion for the same
    /// structural identity.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateRid`] when an equal `TypeRef` already has
    /// a mapping.
    pub fn insert(&mut self, entity: &TypeRefRc, rid: u32) -> Result<()> {
        if self.map.insert(TypeRefKey::of(entity), rid).is_some() {
            return Err(Error::DuplicateRid("TypeRef"));
        }
        Ok(())
    }

    /// Replaces a tentative 0 with the final RID.
    pub fn set(&mut self, entity: &TypeRefRc, rid: u32) {
        self.map.insert(TypeRefKey::of(entity), rid);
    }
}

/// All per-kind RID maps a build uses.
#[derive(Debug)]
pub struct RidRegistry {
    /// Types defined in this module
    pub type_defs: RidMap<TypeDef>,
    /// Fields of this module's types
    pub fields: RidMap<FieldDef>,
    /// Methods of this module's types
    pub methods: RidMap<MethodDef>,
    /// Events of this module's types
    pub events: RidMap<EventDef>,
    /// Properties of this module's types
    pub properties: RidMap<PropertyDef>,
    /// External type references, deduplicated structurally
    pub type_refs: TypeRefMap,
    /// Constructed type signatures
    pub type_specs: RidMap<TypeSpec>,
    /// External member references
    pub member_refs: RidMap<MemberRef>,
    /// Module references
    pub module_refs: RidMap<ModuleRef>,
    /// Assembly references
    pub assembly_refs: RidMap<AssemblyRef>,
    /// Generic method instantiations
    pub method_specs: RidMap<MethodSpec>,
    /// Standalone signatures
    pub standalone_sigs: RidMap<StandAloneSig>,
    /// Exported types
    pub exported_types: RidMap<ExportedType>,
    /// Assembly files
    pub files: RidMap<FileDef>,
}

impl Default for RidRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RidRegistry {
    /// Creates a registry with every map empty.
    #[must_use]
    pub fn new() -> Self {
        RidRegistry {
            type_defs: RidMap::new("TypeDef"),
            fields: RidMap::new("Field"),
            methods: RidMap::new("MethodDef"),
            events: RidMap::new("Event"),
            properties: RidMap::new("Property"),
            type_refs: TypeRefMap::new(),
            type_specs: RidMap::new("TypeSpec"),
            member_refs: RidMap::new("MemberRef"),
            module_refs: RidMap::new("ModuleRef"),
            assembly_refs: RidMap::new("AssemblyRef"),
            method_specs: RidMap::new("MethodSpec"),
            standalone_sigs: RidMap::new("StandAloneSig"),
            exported_types: RidMap::new("ExportedType"),
            files: RidMap::new("File"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_keys_distinguish_equal_content() {
        let mut map: RidMap<ModuleRef> = RidMap::new("ModuleRef");
        let first = Arc::new(ModuleRef {
            name: "kernel32.dll".into(),
            custom_attributes: vec![],
        });
        let second = Arc::new(ModuleRef {
            name: "kernel32.dll".into(),
            custom_attributes: vec![],
        });

        map.insert(&first, 1).unwrap();
        assert_eq!(map.try_get(&first), Some(1));
        assert_eq!(map.try_get(&second), None);
    }

    #[test]
    fn duplicate_insert_rejected() {
        let mut map: RidMap<ModuleRef> = RidMap::new("ModuleRef");
        let entity = Arc::new(ModuleRef {
            name: "user32.dll".into(),
            custom_attributes: vec![],
        });

        map.insert(&entity, 1).unwrap();
        assert!(matches!(
            map.insert(&entity, 2),
            Err(Error::DuplicateRid("ModuleRef"))
        ));
    }

    #[test]
    fn tentative_then_set() {
        let mut map: RidMap<ModuleRef> = RidMap::new("ModuleRef");
        let entity = Arc::new(ModuleRef {
            name: "native.dll".into(),
            custom_attributes: vec![],
        });

        map.insert(&entity, 0).unwrap();
        assert_eq!(map.try_get(&entity), Some(0));
        map.set(&entity, 7);
        assert_eq!(map.try_get(&entity), Some(7));
    }

    #[test]
    fn type_refs_dedup_structurally() {
        let scope = Arc::new(AssemblyRef {
            name: "System.Runtime".into(),
            ..AssemblyRef::default()
        });
        let first = Arc::new(TypeRef {
            scope: Some(ResolutionScope::AssemblyRef(scope.clone())),
            name: "Object".into(),
            namespace: "System".into(),
        });
        let second = Arc::new(TypeRef {
            scope: Some(ResolutionScope::AssemblyRef(scope)),
            name: "Object".into(),
            namespace: "System".into(),
        });

        let mut map = TypeRefMap::new();
        map.insert(&first, 3).unwrap();
        assert_eq!(map.try_get(&second), Some(3));
    }

    #[test]
    fn type_refs_distinguish_scopes() {
        let scope_a = Arc::new(AssemblyRef {
            name: "A".into(),
            ..AssemblyRef::default()
        });
        let scope_b = Arc::new(AssemblyRef {
            name: "B".into(),
            ..AssemblyRef::default()
        });
        let in_a = Arc::new(TypeRef {
            scope: Some(ResolutionScope::AssemblyRef(scope_a)),
            name: "T".into(),
            namespace: "N".into(),
        });
        let in_b = Arc::new(TypeRef {
            scope: Some(ResolutionScope::AssemblyRef(scope_b)),
            name: "T".into(),
            namespace: "N".into(),
        });

        let mut map = TypeRefMap::new();
        map.insert(&in_a, 1).unwrap();
        assert_eq!(map.try_get(&in_b), None);
    }
}
