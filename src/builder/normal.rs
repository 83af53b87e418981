//! The normal tables builder: walks the module graph in the canonical
//! emission order and materializes every table row and heap entry.
//!
//! The walk mirrors the order compilers emit metadata in:
//!
//! 1. Order the types: `<Module>` first, then each top-level type followed
//!    by its nested types depth-first.
//! 2. Create all `TypeDef` rows (names and flags only) and the `Module`
//!    row; cross-references stay 0.
//! 3. Main pass per type: fill `Extends`/`FieldList`/`MethodList` from
//!    running counters, then emit fields, methods, params, generic
//!    params, interfaces, layout, security, events, and properties with
//!    their auxiliary rows.
//! 4. Emit the `Assembly` row.
//! 5. Second pass: `NestedClass`, `MethodImpl`, and `MethodSemantics`
//!    rows, now that every definition has a RID.
//! 6. Resources, exported types, then the deferred custom-attribute pass.
//! 7. Sort pass over the ECMA-declared sorted tables.
//!
//! Reference entities (`TypeRef`, `TypeSpec`, `MemberRef`, ...) are
//! materialized lazily through the token service, with a tentative RID of
//! 0 installed before recursing into their children so reference cycles
//! terminate.

use crate::{
    builder::{
        constants::encode_constant, registry::RidRegistry, BuilderOutput, DataStore, TablesBuilder,
    },
    metadata::{
        heaps::{BlobHeapBuilder, GuidHeapBuilder, StringsHeapBuilder, UserStringsHeapBuilder},
        model::*,
        signatures::{
            encode_field_sig, encode_local_var_sig, encode_method_sig, encode_method_spec_sig,
            encode_property_sig, encode_typespec_sig, TokenService,
        },
        tables::*,
        token::Token,
    },
    Error, Result, Warning, WarningSink,
};

/// Shared construction state: heaps, tables, registry, warning sink, and
/// the external byte-chunk stores.
pub(crate) struct BuildContext<'a> {
    module: &'a ModuleDef,
    tables: TablesStore,
    strings: StringsHeapBuilder,
    user_strings: UserStringsHeapBuilder,
    guids: GuidHeapBuilder,
    blobs: BlobHeapBuilder,
    registry: RidRegistry,
    sink: &'a mut dyn WarningSink,
    constants_data: &'a mut DataStore,
    net_resources: &'a mut DataStore,
    /// Custom attributes discovered during the walk, flushed once every
    /// parent has a RID.
    pending_attrs: Vec<(TableId, u32, CustomAttribute)>,
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(
        module: &'a ModuleDef,
        sink: &'a mut dyn WarningSink,
        constants_data: &'a mut DataStore,
        net_resources: &'a mut DataStore,
    ) -> Self {
        BuildContext {
            module,
            tables: TablesStore::new(),
            strings: StringsHeapBuilder::new(),
            user_strings: UserStringsHeapBuilder::new(),
            guids: GuidHeapBuilder::new(),
            blobs: BlobHeapBuilder::new(),
            registry: RidRegistry::new(),
            sink,
            constants_data,
            net_resources,
            pending_attrs: Vec::new(),
        }
    }

    pub(crate) fn seed_strings(&mut self, raw: &[u8]) -> Result<()> {
        self.strings = StringsHeapBuilder::from_existing(raw)?;
        Ok(())
    }

    pub(crate) fn seed_user_strings(&mut self, raw: &[u8]) -> Result<()> {
        self.user_strings = UserStringsHeapBuilder::from_existing(raw)?;
        Ok(())
    }

    pub(crate) fn seed_blobs(&mut self, raw: &[u8]) -> Result<()> {
        self.blobs = BlobHeapBuilder::from_existing(raw)?;
        Ok(())
    }

    pub(crate) fn seed_guids(&mut self, raw: &[u8]) -> Result<()> {
        self.guids = GuidHeapBuilder::from_existing(raw)?;
        Ok(())
    }

    pub(crate) fn into_output(self) -> BuilderOutput {
        BuilderOutput {
            tables: self.tables,
            strings: self.strings,
            user_strings: self.user_strings,
            guids: self.guids,
            blobs: self.blobs,
        }
    }

    fn warn(&mut self, warning: Warning) {
        tracing::warn!(%warning, "metadata graph warning");
        self.sink.warn(warning);
    }

    /// Runs the full construction walk.
    pub(crate) fn build_tables(&mut self) -> Result<()> {
        let sorted = self.sorted_types()?;
        tracing::debug!(types = sorted.len(), "building metadata tables");

        self.create_type_rows(&sorted)?;
        self.fill_types(&sorted)?;
        self.add_assembly()?;

        let module = self.module;
        self.collect_attrs(TableId::Module, 1, &module.custom_attributes);

        self.link_types(&sorted)?;
        self.add_resources()?;
        self.add_exported_types()?;
        self.flush_custom_attributes()?;

        self.tables.sort()?;
        Ok(())
    }

    /// `<Module>` type first, then every top-level type followed by the
    /// depth-first closure of its nested types.
    fn sorted_types(&self) -> Result<Vec<TypeDefRc>> {
        fn push_with_nested(out: &mut Vec<TypeDefRc>, ty: &TypeDefRc) {
            out.push(ty.clone());
            for nested in &ty.nested_types {
                push_with_nested(out, nested);
            }
        }

        if self.module.types.is_empty() {
            return Err(Error::MissingGlobalType);
        }

        let mut sorted = Vec::new();
        for ty in &self.module.types {
            push_with_nested(&mut sorted, ty);
        }
        Ok(sorted)
    }

    /// Creates every `TypeDef` row with names and flags only, and the
    /// `Module` row right after the `<Module>` type's row.
    fn create_type_rows(&mut self, sorted: &[TypeDefRc]) -> Result<()> {
        for (index, ty) in sorted.iter().enumerate() {
            let name = self.strings.add(&ty.name);
            let namespace = self.strings.add(&ty.namespace);
            let rid = self.tables.type_def.create(TypeDefRow {
                flags: ty.flags,
                name,
                namespace,
                extends: 0,
                field_list: 0,
                method_list: 0,
            });
            self.registry.type_defs.insert(ty, rid)?;

            if index == 0 {
                let module = self.module;
                let name = self.strings.add(&module.name);
                let mvid = self.guids.add_optional(module.mvid.as_ref());
                let enc_id = self.guids.add_optional(module.enc_id.as_ref());
                let enc_base_id = self.guids.add_optional(module.enc_base_id.as_ref());
                self.tables.module.create(ModuleRow {
                    generation: module.generation,
                    name,
                    mvid,
                    enc_id,
                    enc_base_id,
                });
            }
        }
        Ok(())
    }

    /// Main pass: per-type cross-references, members, and member
    /// auxiliary rows, driven by running RID counters.
    fn fill_types(&mut self, sorted: &[TypeDefRc]) -> Result<()> {
        let mut next_field = 1u32;
        let mut next_method = 1u32;
        let mut next_param = 1u32;

        for (index, ty) in sorted.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let type_rid = index as u32 + 1;

            let extends = match &ty.extends {
                Some(base) => self.encoded_typedef_or_ref(base)?,
                None => 0,
            };
            if let Some(row) = self.tables.type_def.get_mut(type_rid) {
                row.extends = extends;
                row.field_list = next_field;
                row.method_list = next_method;
            }

            self.add_fields(ty, &mut next_field)?;
            self.add_methods(ty, &mut next_method, &mut next_param)?;
            self.add_generic_params(TableId::TypeDef, type_rid, &ty.generic_params)?;

            for interface in &ty.interfaces {
                let coded = self.encoded_typedef_or_ref(&interface.interface)?;
                let rid = self.tables.interface_impl.create(InterfaceImplRow {
                    class: type_rid,
                    interface: coded,
                });
                self.collect_attrs(TableId::InterfaceImpl, rid, &interface.custom_attributes);
            }

            if let Some(layout) = &ty.layout {
                self.tables.class_layout.create(ClassLayoutRow {
                    packing_size: layout.packing_size,
                    class_size: layout.class_size,
                    parent: type_rid,
                });
            }

            self.add_security(TableId::TypeDef, type_rid, &ty.security)?;
            self.add_events(ty, type_rid)?;
            self.add_properties(ty, type_rid)?;
            self.collect_attrs(TableId::TypeDef, type_rid, &ty.custom_attributes);
        }
        Ok(())
    }

    fn add_fields(&mut self, ty: &TypeDefRc, next_field: &mut u32) -> Result<()> {
        for (index, entry) in ty.fields.iter().enumerate() {
            let Some(field) = entry else {
                self.warn(Warning::NullEntity {
                    owner: type_display(ty),
                    kind: "field",
                    index,
                });
                continue;
            };

            let signature = encode_field_sig(&field.signature, self)?;
            let signature = self.blobs.add(&signature);
            let name = self.strings.add(&field.name);
            let rid = self.tables.field.create(FieldRow {
                flags: field.flags,
                name,
                signature,
            });
            debug_assert_eq!(rid, *next_field);
            self.registry.fields.insert(field, rid)?;
            *next_field += 1;

            if let Some(offset) = field.layout_offset {
                self.tables
                    .field_layout
                    .create(FieldLayoutRow { offset, field: rid });
            }
            if let Some(marshal) = &field.marshal {
                let native_type = self.blobs.add(marshal);
                let parent = CodedIndexType::HasFieldMarshal.encode(TableId::Field, rid)?;
                self.tables
                    .field_marshal
                    .create(FieldMarshalRow { parent, native_type });
            }
            if let Some(data) = &field.rva_data {
                let offset = self.constants_data.append(data);
                self.tables
                    .field_rva
                    .create(FieldRvaRow { rva: offset, field: rid });
            }
            if let Some(impl_map) = &field.impl_map {
                self.add_impl_map(TableId::Field, rid, impl_map)?;
            }
            if let Some(constant) = &field.constant {
                self.add_constant(TableId::Field, rid, constant)?;
            }
            self.collect_attrs(TableId::Field, rid, &field.custom_attributes);
        }
        Ok(())
    }

    fn add_methods(
        &mut self,
        ty: &TypeDefRc,
        next_method: &mut u32,
        next_param: &mut u32,
    ) -> Result<()> {
        for (index, entry) in ty.methods.iter().enumerate() {
            let Some(method) = entry else {
                self.warn(Warning::NullEntity {
                    owner: type_display(ty),
                    kind: "method",
                    index,
                });
                continue;
            };

            let signature = encode_method_sig(&method.signature, self)?;
            let signature = self.blobs.add(&signature);
            let name = self.strings.add(&method.name);
            let rid = self.tables.method_def.create(MethodDefRow {
                rva: 0,
                impl_flags: method.impl_flags,
                flags: method.flags,
                name,
                signature,
                param_list: *next_param,
            });
            debug_assert_eq!(rid, *next_method);
            self.registry.methods.insert(method, rid)?;
            *next_method += 1;

            for (param_index, param_entry) in method.params.iter().enumerate() {
                let Some(param) = param_entry else {
                    self.warn(Warning::NullEntity {
                        owner: format!("{}::{}", type_display(ty), method.name),
                        kind: "param",
                        index: param_index,
                    });
                    continue;
                };

                let name = self.strings.add(&param.name);
                let param_rid = self.tables.param.create(ParamRow {
                    flags: param.flags,
                    sequence: param.sequence,
                    name,
                });
                debug_assert_eq!(param_rid, *next_param);
                *next_param += 1;

                if let Some(marshal) = &param.marshal {
                    let native_type = self.blobs.add(marshal);
                    let parent = CodedIndexType::HasFieldMarshal.encode(TableId::Param, param_rid)?;
                    self.tables
                        .field_marshal
                        .create(FieldMarshalRow { parent, native_type });
                }
                if let Some(constant) = &param.constant {
                    self.add_constant(TableId::Param, param_rid, constant)?;
                }
                self.collect_attrs(TableId::Param, param_rid, &param.custom_attributes);
            }

            self.add_generic_params(TableId::MethodDef, rid, &method.generic_params)?;
            if let Some(impl_map) = &method.impl_map {
                self.add_impl_map(TableId::MethodDef, rid, impl_map)?;
            }
            self.add_security(TableId::MethodDef, rid, &method.security)?;
            self.collect_attrs(TableId::MethodDef, rid, &method.custom_attributes);
        }
        Ok(())
    }

    fn add_generic_params(
        &mut self,
        owner_table: TableId,
        owner_rid: u32,
        generic_params: &[GenericParamDef],
    ) -> Result<()> {
        let owner = CodedIndexType::TypeOrMethodDef.encode(owner_table, owner_rid)?;
        for generic_param in generic_params {
            let name = self.strings.add(&generic_param.name);
            let rid = self.tables.generic_param.create(GenericParamRow {
                number: generic_param.number,
                flags: generic_param.flags,
                owner,
                name,
            });
            for constraint in &generic_param.constraints {
                let coded = self.encoded_typedef_or_ref(constraint)?;
                self.tables
                    .generic_param_constraint
                    .create(GenericParamConstraintRow {
                        owner: rid,
                        constraint: coded,
                    });
            }
            self.collect_attrs(TableId::GenericParam, rid, &generic_param.custom_attributes);
        }
        Ok(())
    }

    fn add_impl_map(
        &mut self,
        owner_table: TableId,
        owner_rid: u32,
        impl_map: &ImplMapDef,
    ) -> Result<()> {
        let member_forwarded = CodedIndexType::MemberForwarded.encode(owner_table, owner_rid)?;
        let import_scope = self.module_ref_rid(&impl_map.import_scope)?;
        let import_name = self.strings.add(&impl_map.import_name);
        self.tables.impl_map.create(ImplMapRow {
            mapping_flags: impl_map.flags,
            member_forwarded,
            import_name,
            import_scope,
        });
        Ok(())
    }

    fn add_constant(
        &mut self,
        owner_table: TableId,
        owner_rid: u32,
        constant: &ConstantDef,
    ) -> Result<()> {
        let (bytes, warning) = encode_constant(constant.element_type, &constant.value);
        if let Some(warning) = warning {
            self.warn(warning);
        }
        let value = self.blobs.add(&bytes);
        let parent = CodedIndexType::HasConstant.encode(owner_table, owner_rid)?;
        self.tables.constant.create(ConstantRow {
            element_type: constant.element_type,
            parent,
            value,
        });
        Ok(())
    }

    fn add_security(
        &mut self,
        owner_table: TableId,
        owner_rid: u32,
        security: &[DeclSecurityDef],
    ) -> Result<()> {
        for declaration in security {
            let parent = CodedIndexType::HasDeclSecurity.encode(owner_table, owner_rid)?;
            let permission_set = self.blobs.add(&declaration.permission_set);
            let rid = self.tables.decl_security.create(DeclSecurityRow {
                action: declaration.action,
                parent,
                permission_set,
            });
            self.collect_attrs(TableId::DeclSecurity, rid, &declaration.custom_attributes);
        }
        Ok(())
    }

    /// Emits an `EventMap` row iff the type has at least one non-null
    /// event, then the type's `Event` rows.
    fn add_events(&mut self, ty: &TypeDefRc, type_rid: u32) -> Result<()> {
        if !ty.events.iter().any(Option::is_some) {
            for (index, entry) in ty.events.iter().enumerate() {
                debug_assert!(entry.is_none());
                self.warn(Warning::NullEntity {
                    owner: type_display(ty),
                    kind: "event",
                    index,
                });
            }
            return Ok(());
        }

        let event_list = self.tables.event.row_count() + 1;
        self.tables.event_map.create(EventMapRow {
            parent: type_rid,
            event_list,
        });

        for (index, entry) in ty.events.iter().enumerate() {
            let Some(event) = entry else {
                self.warn(Warning::NullEntity {
                    owner: type_display(ty),
                    kind: "event",
                    index,
                });
                continue;
            };

            let event_type = match &event.event_type {
                Some(delegate) => self.encoded_typedef_or_ref(delegate)?,
                None => 0,
            };
            let name = self.strings.add(&event.name);
            let rid = self.tables.event.create(EventRow {
                event_flags: event.flags,
                name,
                event_type,
            });
            self.registry.events.insert(event, rid)?;
            self.collect_attrs(TableId::Event, rid, &event.custom_attributes);
        }
        Ok(())
    }

    /// Emits a `PropertyMap` row iff the type has at least one non-null
    /// property, then the type's `Property` rows and their constants.
    fn add_properties(&mut self, ty: &TypeDefRc, type_rid: u32) -> Result<()> {
        if !ty.properties.iter().any(Option::is_some) {
            for (index, entry) in ty.properties.iter().enumerate() {
                debug_assert!(entry.is_none());
                self.warn(Warning::NullEntity {
                    owner: type_display(ty),
                    kind: "property",
                    index,
                });
            }
            return Ok(());
        }

        let property_list = self.tables.property.row_count() + 1;
        self.tables.property_map.create(PropertyMapRow {
            parent: type_rid,
            property_list,
        });

        for (index, entry) in ty.properties.iter().enumerate() {
            let Some(property) = entry else {
                self.warn(Warning::NullEntity {
                    owner: type_display(ty),
                    kind: "property",
                    index,
                });
                continue;
            };

            let signature = encode_property_sig(&property.signature, self)?;
            let signature = self.blobs.add(&signature);
            let name = self.strings.add(&property.name);
            let rid = self.tables.property.create(PropertyRow {
                flags: property.flags,
                name,
                signature,
            });
            self.registry.properties.insert(property, rid)?;

            if let Some(constant) = &property.constant {
                self.add_constant(TableId::Property, rid, constant)?;
            }
            self.collect_attrs(TableId::Property, rid, &property.custom_attributes);
        }
        Ok(())
    }

    fn add_assembly(&mut self) -> Result<()> {
        let module = self.module;
        let Some(assembly) = &module.assembly else {
            return Ok(());
        };

        let public_key = self.blobs.add(&assembly.public_key);
        let name = self.strings.add(&assembly.name);
        let culture = self.strings.add(&assembly.culture);
        let rid = self.tables.assembly.create(AssemblyRow {
            hash_alg_id: assembly.hash_algorithm,
            major_version: assembly.version.major,
            minor_version: assembly.version.minor,
            build_number: assembly.version.build,
            revision_number: assembly.version.revision,
            flags: assembly.flags,
            public_key,
            name,
            culture,
        });

        self.add_security(TableId::Assembly, rid, &assembly.security)?;
        self.collect_attrs(TableId::Assembly, rid, &assembly.custom_attributes);
        Ok(())
    }

    /// Second pass: edges that need every definition RID to exist.
    fn link_types(&mut self, sorted: &[TypeDefRc]) -> Result<()> {
        for (index, ty) in sorted.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let type_rid = index as u32 + 1;

            for nested in &ty.nested_types {
                if let Some(nested_rid) = self.registry.type_defs.try_get(nested) {
                    self.tables.nested_class.create(NestedClassRow {
                        nested_class: nested_rid,
                        enclosing_class: type_rid,
                    });
                }
            }

            for method in ty.methods.iter().flatten() {
                for method_override in &method.overrides {
                    let method_body = self.method_def_or_ref_coded(&method_override.body)?;
                    let method_declaration =
                        self.method_def_or_ref_coded(&method_override.declaration)?;
                    self.tables.method_impl.create(MethodImplRow {
                        class: type_rid,
                        method_body,
                        method_declaration,
                    });
                }
            }

            for event in ty.events.iter().flatten() {
                let association = match self.registry.events.try_get(event) {
                    Some(rid) => CodedIndexType::HasSemantics.encode(TableId::Event, rid)?,
                    None => continue,
                };
                let accessors = [
                    (MethodSemanticsAttributes::ADD_ON, &event.add_method),
                    (MethodSemanticsAttributes::REMOVE_ON, &event.remove_method),
                    (MethodSemanticsAttributes::FIRE, &event.invoke_method),
                ];
                for (semantics, accessor) in accessors {
                    if let Some(accessor) = accessor {
                        self.add_semantic(semantics, accessor, association, &event.name);
                    }
                }
                for other in &event.other_methods {
                    self.add_semantic(
                        MethodSemanticsAttributes::OTHER,
                        other,
                        association,
                        &event.name,
                    );
                }
            }

            for property in ty.properties.iter().flatten() {
                let association = match self.registry.properties.try_get(property) {
                    Some(rid) => CodedIndexType::HasSemantics.encode(TableId::Property, rid)?,
                    None => continue,
                };
                if let Some(getter) = &property.get_method {
                    self.add_semantic(
                        MethodSemanticsAttributes::GETTER,
                        getter,
                        association,
                        &property.name,
                    );
                }
                if let Some(setter) = &property.set_method {
                    self.add_semantic(
                        MethodSemanticsAttributes::SETTER,
                        setter,
                        association,
                        &property.name,
                    );
                }
                for other in &property.other_methods {
                    self.add_semantic(
                        MethodSemanticsAttributes::OTHER,
                        other,
                        association,
                        &property.name,
                    );
                }
            }
        }
        Ok(())
    }

    fn add_semantic(
        &mut self,
        semantics: MethodSemanticsAttributes,
        accessor: &MethodRc,
        association: u32,
        owner_name: &str,
    ) {
        match self.registry.methods.try_get(accessor) {
            Some(method) => {
                self.tables.method_semantics.create(MethodSemanticsRow {
                    semantics: semantics.bits(),
                    method,
                    association,
                });
            }
            None => self.warn(Warning::UnsupportedTokenRequest(format!(
                "accessor {} of {owner_name} is not a method of this module",
                accessor.name
            ))),
        }
    }

    fn add_resources(&mut self) -> Result<()> {
        let module = self.module;
        for resource in &module.resources {
            let (offset, flags, implementation, attrs) = match resource {
                Resource::Embedded(embedded) => {
                    let offset = self.net_resources.append_with_length(&embedded.data);
                    (offset, embedded.flags, 0, &embedded.custom_attributes)
                }
                Resource::AssemblyLinked(linked) => {
                    let assembly_rid = self.assembly_ref_rid(&linked.assembly)?;
                    let implementation = CodedIndexType::Implementation
                        .encode(TableId::AssemblyRef, assembly_rid)?;
                    (0, linked.flags, implementation, &linked.custom_attributes)
                }
                Resource::FileLinked(linked) => {
                    let file_rid = self.file_rid(&linked.file)?;
                    let implementation =
                        CodedIndexType::Implementation.encode(TableId::File, file_rid)?;
                    (0, linked.flags, implementation, &linked.custom_attributes)
                }
            };

            let name = self.strings.add(resource.name());
            let rid = self.tables.manifest_resource.create(ManifestResourceRow {
                offset,
                flags,
                name,
                implementation,
            });
            self.collect_attrs(TableId::ManifestResource, rid, attrs);
        }
        Ok(())
    }

    fn add_exported_types(&mut self) -> Result<()> {
        let module = self.module;
        for exported in &module.exported_types {
            self.exported_type_rid(exported)?;
        }
        Ok(())
    }

    fn collect_attrs(&mut self, parent_table: TableId, parent_rid: u32, attrs: &[CustomAttribute]) {
        for attr in attrs {
            self.pending_attrs
                .push((parent_table, parent_rid, attr.clone()));
        }
    }

    /// Deferred pass: every parent has a RID by now, so `CustomAttribute`
    /// rows can encode their `HasCustomAttribute` parents.
    fn flush_custom_attributes(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending_attrs);
        tracing::debug!(count = pending.len(), "emitting custom attributes");

        for (parent_table, parent_rid, attr) in pending {
            let parent = CodedIndexType::HasCustomAttribute.encode(parent_table, parent_rid)?;
            let attribute_type = match &attr.ctor {
                CustomAttributeCtor::MethodDef(method) => {
                    match self.registry.methods.try_get(method) {
                        Some(rid) if rid != 0 => {
                            CodedIndexType::CustomAttributeType.encode(TableId::MethodDef, rid)?
                        }
                        _ => {
                            self.warn(Warning::UnsupportedTokenRequest(format!(
                                "custom attribute constructor {} is not a method of this module",
                                method.name
                            )));
                            continue;
                        }
                    }
                }
                CustomAttributeCtor::MemberRef(member) => {
                    let rid = self.member_ref_rid(member)?;
                    CodedIndexType::CustomAttributeType.encode(TableId::MemberRef, rid)?
                }
            };
            let value = self.blobs.add(&attr.value);
            self.tables.custom_attribute.create(CustomAttributeRow {
                parent,
                attribute_type,
                value,
            });
        }
        Ok(())
    }

    // -- reference entity materialization ---------------------------------

    fn typedef_rid_or_none(&mut self, ty: &TypeDefRc) -> u32 {
        match self.registry.type_defs.try_get(ty) {
            Some(rid) => rid,
            None => {
                self.warn(Warning::UnsupportedTokenRequest(format!(
                    "type {} is not defined in this module",
                    type_display(ty)
                )));
                0
            }
        }
    }

    fn type_ref_rid(&mut self, entity: &TypeRefRc) -> Result<u32> {
        if let Some(rid) = self.registry.type_refs.try_get(entity) {
            if rid == 0 {
                self.warn(Warning::UnsupportedTokenRequest(format!(
                    "circular resolution scope through TypeRef {}",
                    entity.name
                )));
            }
            return Ok(rid);
        }
        self.registry.type_refs.insert(entity, 0)?;

        let resolution_scope = match &entity.scope {
            None => 0,
            Some(ResolutionScope::Module) => {
                CodedIndexType::ResolutionScope.encode(TableId::Module, 1)?
            }
            Some(ResolutionScope::ModuleRef(module_ref)) => {
                let rid = self.module_ref_rid(module_ref)?;
                CodedIndexType::ResolutionScope.encode(TableId::ModuleRef, rid)?
            }
            Some(ResolutionScope::AssemblyRef(assembly_ref)) => {
                let rid = self.assembly_ref_rid(assembly_ref)?;
                CodedIndexType::ResolutionScope.encode(TableId::AssemblyRef, rid)?
            }
            Some(ResolutionScope::TypeRef(enclosing)) => {
                let rid = self.type_ref_rid(enclosing)?;
                CodedIndexType::ResolutionScope.encode(TableId::TypeRef, rid)?
            }
        };

        let name = self.strings.add(&entity.name);
        let namespace = self.strings.add(&entity.namespace);
        let rid = self.tables.type_ref.add(TypeRefRow {
            resolution_scope,
            name,
            namespace,
        });
        self.registry.type_refs.set(entity, rid);
        Ok(rid)
    }

    fn type_spec_rid(&mut self, entity: &TypeSpecRc) -> Result<u32> {
        if let Some(rid) = self.registry.type_specs.try_get(entity) {
            return Ok(rid);
        }
        self.registry.type_specs.insert(entity, 0)?;

        let signature = encode_typespec_sig(&entity.signature, self)?;
        let signature = self.blobs.add(&signature);
        let rid = self.tables.type_spec.add(TypeSpecRow { signature });
        self.registry.type_specs.set(entity, rid);
        Ok(rid)
    }

    fn member_ref_rid(&mut self, entity: &MemberRefRc) -> Result<u32> {
        if let Some(rid) = self.registry.member_refs.try_get(entity) {
            return Ok(rid);
        }
        self.registry.member_refs.insert(entity, 0)?;

        let class = match &entity.parent {
            MemberRefParent::TypeDef(ty) => {
                let rid = self.typedef_rid_or_none(ty);
                CodedIndexType::MemberRefParent.encode(TableId::TypeDef, rid)?
            }
            MemberRefParent::TypeRef(type_ref) => {
                let rid = self.type_ref_rid(type_ref)?;
                CodedIndexType::MemberRefParent.encode(TableId::TypeRef, rid)?
            }
            MemberRefParent::ModuleRef(module_ref) => {
                let rid = self.module_ref_rid(module_ref)?;
                CodedIndexType::MemberRefParent.encode(TableId::ModuleRef, rid)?
            }
            MemberRefParent::MethodDef(method) => {
                let rid = self.registry.methods.try_get(method).unwrap_or_else(|| {
                    self.warn(Warning::UnsupportedTokenRequest(format!(
                        "vararg parent {} is not a method of this module",
                        method.name
                    )));
                    0
                });
                CodedIndexType::MemberRefParent.encode(TableId::MethodDef, rid)?
            }
            MemberRefParent::TypeSpec(type_spec) => {
                let rid = self.type_spec_rid(type_spec)?;
                CodedIndexType::MemberRefParent.encode(TableId::TypeSpec, rid)?
            }
        };

        let signature = match &entity.signature {
            MemberRefSignature::Method(sig) => encode_method_sig(sig, self)?,
            MemberRefSignature::Field(sig) => encode_field_sig(sig, self)?,
        };
        let signature = self.blobs.add(&signature);
        let name = self.strings.add(&entity.name);
        let rid = self.tables.member_ref.add(MemberRefRow {
            class,
            name,
            signature,
        });
        self.registry.member_refs.set(entity, rid);
        Ok(rid)
    }

    fn module_ref_rid(&mut self, entity: &ModuleRefRc) -> Result<u32> {
        if let Some(rid) = self.registry.module_refs.try_get(entity) {
            return Ok(rid);
        }
        let name = self.strings.add(&entity.name);
        let rid = self.tables.module_ref.add(ModuleRefRow { name });
        self.registry.module_refs.insert(entity, rid)?;
        self.collect_attrs(TableId::ModuleRef, rid, &entity.custom_attributes);
        Ok(rid)
    }

    fn assembly_ref_rid(&mut self, entity: &AssemblyRefRc) -> Result<u32> {
        if let Some(rid) = self.registry.assembly_refs.try_get(entity) {
            return Ok(rid);
        }
        let public_key_or_token = self.blobs.add(&entity.public_key_or_token);
        let hash_value = self.blobs.add(&entity.hash_value);
        let name = self.strings.add(&entity.name);
        let culture = self.strings.add(&entity.culture);
        let rid = self.tables.assembly_ref.add(AssemblyRefRow {
            major_version: entity.version.major,
            minor_version: entity.version.minor,
            build_number: entity.version.build,
            revision_number: entity.version.revision,
            flags: entity.flags,
            public_key_or_token,
            name,
            culture,
            hash_value,
        });
        self.registry.assembly_refs.insert(entity, rid)?;
        self.collect_attrs(TableId::AssemblyRef, rid, &entity.custom_attributes);
        Ok(rid)
    }

    fn method_spec_rid(&mut self, entity: &MethodSpecRc) -> Result<u32> {
        if let Some(rid) = self.registry.method_specs.try_get(entity) {
            return Ok(rid);
        }
        self.registry.method_specs.insert(entity, 0)?;

        let method = self.method_def_or_ref_coded(&entity.method)?;
        let instantiation = encode_method_spec_sig(&entity.instantiation, self)?;
        let instantiation = self.blobs.add(&instantiation);
        let rid = self.tables.method_spec.add(MethodSpecRow {
            method,
            instantiation,
        });
        self.registry.method_specs.set(entity, rid);
        self.collect_attrs(TableId::MethodSpec, rid, &entity.custom_attributes);
        Ok(rid)
    }

    fn standalone_sig_rid(&mut self, entity: &StandAloneSigRc) -> Result<u32> {
        if let Some(rid) = self.registry.standalone_sigs.try_get(entity) {
            return Ok(rid);
        }
        self.registry.standalone_sigs.insert(entity, 0)?;

        let signature = match &entity.signature {
            StandAloneSignature::LocalVars(sig) => encode_local_var_sig(sig, self)?,
            StandAloneSignature::Method(sig) => encode_method_sig(sig, self)?,
        };
        let signature = self.blobs.add(&signature);
        let rid = self.tables.stand_alone_sig.add(StandAloneSigRow { signature });
        self.registry.standalone_sigs.set(entity, rid);
        self.collect_attrs(TableId::StandAloneSig, rid, &entity.custom_attributes);
        Ok(rid)
    }

    fn file_rid(&mut self, entity: &FileRc) -> Result<u32> {
        if let Some(rid) = self.registry.files.try_get(entity) {
            return Ok(rid);
        }
        let name = self.strings.add(&entity.name);
        let hash_value = self.blobs.add(&entity.hash_value);
        let rid = self.tables.file.add(FileRow {
            flags: entity.flags,
            name,
            hash_value,
        });
        self.registry.files.insert(entity, rid)?;
        self.collect_attrs(TableId::File, rid, &entity.custom_attributes);
        Ok(rid)
    }

    fn exported_type_rid(&mut self, entity: &ExportedTypeRc) -> Result<u32> {
        if let Some(rid) = self.registry.exported_types.try_get(entity) {
            if rid == 0 {
                self.warn(Warning::UnsupportedTokenRequest(format!(
                    "circular implementation through exported type {}",
                    entity.name
                )));
            }
            return Ok(rid);
        }
        self.registry.exported_types.insert(entity, 0)?;

        let implementation = match &entity.implementation {
            ExportedTypeImpl::File(file) => {
                let rid = self.file_rid(file)?;
                CodedIndexType::Implementation.encode(TableId::File, rid)?
            }
            ExportedTypeImpl::AssemblyRef(assembly_ref) => {
                let rid = self.assembly_ref_rid(assembly_ref)?;
                CodedIndexType::Implementation.encode(TableId::AssemblyRef, rid)?
            }
            ExportedTypeImpl::ExportedType(enclosing) => {
                let rid = self.exported_type_rid(enclosing)?;
                CodedIndexType::Implementation.encode(TableId::ExportedType, rid)?
            }
        };

        let name = self.strings.add(&entity.name);
        let namespace = self.strings.add(&entity.namespace);
        let rid = self.tables.exported_type.add(ExportedTypeRow {
            flags: entity.flags,
            type_def_id: entity.type_def_id,
            name,
            namespace,
            implementation,
        });
        self.registry.exported_types.set(entity, rid);
        self.collect_attrs(TableId::ExportedType, rid, &entity.custom_attributes);
        Ok(rid)
    }

    fn method_def_or_ref_coded(&mut self, entity: &MethodDefOrRef) -> Result<u32> {
        match entity {
            MethodDefOrRef::MethodDef(method) => {
                let rid = self.registry.methods.try_get(method).unwrap_or_else(|| {
                    self.warn(Warning::UnsupportedTokenRequest(format!(
                        "method {} is not defined in this module",
                        method.name
                    )));
                    0
                });
                CodedIndexType::MethodDefOrRef.encode(TableId::MethodDef, rid)
            }
            MethodDefOrRef::MemberRef(member) => {
                let rid = self.member_ref_rid(member)?;
                CodedIndexType::MethodDefOrRef.encode(TableId::MemberRef, rid)
            }
        }
    }
}

impl TokenService for BuildContext<'_> {
    fn encoded_typedef_or_ref(&mut self, entity: &TypeDefOrRef) -> Result<u32> {
        match entity {
            TypeDefOrRef::TypeDef(ty) => {
                let rid = self.typedef_rid_or_none(ty);
                CodedIndexType::TypeDefOrRef.encode(TableId::TypeDef, rid)
            }
            TypeDefOrRef::TypeRef(type_ref) => {
                let rid = self.type_ref_rid(type_ref)?;
                CodedIndexType::TypeDefOrRef.encode(TableId::TypeRef, rid)
            }
            TypeDefOrRef::TypeSpec(type_spec) => {
                let rid = self.type_spec_rid(type_spec)?;
                CodedIndexType::TypeDefOrRef.encode(TableId::TypeSpec, rid)
            }
        }
    }

    fn get_token(&mut self, provider: &TokenProvider) -> Token {
        let token = match provider {
            TokenProvider::TypeDef(ty) => match self.registry.type_defs.try_get(ty) {
                Some(rid) => Ok(Token::from_parts(TableId::TypeDef, rid)),
                None => Err(format!("type {} is not defined in this module", ty.name)),
            },
            TokenProvider::TypeRef(type_ref) => self
                .type_ref_rid(type_ref)
                .map(|rid| Token::from_parts(TableId::TypeRef, rid))
                .map_err(|error| error.to_string()),
            TokenProvider::TypeSpec(type_spec) => self
                .type_spec_rid(type_spec)
                .map(|rid| Token::from_parts(TableId::TypeSpec, rid))
                .map_err(|error| error.to_string()),
            TokenProvider::Field(field) => match self.registry.fields.try_get(field) {
                Some(rid) => Ok(Token::from_parts(TableId::Field, rid)),
                None => Err(format!("field {} is not defined in this module", field.name)),
            },
            TokenProvider::MethodDef(method) => match self.registry.methods.try_get(method) {
                Some(rid) => Ok(Token::from_parts(TableId::MethodDef, rid)),
                None => Err(format!(
                    "method {} is not defined in this module",
                    method.name
                )),
            },
            TokenProvider::MemberRef(member) => self
                .member_ref_rid(member)
                .map(|rid| Token::from_parts(TableId::MemberRef, rid))
                .map_err(|error| error.to_string()),
            TokenProvider::ModuleRef(module_ref) => self
                .module_ref_rid(module_ref)
                .map(|rid| Token::from_parts(TableId::ModuleRef, rid))
                .map_err(|error| error.to_string()),
            TokenProvider::AssemblyRef(assembly_ref) => self
                .assembly_ref_rid(assembly_ref)
                .map(|rid| Token::from_parts(TableId::AssemblyRef, rid))
                .map_err(|error| error.to_string()),
            TokenProvider::MethodSpec(method_spec) => self
                .method_spec_rid(method_spec)
                .map(|rid| Token::from_parts(TableId::MethodSpec, rid))
                .map_err(|error| error.to_string()),
            TokenProvider::StandAloneSig(sig) => self
                .standalone_sig_rid(sig)
                .map(|rid| Token::from_parts(TableId::StandAloneSig, rid))
                .map_err(|error| error.to_string()),
            TokenProvider::ExportedType(exported) => self
                .exported_type_rid(exported)
                .map(|rid| Token::from_parts(TableId::ExportedType, rid))
                .map_err(|error| error.to_string()),
            TokenProvider::File(file) => self
                .file_rid(file)
                .map(|rid| Token::from_parts(TableId::File, rid))
                .map_err(|error| error.to_string()),
            TokenProvider::UserString(value) => {
                Ok(Token::from_string_offset(self.user_strings.add(value)))
            }
        };

        match token {
            Ok(token) => token,
            Err(description) => {
                self.warn(Warning::UnsupportedTokenRequest(description));
                Token::INVALID
            }
        }
    }
}

fn type_display(ty: &TypeDef) -> String {
    if ty.namespace.is_empty() {
        ty.name.clone()
    } else {
        format!("{}.{}", ty.namespace, ty.name)
    }
}

/// Builder for the normal strategy: all RIDs and heap offsets are assigned
/// fresh in walk order.
pub struct NormalTablesBuilder<'a> {
    ctx: BuildContext<'a>,
}

impl<'a> NormalTablesBuilder<'a> {
    /// Creates a builder over `module` reporting warnings to `sink`.
    pub fn new(
        module: &'a ModuleDef,
        sink: &'a mut dyn WarningSink,
        constants_data: &'a mut DataStore,
        net_resources: &'a mut DataStore,
    ) -> Self {
        NormalTablesBuilder {
            ctx: BuildContext::new(module, sink, constants_data, net_resources),
        }
    }
}

impl TablesBuilder for NormalTablesBuilder<'_> {
    fn build(mut self: Box<Self>) -> Result<BuilderOutput> {
        self.ctx.build_tables()?;
        Ok(self.ctx.into_output())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::WarningLog;
    use crate::metadata::signatures::{FieldSig, TypeSig};

    fn test_module() -> ModuleDef {
        ModuleDef {
            name: "test.dll".into(),
            types: vec![Arc::new(TypeDef {
                name: "<Module>".into(),
                ..TypeDef::default()
            })],
            ..ModuleDef::default()
        }
    }

    #[test]
    fn foreign_field_request_yields_sentinel() {
        let module = test_module();
        let mut sink = WarningLog::new();
        let mut constants = DataStore::new();
        let mut resources = DataStore::new();
        let mut ctx = BuildContext::new(&module, &mut sink, &mut constants, &mut resources);
        ctx.build_tables().unwrap();

        let orphan = Arc::new(FieldDef {
            flags: 0,
            name: "orphan".into(),
            signature: FieldSig::new(TypeSig::I4),
            layout_offset: None,
            marshal: None,
            rva_data: None,
            impl_map: None,
            constant: None,
            custom_attributes: vec![],
        });
        let token = ctx.get_token(&TokenProvider::Field(orphan));
        assert_eq!(token, Token::INVALID);

        drop(ctx);
        assert!(matches!(
            sink.entries()[0],
            Warning::UnsupportedTokenRequest(_)
        ));
    }

    #[test]
    fn user_string_request_yields_us_token() {
        let module = test_module();
        let mut sink = WarningLog::new();
        let mut constants = DataStore::new();
        let mut resources = DataStore::new();
        let mut ctx = BuildContext::new(&module, &mut sink, &mut constants, &mut resources);
        ctx.build_tables().unwrap();

        let token = ctx.get_token(&TokenProvider::UserString("Hello".into()));
        assert_eq!(token.table(), Token::STRING_TABLE);
        assert_eq!(token.rid(), 1);

        // Same literal, same offset.
        let again = ctx.get_token(&TokenProvider::UserString("Hello".into()));
        assert_eq!(again, token);
    }

    #[test]
    fn token_service_is_idempotent_for_type_refs() {
        let module = test_module();
        let mut sink = WarningLog::new();
        let mut constants = DataStore::new();
        let mut resources = DataStore::new();
        let mut ctx = BuildContext::new(&module, &mut sink, &mut constants, &mut resources);
        ctx.build_tables().unwrap();

        let reference = Arc::new(TypeRef {
            scope: None,
            name: "Object".into(),
            namespace: "System".into(),
        });
        let first = ctx.get_token(&TokenProvider::TypeRef(reference.clone()));
        let second = ctx.get_token(&TokenProvider::TypeRef(reference));
        assert_eq!(first, second);
        assert_eq!(ctx.tables.type_ref.row_count(), 1);
    }
}
