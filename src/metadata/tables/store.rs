//! Typed row storage and the post-construction sort pass.
//!
//! Every table is a [`TableRows`] vector assigning 1-based RIDs in
//! insertion order. After the builders finish, [`TablesStore::sort`] puts
//! the tables ECMA-335 II.22 declares as sorted into key order and rewrites
//! every column that stored a RID into a re-ordered table.

use crate::{
    metadata::tables::{rows::*, CodedIndexType, TableId},
    Result,
};

/// Ordered row container for one metadata table.
///
/// Rows are never removed; a row's RID is its position plus one and stays
/// stable until the final sort pass re-orders the sorted tables.
#[derive(Debug, Default)]
pub struct TableRows<T> {
    rows: Vec<T>,
}

impl<T> TableRows<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        TableRows { rows: Vec::new() }
    }

    /// Appends a row destined for a table that is sorted after
    /// construction; no dedup is attempted. Returns the new RID.
    pub fn create(&mut self, row: T) -> u32 {
        self.rows.push(row);
        #[allow(clippy::cast_possible_truncation)]
        let rid = self.rows.len() as u32;
        rid
    }

    /// Appends a row for a reference table whose caller already
    /// deduplicated through the RID registry. Returns the new RID.
    pub fn add(&mut self, row: T) -> u32 {
        self.create(row)
    }

    /// Returns the row at `rid`, or `None` for RID 0 or past the end.
    #[must_use]
    pub fn get(&self, rid: u32) -> Option<&T> {
        if rid == 0 {
            return None;
        }
        self.rows.get(rid as usize - 1)
    }

    /// Mutable access to the row at `rid`.
    pub fn get_mut(&mut self, rid: u32) -> Option<&mut T> {
        if rid == 0 {
            return None;
        }
        self.rows.get_mut(rid as usize - 1)
    }

    /// Number of rows in the table.
    #[must_use]
    pub fn row_count(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let count = self.rows.len() as u32;
        count
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in RID order.
    #[must_use]
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Iterates over the rows in RID order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.rows.iter()
    }

    /// Iterates mutably over the rows in RID order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.rows.iter_mut()
    }

    /// Stable-sorts the rows by `key` and returns the RID permutation:
    /// entry `old_rid - 1` holds the row's new RID.
    fn sort_with_remap<K: Ord>(&mut self, key: impl Fn(&T) -> K) -> Vec<u32> {
        let keys: Vec<K> = self.rows.iter().map(&key).collect();
        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));

        let mut remap = vec![0u32; self.rows.len()];
        for (new_index, &old_index) in order.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let new_rid = new_index as u32 + 1;
            remap[old_index] = new_rid;
        }

        let mut reordered = Vec::with_capacity(self.rows.len());
        let mut taken: Vec<Option<T>> = self.rows.drain(..).map(Some).collect();
        for &old_index in &order {
            if let Some(row) = taken[old_index].take() {
                reordered.push(row);
            }
        }
        self.rows = reordered;
        remap
    }
}

impl<'a, T> IntoIterator for &'a TableRows<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// The full set of table row vectors produced by a build.
///
/// Field order follows the ECMA table numbering. After
/// [`TablesStore::sort`] the store is frozen: the PE writer reads row
/// counts and row contents, nothing mutates.
#[derive(Debug, Default)]
pub struct TablesStore {
    /// `Module` rows (0x00)
    pub module: TableRows<ModuleRow>,
    /// `TypeRef` rows (0x01)
    pub type_ref: TableRows<TypeRefRow>,
    /// `TypeDef` rows (0x02)
    pub type_def: TableRows<TypeDefRow>,
    /// `Field` rows (0x04)
    pub field: TableRows<FieldRow>,
    /// `MethodDef` rows (0x06)
    pub method_def: TableRows<MethodDefRow>,
    /// `Param` rows (0x08)
    pub param: TableRows<ParamRow>,
    /// `InterfaceImpl` rows (0x09)
    pub interface_impl: TableRows<InterfaceImplRow>,
    /// `MemberRef` rows (0x0A)
    pub member_ref: TableRows<MemberRefRow>,
    /// `Constant` rows (0x0B)
    pub constant: TableRows<ConstantRow>,
    /// `CustomAttribute` rows (0x0C)
    pub custom_attribute: TableRows<CustomAttributeRow>,
    /// `FieldMarshal` rows (0x0D)
    pub field_marshal: TableRows<FieldMarshalRow>,
    /// `DeclSecurity` rows (0x0E)
    pub decl_security: TableRows<DeclSecurityRow>,
    /// `ClassLayout` rows (0x0F)
    pub class_layout: TableRows<ClassLayoutRow>,
    /// `FieldLayout` rows (0x10)
    pub field_layout: TableRows<FieldLayoutRow>,
    /// `StandAloneSig` rows (0x11)
    pub stand_alone_sig: TableRows<StandAloneSigRow>,
    /// `EventMap` rows (0x12)
    pub event_map: TableRows<EventMapRow>,
    /// `Event` rows (0x14)
    pub event: TableRows<EventRow>,
    /// `PropertyMap` rows (0x15)
    pub property_map: TableRows<PropertyMapRow>,
    /// `Property` rows (0x17)
    pub property: TableRows<PropertyRow>,
    /// `MethodSemantics` rows (0x18)
    pub method_semantics: TableRows<MethodSemanticsRow>,
    /// `MethodImpl` rows (0x19)
    pub method_impl: TableRows<MethodImplRow>,
    /// `ModuleRef` rows (0x1A)
    pub module_ref: TableRows<ModuleRefRow>,
    /// `TypeSpec` rows (0x1B)
    pub type_spec: TableRows<TypeSpecRow>,
    /// `ImplMap` rows (0x1C)
    pub impl_map: TableRows<ImplMapRow>,
    /// `FieldRVA` rows (0x1D)
    pub field_rva: TableRows<FieldRvaRow>,
    /// `Assembly` rows (0x20)
    pub assembly: TableRows<AssemblyRow>,
    /// `AssemblyRef` rows (0x23)
    pub assembly_ref: TableRows<AssemblyRefRow>,
    /// `File` rows (0x26)
    pub file: TableRows<FileRow>,
    /// `ExportedType` rows (0x27)
    pub exported_type: TableRows<ExportedTypeRow>,
    /// `ManifestResource` rows (0x28)
    pub manifest_resource: TableRows<ManifestResourceRow>,
    /// `NestedClass` rows (0x29)
    pub nested_class: TableRows<NestedClassRow>,
    /// `GenericParam` rows (0x2A)
    pub generic_param: TableRows<GenericParamRow>,
    /// `MethodSpec` rows (0x2B)
    pub method_spec: TableRows<MethodSpecRow>,
    /// `GenericParamConstraint` rows (0x2C)
    pub generic_param_constraint: TableRows<GenericParamConstraintRow>,
}

impl TablesStore {
    /// Creates a store with every table empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Row count of the table named by `id`.
    #[must_use]
    pub fn row_count(&self, id: TableId) -> u32 {
        match id {
            TableId::Module => self.module.row_count(),
            TableId::TypeRef => self.type_ref.row_count(),
            TableId::TypeDef => self.type_def.row_count(),
            TableId::Field => self.field.row_count(),
            TableId::MethodDef => self.method_def.row_count(),
            TableId::Param => self.param.row_count(),
            TableId::InterfaceImpl => self.interface_impl.row_count(),
            TableId::MemberRef => self.member_ref.row_count(),
            TableId::Constant => self.constant.row_count(),
            TableId::CustomAttribute => self.custom_attribute.row_count(),
            TableId::FieldMarshal => self.field_marshal.row_count(),
            TableId::DeclSecurity => self.decl_security.row_count(),
            TableId::ClassLayout => self.class_layout.row_count(),
            TableId::FieldLayout => self.field_layout.row_count(),
            TableId::StandAloneSig => self.stand_alone_sig.row_count(),
            TableId::EventMap => self.event_map.row_count(),
            TableId::Event => self.event.row_count(),
            TableId::PropertyMap => self.property_map.row_count(),
            TableId::Property => self.property.row_count(),
            TableId::MethodSemantics => self.method_semantics.row_count(),
            TableId::MethodImpl => self.method_impl.row_count(),
            TableId::ModuleRef => self.module_ref.row_count(),
            TableId::TypeSpec => self.type_spec.row_count(),
            TableId::ImplMap => self.impl_map.row_count(),
            TableId::FieldRVA => self.field_rva.row_count(),
            TableId::Assembly => self.assembly.row_count(),
            TableId::AssemblyRef => self.assembly_ref.row_count(),
            TableId::File => self.file.row_count(),
            TableId::ExportedType => self.exported_type.row_count(),
            TableId::ManifestResource => self.manifest_resource.row_count(),
            TableId::NestedClass => self.nested_class.row_count(),
            TableId::GenericParam => self.generic_param.row_count(),
            TableId::MethodSpec => self.method_spec.row_count(),
            TableId::GenericParamConstraint => self.generic_param_constraint.row_count(),
        }
    }

    /// Sorts every table the standard declares as sorted (II.22) by its key
    /// columns and rewrites RIDs into re-ordered tables.
    ///
    /// Four sorted tables can themselves be referenced by RID from other
    /// columns: `GenericParam` (from `GenericParamConstraint.Owner` and
    /// custom-attribute parents) plus `InterfaceImpl`, `DeclSecurity`, and
    /// `GenericParamConstraint` (from custom-attribute parents). Their sort
    /// permutations are applied to the referencing columns before
    /// `CustomAttribute` itself is sorted last.
    ///
    /// # Errors
    /// Returns an error if a `CustomAttribute` parent fails to decode,
    /// which would mean the builder wrote a malformed coded index.
    pub fn sort(&mut self) -> Result<()> {
        tracing::debug!("sorting metadata tables");

        self.class_layout.sort_with_remap(|row| row.parent);
        self.field_layout.sort_with_remap(|row| row.field);
        self.field_rva.sort_with_remap(|row| row.field);
        self.constant.sort_with_remap(|row| row.parent);
        self.field_marshal.sort_with_remap(|row| row.parent);
        self.method_semantics.sort_with_remap(|row| row.association);
        self.method_impl.sort_with_remap(|row| row.class);
        self.impl_map.sort_with_remap(|row| row.member_forwarded);
        self.nested_class.sort_with_remap(|row| row.nested_class);

        let interface_impl_remap = self
            .interface_impl
            .sort_with_remap(|row| (row.class, row.interface));
        let decl_security_remap = self.decl_security.sort_with_remap(|row| row.parent);

        let generic_param_remap = self
            .generic_param
            .sort_with_remap(|row| (row.owner, row.number));
        for row in self.generic_param_constraint.iter_mut() {
            if row.owner != 0 {
                row.owner = generic_param_remap[row.owner as usize - 1];
            }
        }
        let constraint_remap = self.generic_param_constraint.sort_with_remap(|row| row.owner);

        let remaps = [
            (TableId::InterfaceImpl, interface_impl_remap),
            (TableId::DeclSecurity, decl_security_remap),
            (TableId::GenericParam, generic_param_remap),
            (TableId::GenericParamConstraint, constraint_remap),
        ];
        let has_ca = CodedIndexType::HasCustomAttribute;
        for row in self.custom_attribute.iter_mut() {
            let (table, rid) = has_ca.decode(row.parent)?;
            if rid == 0 {
                continue;
            }
            if let Some((_, remap)) = remaps.iter().find(|(remapped, _)| *remapped == table) {
                row.parent = has_ca.encode(table, remap[rid as usize - 1])?;
            }
        }

        self.custom_attribute.sort_with_remap(|row| row.parent);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rids_are_one_based() {
        let mut rows = TableRows::new();
        assert_eq!(rows.create(ModuleRefRow { name: 10 }), 1);
        assert_eq!(rows.create(ModuleRefRow { name: 20 }), 2);
        assert_eq!(rows.get(1).unwrap().name, 10);
        assert!(rows.get(0).is_none());
        assert!(rows.get(3).is_none());
    }

    #[test]
    fn sort_with_remap_is_stable() {
        let mut rows = TableRows::new();
        rows.create(InterfaceImplRow { class: 2, interface: 9 });
        rows.create(InterfaceImplRow { class: 1, interface: 5 });
        rows.create(InterfaceImplRow { class: 2, interface: 5 });
        rows.create(InterfaceImplRow { class: 1, interface: 5 });

        let remap = rows.sort_with_remap(|row| (row.class, row.interface));

        let keys: Vec<_> = rows.iter().map(|r| (r.class, r.interface)).collect();
        assert_eq!(keys, [(1, 5), (1, 5), (2, 5), (2, 9)]);
        // Old rid 2 and old rid 4 share a key; insertion order is kept.
        assert_eq!(remap, [4, 1, 3, 2]);
    }

    #[test]
    fn generic_param_sort_rewrites_constraints() {
        let mut store = TablesStore::new();
        let typedef_owner = CodedIndexType::TypeOrMethodDef
            .encode(TableId::TypeDef, 2)
            .unwrap();
        let method_owner = CodedIndexType::TypeOrMethodDef
            .encode(TableId::MethodDef, 1)
            .unwrap();

        // TypeOrMethodDef(TypeDef, 2) codes to 4, TypeOrMethodDef(
        // MethodDef, 1) codes to 3: emitting the type-owned param first
        // leaves the table unsorted.
        store.generic_param.create(GenericParamRow {
            number: 0,
            flags: 0,
            owner: typedef_owner,
            name: 0,
        });
        store.generic_param.create(GenericParamRow {
            number: 0,
            flags: 0,
            owner: method_owner,
            name: 0,
        });
        store
            .generic_param_constraint
            .create(GenericParamConstraintRow {
                owner: 1,
                constraint: 5,
            });

        store.sort().unwrap();

        assert_eq!(store.generic_param.get(1).unwrap().owner, method_owner);
        assert_eq!(store.generic_param.get(2).unwrap().owner, typedef_owner);
        assert_eq!(store.generic_param_constraint.get(1).unwrap().owner, 2);
    }

    #[test]
    fn custom_attribute_parents_follow_generic_param_sort() {
        let mut store = TablesStore::new();
        let has_ca = CodedIndexType::HasCustomAttribute;
        let owner_b = CodedIndexType::TypeOrMethodDef
            .encode(TableId::TypeDef, 9)
            .unwrap();
        let owner_a = CodedIndexType::TypeOrMethodDef
            .encode(TableId::TypeDef, 3)
            .unwrap();

        store.generic_param.create(GenericParamRow {
            number: 0,
            flags: 0,
            owner: owner_b,
            name: 0,
        });
        store.generic_param.create(GenericParamRow {
            number: 0,
            flags: 0,
            owner: owner_a,
            name: 0,
        });
        store.custom_attribute.create(CustomAttributeRow {
            parent: has_ca.encode(TableId::GenericParam, 1).unwrap(),
            attribute_type: 0,
            value: 0,
        });

        store.sort().unwrap();

        // The generic param that was rid 1 sorted to rid 2.
        let parent = store.custom_attribute.get(1).unwrap().parent;
        assert_eq!(has_ca.decode(parent).unwrap(), (TableId::GenericParam, 2));
    }

    #[test]
    fn custom_attribute_parents_follow_interface_impl_sort() {
        let mut store = TablesStore::new();
        let has_ca = CodedIndexType::HasCustomAttribute;

        store.interface_impl.create(InterfaceImplRow { class: 7, interface: 5 });
        store.interface_impl.create(InterfaceImplRow { class: 2, interface: 5 });
        store.custom_attribute.create(CustomAttributeRow {
            parent: has_ca.encode(TableId::InterfaceImpl, 1).unwrap(),
            attribute_type: 0,
            value: 0,
        });

        store.sort().unwrap();

        // The interface impl for class 7 sorted from rid 1 to rid 2.
        let parent = store.custom_attribute.get(1).unwrap().parent;
        assert_eq!(has_ca.decode(parent).unwrap(), (TableId::InterfaceImpl, 2));
    }

    #[test]
    fn row_count_by_id() {
        let mut store = TablesStore::new();
        store.module_ref.add(ModuleRefRow { name: 1 });
        store.module_ref.add(ModuleRefRow { name: 2 });
        assert_eq!(store.row_count(TableId::ModuleRef), 2);
        assert_eq!(store.row_count(TableId::TypeDef), 0);
    }
}
