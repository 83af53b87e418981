//! Preservation-mode tests: heap seeding keeps source offsets stable.

use std::sync::Arc;

use dotforge::prelude::*;

fn global_type() -> Arc<TypeDef> {
    Arc::new(TypeDef {
        name: "<Module>".into(),
        ..TypeDef::default()
    })
}

fn named_class(name: &str) -> Arc<TypeDef> {
    Arc::new(TypeDef {
        name: name.into(),
        namespace: "Lib".into(),
        ..TypeDef::default()
    })
}

fn string_at(heap: &[u8], offset: u32) -> &str {
    let start = offset as usize;
    let end = heap[start..]
        .iter()
        .position(|b| *b == 0)
        .map(|p| start + p)
        .expect("unterminated string");
    std::str::from_utf8(&heap[start..end]).unwrap()
}

#[test]
fn preserved_strings_keep_their_offsets() {
    let module = ModuleDef {
        name: "Source.dll".into(),
        types: vec![global_type(), named_class("Widget"), named_class("Gadget")],
        ..ModuleDef::default()
    };
    let original = MetadataWriter::new(&module).build().unwrap();
    let original_offsets: Vec<u32> = original
        .tables
        .type_def
        .iter()
        .map(|row| row.name)
        .collect();

    // Rebuild the same module against the original heap bytes: every
    // string resolves to its source offset.
    let rebuilt = MetadataWriter::new(&module)
        .with_options(MetadataOptions::PRESERVE_STRINGS_OFFSETS)
        .with_source_streams(SourceStreams {
            strings: Some(&original.strings),
            ..SourceStreams::default()
        })
        .build()
        .unwrap();

    let rebuilt_offsets: Vec<u32> = rebuilt
        .tables
        .type_def
        .iter()
        .map(|row| row.name)
        .collect();
    assert_eq!(original_offsets, rebuilt_offsets);
    assert_eq!(&rebuilt.strings[..original.strings.len()], &original.strings[..]);
}

#[test]
fn new_strings_append_beyond_preserved_content() {
    let module = ModuleDef {
        name: "Source.dll".into(),
        types: vec![global_type(), named_class("Widget")],
        ..ModuleDef::default()
    };
    let original = MetadataWriter::new(&module).build().unwrap();

    let grown = ModuleDef {
        name: "Source.dll".into(),
        types: vec![
            global_type(),
            named_class("Widget"),
            named_class("BrandNewType"),
        ],
        ..ModuleDef::default()
    };
    let rebuilt = MetadataWriter::new(&grown)
        .with_options(MetadataOptions::PRESERVE_STRINGS_OFFSETS)
        .with_source_streams(SourceStreams {
            strings: Some(&original.strings),
            ..SourceStreams::default()
        })
        .build()
        .unwrap();

    let new_row = rebuilt.tables.type_def.get(3).unwrap();
    assert!(new_row.name as usize >= original.strings.len());
    assert_eq!(
        string_at(&rebuilt.strings, rebuilt.tables.type_def.get(2).unwrap().name),
        "Widget"
    );
}

#[test]
fn preserved_blobs_keep_their_offsets() {
    fn module_with_field() -> ModuleDef {
        let field = Arc::new(FieldDef {
            flags: 0,
            name: "x".into(),
            signature: FieldSig::new(TypeSig::I8),
            layout_offset: None,
            marshal: None,
            rva_data: None,
            impl_map: None,
            constant: None,
            custom_attributes: vec![],
        });
        ModuleDef {
            name: "Source.dll".into(),
            types: vec![
                global_type(),
                Arc::new(TypeDef {
                    name: "C".into(),
                    fields: vec![Some(field)],
                    ..TypeDef::default()
                }),
            ],
            ..ModuleDef::default()
        }
    }

    let original = MetadataWriter::new(&module_with_field()).build().unwrap();
    let original_sig = original.tables.field.get(1).unwrap().signature;

    let rebuilt = MetadataWriter::new(&module_with_field())
        .with_options(MetadataOptions::PRESERVE_BLOB_OFFSETS)
        .with_source_streams(SourceStreams {
            blobs: Some(&original.blobs),
            ..SourceStreams::default()
        })
        .build()
        .unwrap();

    assert_eq!(rebuilt.tables.field.get(1).unwrap().signature, original_sig);
}

#[test]
fn preserve_tokens_selects_unoptimized_stream() {
    let module = ModuleDef {
        name: "Source.dll".into(),
        types: vec![global_type()],
        ..ModuleDef::default()
    };

    let built = MetadataWriter::new(&module)
        .with_options(MetadataOptions::PRESERVE_TOKENS)
        .build()
        .unwrap();
    assert_eq!(built.tables_stream_name(), "#-");

    let normal = MetadataWriter::new(&module).build().unwrap();
    assert_eq!(normal.tables_stream_name(), "#~");
}

#[test]
fn malformed_source_heap_is_rejected() {
    let module = ModuleDef {
        name: "Source.dll".into(),
        types: vec![global_type()],
        ..ModuleDef::default()
    };

    // #Strings must start with the reserved zero byte.
    let result = MetadataWriter::new(&module)
        .with_options(MetadataOptions::PRESERVE_STRINGS_OFFSETS)
        .with_source_streams(SourceStreams {
            strings: Some(&[0x41, 0x00]),
            ..SourceStreams::default()
        })
        .build();
    assert!(matches!(result, Err(Error::MalformedHeap(_))));
}

#[test]
fn preserved_guids_keep_their_indices() {
    let mvid = uuid::Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
    let module = ModuleDef {
        name: "Source.dll".into(),
        mvid: Some(mvid),
        types: vec![global_type()],
        ..ModuleDef::default()
    };
    let original = MetadataWriter::new(&module).build().unwrap();
    assert_eq!(original.tables.module.get(1).unwrap().mvid, 1);

    let rebuilt = MetadataWriter::new(&module)
        .with_options(MetadataOptions::PRESERVE_TOKENS)
        .with_source_streams(SourceStreams {
            guids: Some(&original.guids),
            ..SourceStreams::default()
        })
        .build()
        .unwrap();
    assert_eq!(rebuilt.tables.module.get(1).unwrap().mvid, 1);
    assert_eq!(rebuilt.guids, original.guids);
}
