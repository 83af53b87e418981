//! Build orchestration: option bits, builder selection, byte-chunk
//! stores, and the frozen output handed to the PE writer.
//!
//! [`MetadataWriter`] is the entry point: configure it with a module
//! graph and options, call [`MetadataWriter::build`], read the resulting
//! [`BuiltMetadata`]. Construction is strictly single-threaded; the
//! output is immutable and `Send + Sync`.

mod constants;
mod normal;
mod preserving;
mod registry;

pub use normal::NormalTablesBuilder;
pub use preserving::PreservingTablesBuilder;
pub use registry::{RidMap, RidRegistry, TypeRefMap};

use bitflags::bitflags;

use crate::{
    error::{WarningLog, WarningSink},
    metadata::{
        heaps::{BlobHeapBuilder, GuidHeapBuilder, StringsHeapBuilder, UserStringsHeapBuilder},
        model::ModuleDef,
        tables::TablesStore,
    },
    Error, Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    /// Option bits selecting the build strategy.
    ///
    /// Setting any bit switches from the normal builder to the preserving
    /// builder. Options must be chosen before [`MetadataWriter::build`];
    /// there is no way to change them afterwards.
    pub struct MetadataOptions : u32 {
        /// Keep source-module tokens stable; also selects the `#-`
        /// (unoptimized) tables stream and seeds the `#GUID` heap
        const PRESERVE_TOKENS = 0x0001;
        /// Seed `#Strings` so preserved strings keep their offsets
        const PRESERVE_STRINGS_OFFSETS = 0x0002;
        /// Seed `#US` so preserved string literals keep their offsets
        const PRESERVE_US_OFFSETS = 0x0004;
        /// Seed `#Blob` so preserved blobs keep their offsets
        const PRESERVE_BLOB_OFFSETS = 0x0008;
    }
}

/// Raw source-module streams used for preservation seeding.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceStreams<'a> {
    /// Raw `#Strings` stream bytes
    pub strings: Option<&'a [u8]>,
    /// Raw `#US` stream bytes
    pub user_strings: Option<&'a [u8]>,
    /// Raw `#Blob` stream bytes
    pub blobs: Option<&'a [u8]>,
    /// Raw `#GUID` stream bytes
    pub guids: Option<&'a [u8]>,
}

/// Append-only byte-chunk store shared with external collaborators.
///
/// The orchestrator owns three: initialized field data, method bodies,
/// and embedded resources. Offsets returned by `append` are relative to
/// the store's start; the PE writer assigns the final RVAs during layout.
#[derive(Debug, Default)]
pub struct DataStore {
    data: Vec<u8>,
}

impl DataStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw bytes and returns the offset they start at.
    pub fn append(&mut self, bytes: &[u8]) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(bytes);
        offset
    }

    /// Appends a 4-byte little-endian length followed by the bytes and
    /// returns the offset of the length prefix. Embedded resources use
    /// this framing.
    pub fn append_with_length(&mut self, bytes: &[u8]) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let offset = self.data.len() as u32;
        #[allow(clippy::cast_possible_truncation)]
        let length = bytes.len() as u32;
        self.data.extend_from_slice(&length.to_le_bytes());
        self.data.extend_from_slice(bytes);
        offset
    }

    /// The accumulated bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Current size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing was appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// What a tables builder produces: populated tables and heap builders.
pub struct BuilderOutput {
    /// The populated tables, already sorted
    pub tables: TablesStore,
    /// The populated `#Strings` heap
    pub strings: StringsHeapBuilder,
    /// The populated `#US` heap
    pub user_strings: UserStringsHeapBuilder,
    /// The populated `#GUID` heap
    pub guids: GuidHeapBuilder,
    /// The populated `#Blob` heap
    pub blobs: BlobHeapBuilder,
}

/// Strategy interface: one operation, run the construction walk.
///
/// Two implementations exist, [`NormalTablesBuilder`] and
/// [`PreservingTablesBuilder`]; the orchestrator selects by option bits.
pub trait TablesBuilder {
    /// Consumes the builder and yields the populated tables and heaps.
    ///
    /// # Errors
    /// Fatal structural errors abort the build; no partial output is
    /// produced.
    fn build(self: Box<Self>) -> Result<BuilderOutput>;
}

/// The frozen result of a build, read by the PE writer.
#[derive(Debug)]
pub struct BuiltMetadata {
    /// Populated metadata tables in final sorted order
    pub tables: TablesStore,
    /// Final `#Strings` heap bytes
    pub strings: Vec<u8>,
    /// Final `#US` heap bytes
    pub user_strings: Vec<u8>,
    /// Final `#GUID` heap bytes
    pub guids: Vec<u8>,
    /// Final `#Blob` heap bytes
    pub blobs: Vec<u8>,
    /// Initialized field data referenced by `FieldRVA` rows
    pub constants: DataStore,
    /// Serialized method bodies appended by the IL writer
    pub method_bodies: DataStore,
    /// Embedded resource data referenced by `ManifestResource` rows
    pub net_resources: DataStore,
    /// Warnings recorded during the build when no external sink was
    /// supplied
    pub warnings: WarningLog,
    uses_uncompressed_stream: bool,
}

impl BuiltMetadata {
    /// Name of the tables stream to frame: `#~` normally, `#-` when
    /// tokens are preserved.
    #[must_use]
    pub fn tables_stream_name(&self) -> &'static str {
        if self.uses_uncompressed_stream {
            "#-"
        } else {
            "#~"
        }
    }
}

/// Orchestrates a metadata build for one module.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use dotforge::builder::MetadataWriter;
/// use dotforge::metadata::model::{ModuleDef, TypeDef};
///
/// let module = ModuleDef {
///     name: "Empty.dll".into(),
///     types: vec![Arc::new(TypeDef {
///         name: "<Module>".into(),
///         ..TypeDef::default()
///     })],
///     ..ModuleDef::default()
/// };
///
/// let built = MetadataWriter::new(&module).build()?;
/// assert_eq!(built.tables.type_def.row_count(), 1);
/// # Ok::<(), dotforge::Error>(())
/// ```
pub struct MetadataWriter<'a> {
    module: &'a ModuleDef,
    options: MetadataOptions,
    source: SourceStreams<'a>,
    constants: DataStore,
    method_bodies: DataStore,
    net_resources: DataStore,
}

impl<'a> MetadataWriter<'a> {
    /// Creates a writer for `module` with default options.
    #[must_use]
    pub fn new(module: &'a ModuleDef) -> Self {
        MetadataWriter {
            module,
            options: MetadataOptions::empty(),
            source: SourceStreams::default(),
            constants: DataStore::new(),
            method_bodies: DataStore::new(),
            net_resources: DataStore::new(),
        }
    }

    /// Sets the option bits. Must be called before [`MetadataWriter::build`].
    #[must_use]
    pub fn with_options(mut self, options: MetadataOptions) -> Self {
        self.options = options;
        self
    }

    /// Supplies the source-module streams preservation seeds from.
    #[must_use]
    pub fn with_source_streams(mut self, source: SourceStreams<'a>) -> Self {
        self.source = source;
        self
    }

    /// The store for initialized field data; the host may pre-fill it.
    pub fn constants_mut(&mut self) -> &mut DataStore {
        &mut self.constants
    }

    /// The store for method bodies; filled by the IL writer.
    pub fn method_bodies_mut(&mut self) -> &mut DataStore {
        &mut self.method_bodies
    }

    /// The store for embedded resources.
    pub fn net_resources_mut(&mut self) -> &mut DataStore {
        &mut self.net_resources
    }

    /// Runs the build, collecting warnings into the returned
    /// [`BuiltMetadata`].
    ///
    /// # Errors
    /// Fatal structural errors (missing `<Module>` type, unencodable
    /// cross-reference, malformed preservation seed) abort the build.
    pub fn build(self) -> Result<BuiltMetadata> {
        let mut log = WarningLog::new();
        let mut built = self.build_with_sink(&mut log)?;
        built.warnings = log;
        Ok(built)
    }

    /// Runs the build, delivering warnings to `sink` as they occur.
    ///
    /// # Errors
    /// Same failure modes as [`MetadataWriter::build`].
    pub fn build_with_sink(self, sink: &mut dyn WarningSink) -> Result<BuiltMetadata> {
        let MetadataWriter {
            module,
            options,
            source,
            mut constants,
            method_bodies,
            mut net_resources,
        } = self;

        if module.types.is_empty() {
            return Err(Error::MissingGlobalType);
        }

        tracing::debug!(module = %module.name, ?options, "starting metadata build");

        let builder: Box<dyn TablesBuilder + '_> = if options.is_empty() {
            Box::new(NormalTablesBuilder::new(
                module,
                sink,
                &mut constants,
                &mut net_resources,
            ))
        } else {
            Box::new(PreservingTablesBuilder::new(
                module,
                options,
                &source,
                sink,
                &mut constants,
                &mut net_resources,
            )?)
        };

        let output = builder.build()?;

        Ok(BuiltMetadata {
            tables: output.tables,
            strings: output.strings.into_bytes(),
            user_strings: output.user_strings.into_bytes(),
            guids: output.guids.into_bytes(),
            blobs: output.blobs.into_bytes(),
            constants,
            method_bodies,
            net_resources,
            warnings: WarningLog::new(),
            uses_uncompressed_stream: options.contains(MetadataOptions::PRESERVE_TOKENS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_store_raw_append() {
        let mut store = DataStore::new();
        assert_eq!(store.append(&[1, 2, 3]), 0);
        assert_eq!(store.append(&[4]), 3);
        assert_eq!(store.data(), &[1, 2, 3, 4]);
    }

    #[test]
    fn data_store_length_framing() {
        let mut store = DataStore::new();
        let first = store.append_with_length(&[0xAA, 0xBB]);
        let second = store.append_with_length(&[0xCC]);
        assert_eq!(first, 0);
        assert_eq!(second, 6);
        assert_eq!(
            store.data(),
            &[0x02, 0x00, 0x00, 0x00, 0xAA, 0xBB, 0x01, 0x00, 0x00, 0x00, 0xCC]
        );
    }

    #[test]
    fn empty_module_is_fatal() {
        let module = ModuleDef {
            name: "Empty.dll".into(),
            ..ModuleDef::default()
        };
        assert!(matches!(
            MetadataWriter::new(&module).build(),
            Err(Error::MissingGlobalType)
        ));
    }
}
