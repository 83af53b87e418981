//! The preserving tables builder: keeps source-module heap offsets stable.
//!
//! Active when any preservation option bit is set. The four heaps are
//! seeded with the source module's raw stream bytes, so every string,
//! blob, or GUID that already existed resolves to its original offset and
//! new content appends beyond the original end. The table walk itself is
//! shared with the normal builder; table-level RID preservation (emitting
//! placeholder rows to keep original RIDs) is not performed.

use crate::{
    builder::{BuilderOutput, DataStore, MetadataOptions, SourceStreams, TablesBuilder},
    metadata::model::ModuleDef,
    Result, WarningSink,
};

use super::normal::BuildContext;

/// Builder for the preserving strategy: heap offsets of a source module
/// are retained, tables are rebuilt in walk order.
pub struct PreservingTablesBuilder<'a> {
    ctx: BuildContext<'a>,
}

impl<'a> PreservingTablesBuilder<'a> {
    /// Creates a builder over `module`, seeding heaps from `source`
    /// according to the option bits.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedHeap`] when a supplied source
    /// stream does not follow its heap format.
    pub fn new(
        module: &'a ModuleDef,
        options: MetadataOptions,
        source: &SourceStreams<'a>,
        sink: &'a mut dyn WarningSink,
        constants_data: &'a mut DataStore,
        net_resources: &'a mut DataStore,
    ) -> Result<Self> {
        let mut ctx = BuildContext::new(module, sink, constants_data, net_resources);

        if options.contains(MetadataOptions::PRESERVE_STRINGS_OFFSETS) {
            if let Some(raw) = source.strings {
                tracing::debug!(bytes = raw.len(), "seeding #Strings from source module");
                ctx.seed_strings(raw)?;
            }
        }
        if options.contains(MetadataOptions::PRESERVE_US_OFFSETS) {
            if let Some(raw) = source.user_strings {
                tracing::debug!(bytes = raw.len(), "seeding #US from source module");
                ctx.seed_user_strings(raw)?;
            }
        }
        if options.contains(MetadataOptions::PRESERVE_BLOB_OFFSETS) {
            if let Some(raw) = source.blobs {
                tracing::debug!(bytes = raw.len(), "seeding #Blob from source module");
                ctx.seed_blobs(raw)?;
            }
        }
        if options.contains(MetadataOptions::PRESERVE_TOKENS) {
            if let Some(raw) = source.guids {
                tracing::debug!(bytes = raw.len(), "seeding #GUID from source module");
                ctx.seed_guids(raw)?;
            }
        }

        Ok(PreservingTablesBuilder { ctx })
    }
}

impl TablesBuilder for PreservingTablesBuilder<'_> {
    fn build(mut self: Box<Self>) -> Result<BuilderOutput> {
        self.ctx.build_tables()?;
        Ok(self.ctx.into_output())
    }
}
