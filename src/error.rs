use thiserror::Error;

use crate::metadata::tables::{CodedIndexType, TableId};

/// The generic Error type covering every fatal failure the metadata build
/// can produce.
///
/// The build either completes in full or aborts with one of these; partial
/// output is never exposed. Non-fatal conditions are reported through
/// [`Warning`] instead and do not stop the build.
#[derive(Error, Debug)]
pub enum Error {
    /// The module graph has no `<Module>` type.
    ///
    /// Every managed module owns a synthetic global type at `TypeDef` RID 1.
    /// A graph whose type list is empty cannot produce a valid image.
    #[error("Module has no <Module> type")]
    MissingGlobalType,

    /// A cross-reference targets a table that the required coded index kind
    /// cannot represent.
    ///
    /// Coded index kinds admit a fixed set of tables (ECMA-335 II.24.2.6).
    /// Hitting this means the graph placed an entity into a column that can
    /// never legally encode it.
    #[error("{table:?} rows cannot be encoded in a {kind:?} coded index")]
    CodedIndexTarget {
        /// The coded index kind the column requires
        kind: CodedIndexType,
        /// The table of the entity the graph supplied
        table: TableId,
    },

    /// A RID was registered twice for the same logical entity.
    ///
    /// The registry rejects double insertion; a duplicate indicates a walk
    /// bug, not a graph problem.
    #[error("Duplicate RID registration in the {0} registry")]
    DuplicateRid(&'static str),

    /// A signature could not be serialized.
    ///
    /// Raised for structurally impossible signatures, e.g. parameter counts
    /// beyond the compressed-integer range.
    #[error("Cannot encode signature - {0}")]
    SignatureEncoding(String),

    /// A source heap supplied for preservation seeding is malformed.
    ///
    /// Preserved heaps are parsed to index their existing content; raw bytes
    /// that do not follow the stream format are rejected up front.
    #[error("Malformed source heap - {0}")]
    MalformedHeap(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal graph diagnostics recorded during the build.
///
/// Warnings describe input oddities the writer tolerates: the affected row
/// is skipped or written with a fallback value and the build continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A member list contained `None` where an entity was expected.
    #[error("{owner}: null {kind} entry at index {index}")]
    NullEntity {
        /// Name of the owning type or method
        owner: String,
        /// The kind of list entry that was null ("field", "method", ...)
        kind: &'static str,
        /// Zero-based position within the owning list
        index: usize,
    },

    /// A constant's declared element type disagrees with its value kind.
    ///
    /// The value is encoded from its actual kind; the declared type is kept
    /// in the `Constant` row unchanged.
    #[error("Constant declared as element type 0x{declared:02x} holds a {value_kind} value")]
    ConstantTypeMismatch {
        /// The `ElementType` recorded on the constant
        declared: u8,
        /// Human-readable kind of the actual value
        value_kind: &'static str,
    },

    /// A constant's declared element type is not one the writer recognizes.
    /// Eight zero bytes are emitted in its place.
    #[error("Unrecognized constant element type 0x{declared:02x}")]
    UnknownConstantType {
        /// The unrecognized `ElementType` value
        declared: u8,
    },

    /// The token service received a request it cannot satisfy and answered
    /// with the invalid sentinel token.
    #[error("Cannot create token - {0}")]
    UnsupportedTokenRequest(String),
}

/// Receiver for [`Warning`]s produced during the build.
///
/// The host supplies a sink to `build_with_sink`; warnings are delivered in
/// emission order. Every warning is also mirrored through `tracing::warn!`,
/// so a host that only wants logs can pass a [`WarningLog`] and discard it.
pub trait WarningSink {
    /// Delivers one warning to the host.
    fn warn(&mut self, warning: Warning);
}

/// Vec-backed [`WarningSink`] used when the host does not bring its own.
#[derive(Debug, Default)]
pub struct WarningLog {
    entries: Vec<Warning>,
}

impl WarningLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All warnings recorded so far, in emission order.
    #[must_use]
    pub fn entries(&self) -> &[Warning] {
        &self.entries
    }

    /// Returns true if no warnings were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl WarningSink for WarningLog {
    fn warn(&mut self, warning: Warning) {
        self.entries.push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_log_records_in_order() {
        let mut log = WarningLog::new();
        assert!(log.is_empty());

        log.warn(Warning::UnknownConstantType { declared: 0x1A });
        log.warn(Warning::NullEntity {
            owner: "N.C".into(),
            kind: "field",
            index: 2,
        });

        assert_eq!(log.entries().len(), 2);
        assert!(matches!(
            log.entries()[0],
            Warning::UnknownConstantType { declared: 0x1A }
        ));
    }

    #[test]
    fn warning_display() {
        let warning = Warning::ConstantTypeMismatch {
            declared: 0x08,
            value_kind: "string",
        };
        assert_eq!(
            warning.to_string(),
            "Constant declared as element type 0x08 holds a string value"
        );
    }
}
