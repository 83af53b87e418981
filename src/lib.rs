// Copyright 2025-2026 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]

//! # dotforge
//!
//! A writer of ECMA-335 .NET metadata, built in pure Rust. Given an
//! in-memory model of a managed module (types, members, signatures,
//! references, resources, assembly identity), `dotforge` materializes the
//! metadata **tables** and **heaps** that compose the `#~`/`#-`,
//! `#Strings`, `#US`, `#GUID`, and `#Blob` streams of a managed PE image.
//! The PE container layout, IL body serialization, and low-level row
//! byte emission belong to downstream collaborators; this crate produces
//! the frozen table and heap contents they read.
//!
//! # Architecture
//!
//! - [`crate::metadata::model`] - the input module graph, shared via `Arc`
//! - [`crate::metadata::heaps`] - append-and-dedup heap builders
//! - [`crate::metadata::tables`] - table identifiers, coded indices, row
//!   schemas, and the typed row store with its sort pass
//! - [`crate::metadata::signatures`] - signature trees and blob encoders
//! - [`crate::builder`] - the construction walk (normal and preserving
//!   strategies), RID registry, and the [`crate::builder::MetadataWriter`]
//!   orchestrator
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use dotforge::prelude::*;
//!
//! // The synthetic <Module> type every module owns at TypeDef RID 1.
//! let global = Arc::new(TypeDef {
//!     name: "<Module>".into(),
//!     ..TypeDef::default()
//! });
//!
//! let module = ModuleDef {
//!     name: "Hello.dll".into(),
//!     types: vec![global],
//!     ..ModuleDef::default()
//! };
//!
//! let built = MetadataWriter::new(&module).build()?;
//! assert_eq!(built.tables.module.row_count(), 1);
//! assert_eq!(built.tables_stream_name(), "#~");
//! # Ok::<(), dotforge::Error>(())
//! ```
//!
//! # Standards Compliance
//!
//! `dotforge` follows the **ECMA-335 specification** (6th edition):
//! table schemas and sort requirements per II.22, heap formats per
//! II.24.2, signature encoding per II.23.2, coded indices per II.24.2.6.
//!
//! ### References
//!
//! - [ECMA-335 Standard](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf) - Official CLI specification
//! - [.NET Runtime](https://github.com/dotnet/runtime) - Microsoft's reference implementation
//!
//! # Error Handling
//!
//! Fatal structural errors abort [`builder::MetadataWriter::build`] with a
//! crate-level [`Error`]; tolerable input oddities are reported as
//! [`Warning`]s through a [`WarningSink`] and never stop the build.
//!
//! # Thread Safety
//!
//! Construction is single-threaded by design: heaps and tables are owned
//! mutably by one builder, then frozen. The resulting
//! [`builder::BuiltMetadata`] is immutable and safe to read from any
//! thread.

mod error;
pub(crate) mod utils;

pub mod builder;
pub mod metadata;

pub use error::{Error, Result, Warning, WarningLog, WarningSink};

/// Convenient re-exports of the most commonly used types.
pub mod prelude {
    pub use crate::builder::{
        BuiltMetadata, DataStore, MetadataOptions, MetadataWriter, SourceStreams,
    };
    pub use crate::metadata::model::{
        AssemblyDef, AssemblyLinkedResource, AssemblyRef, ClassLayoutDef, ConstantDef,
        ConstantValue, CustomAttribute, CustomAttributeCtor, DeclSecurityDef, EmbeddedResource,
        EventDef, ExportedType, ExportedTypeImpl, FieldDef, FileDef, FileLinkedResource,
        GenericParamDef, ImplMapDef, InterfaceImplDef, MemberRef, MemberRefParent,
        MemberRefSignature, MethodDef, MethodDefOrRef, MethodOverride, MethodSpec, ModuleDef,
        ModuleRef, ParamDef, PropertyDef, Resource, ResolutionScope, StandAloneSig,
        StandAloneSignature, TokenProvider, TypeDef, TypeDefOrRef, TypeRef, TypeSpec, Version,
    };
    pub use crate::metadata::signatures::{
        FieldSig, GenericInstMethodSig, LocalVarSig, MethodSig, ParamSig, PropertySig, TypeSig,
    };
    pub use crate::metadata::tables::{CodedIndexType, TableId};
    pub use crate::metadata::token::Token;
    pub use crate::{Error, Result, Warning, WarningLog, WarningSink};
}
