//! CLI flags.

mod dtl;
pub(crate) use dtl::{DtlArgs, StorageKind};
