//! Raw-text fallback import.
//!
//! Copyright (c) 2025 Posit, PBC

use crate::context::AssetImportContext;
use crate::types::{ImportedAsset, SourceAsset, TextAsset};

/// Identifier of the text object attached by the fallback path.
pub const TEXT_OBJECT: &str = "text";

/// Attach the unprocessed source as an opaque text object and make it the main object.
///
/// Declares no dependencies and runs no compiler.
pub fn import_as_text(ctx: &mut dyn AssetImportContext, source: &SourceAsset) {
    ctx.add_object_to_asset(
        TEXT_OBJECT,
        ImportedAsset::RawText(TextAsset::new(source.content.clone())),
    );
    ctx.set_main_object(TEXT_OBJECT);
}
