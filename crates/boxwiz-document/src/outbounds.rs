//! The `outbounds` array with its generated region.
//!
//! Generated entries sit between two marker comments that downstream
//! tools locate by string match:
//!
//! ```text
//! [
//!     /** @ParserSTART */
//!     {generated-1},
//!     {generated-2},
//!     /** @ParserEND */
//!     {static-1},
//!     {static-2}
//!   ]
//! ```

use boxwiz_core::util::compact_json;
use boxwiz_parser::GenerationResult;
use boxwiz_types::BuildMode;
use serde_json::value::RawValue;

use crate::format::{indent, indent_multiline};

/// Opening marker of the generated region.
pub const PARSER_START_MARKER: &str = "/** @ParserSTART */";

/// Closing marker of the generated region.
pub const PARSER_END_MARKER: &str = "/** @ParserEND */";

/// Template-declared entries of an `outbounds` section, compacted.
///
/// Entries that do not re-serialize are kept as written. A section that is
/// not an array yields no entries.
pub fn static_outbounds(raw: &str) -> Vec<String> {
    let Ok(entries) = serde_json::from_str::<Vec<Box<RawValue>>>(raw) else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|entry| compact_json(entry.get()).unwrap_or_else(|_| entry.get().to_string()))
        .collect()
}

/// Render the whole `outbounds` array, brackets included.
///
/// In preview mode a generation above `preview_limit` nodes is replaced
/// by a two-line count summary.
pub fn assemble_outbounds(
    template_raw: &str,
    generated: &GenerationResult,
    mode: BuildMode,
    preview_limit: usize,
) -> String {
    let statics = static_outbounds(template_raw);
    let pad = indent(2);

    let mut out = String::from("[\n");
    out.push_str(&pad);
    out.push_str(PARSER_START_MARKER);
    out.push('\n');

    if mode.is_preview() && generated.nodes_count > preview_limit {
        out.push_str(&format!(
            "{}// Generated: {} nodes, {} local selectors, {} global selectors\n",
            pad, generated.nodes_count, generated.local_selectors_count, generated.global_selectors_count
        ));
        out.push_str(&format!("{}// Total outbounds: {}\n", pad, generated.total()));
    } else {
        let last = generated.outbounds_json.len().saturating_sub(1);
        for (i, entry) in generated.outbounds_json.iter().enumerate() {
            let entry = entry.trim_end_matches(|c| matches!(c, ',' | '\n' | '\r' | '\t' | ' '));
            out.push_str(&indent_multiline(entry, &pad));
            if i < last || !statics.is_empty() {
                out.push(',');
            }
            out.push('\n');
        }
    }

    out.push_str(&pad);
    out.push_str(PARSER_END_MARKER);

    for (i, entry) in statics.iter().enumerate() {
        out.push_str(if i == 0 { "\n" } else { ",\n" });
        out.push_str(&pad);
        out.push_str(entry);
    }
    out.push('\n');
    out.push_str(&indent(1));
    out.push(']');
    out
}
