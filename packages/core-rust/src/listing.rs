//! XML listings of available resources.
//!
//! Used for discovery responses (`/`, `/{system}`) and by backends that list
//! their collections:
//!
//! ```xml
//! <jax-rx:results xmlns:jax-rx="http://jax-rx.sourceforge.net">
//!   <jax-rx:resource name="dom"/>
//! </jax-rx:results>
//! ```

use crate::constants::JAXRX_NAMESPACE;
use crate::output::StreamingOutput;

/// Streams a listing of the given resource names, one chunk per entry.
#[must_use]
pub fn resource_listing(resources: Vec<String>) -> StreamingOutput {
    let open = format!("<jax-rx:results xmlns:jax-rx=\"{JAXRX_NAMESPACE}\">");
    let entries = resources
        .into_iter()
        .map(|name| format!("<jax-rx:resource name=\"{}\"/>", escape_attribute(&name)));
    let chunks = std::iter::once(open)
        .chain(entries)
        .chain(std::iter::once("</jax-rx:results>".to_string()));
    StreamingOutput::from_chunks(chunks)
}

/// Escapes a string for use inside a double-quoted XML attribute.
#[must_use]
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\n' => out.push_str("&#10;"),
            '\t' => out.push_str("&#9;"),
            c => out.push(c),
        }
    }
    out
}
