/*!
 * Markup primitives shared by the rewrite rules and the dependency scanner.
 *
 * - `scanner`: balanced `{{...}}` scanning, argument splitting and bottom-up rewriting
 * - `entities`: HTML entity decoding
 * - `links`: wikilink, external link and reference handling
 */

pub mod entities;
pub mod links;
pub mod scanner;

pub use entities::decode_entities;
pub use links::{collapse_external_links, collapse_wikilinks, strip_references};
pub use scanner::{
    Argument, Invocation, MAX_NESTING_DEPTH, Span, map_invocations, normalize_title,
    scan_invocations, split_params,
};
