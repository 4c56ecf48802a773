/*!
 * # wikigloss
 *
 * Turns Wiktionary definition markup into plain-text glosses.
 *
 * ## Features
 *
 * - Streams MediaWiki XML dumps and extracts the definition lines of one language
 * - Resolves the templates and modules each definition invokes, transitively,
 *   with one fetch per dependency shared by every concurrent caller
 * - Rewrites markup into plain text with an ordered, fixed-point rule pipeline
 * - Retries definitions whose dependencies failed transiently, and reports
 *   what never resolved
 * - Persists definitions and dependency bodies in SQLite
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `markup`: invocation scanner, wikilinks, entities
 * - `dependencies`: dependency names, the shared store and the resolver
 * - `fetchers`: the `Fetcher` trait, the MediaWiki API client and a mock
 * - `rewrite`: the normalizer and its rules
 * - `source`: streaming dump reader
 * - `extractor`: definition lines by language and part of speech
 * - `processor`: per-definition outcome, retries and sinks
 * - `database`: SQLite persistence
 * - `reporter`: run reports
 * - `app_config` / `app_controller`: configuration and the processing run
 * - `language_utils`: ISO language code utilities
 * - `errors`: custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod dependencies;
pub mod errors;
pub mod extractor;
pub mod fetchers;
pub mod language_utils;
pub mod markup;
pub mod processor;
pub mod reporter;
pub mod rewrite;
pub mod source;

// Re-export main types for easier usage
pub use app_config::Config;
pub use dependencies::{DependencyName, DependencyResolver, DependencyStatus, DependencyStore, ResolutionResult};
pub use errors::{AppError, FetchError, MarkupError, RuleError};
pub use extractor::{DefinitionExtractor, RawDefinition};
pub use fetchers::{FetchOutcome, Fetcher, MockFetcher};
pub use processor::{DefinitionOutcome, DefinitionProcessor, ProcessedDefinition};
pub use rewrite::{Normalizer, normalize};
