//! Attach executable source text to GraphQL field definitions.
//!
//! A schema author annotates a field with `@code(source: "...")` and the
//! attached source runs, per request, as that field's resolver inside a
//! freshly built, isolated script realm. The realm sees exactly four
//! bindings — `rootValue`, `args`, `context`, `resolveInfo` — plus whatever
//! host functions the deployment registered on the [`Context`]. The source
//! consists of statements and must `return` a value (plain or pending) or
//! `throw` to fail the field:
//!
//! ```text
//! directive @code(source: String!) on FIELD_DEFINITION
//!
//! type Query {
//!     greeting(name: String): String
//!         @code(source: "return `hello, ${args.name}!`;")
//! }
//! ```
//!
//! Execution is launched fire-and-forget on the blocking pool and bridged
//! back through a per-invocation completion channel, so a slow or stuck
//! script never stalls sibling resolutions. A thrown error crosses the
//! isolation boundary as that field's failure — message text only — while
//! sibling fields resolve normally.
//!
//! Two installation styles cover the same mechanism:
//! [`CodeDirectiveVisitor`] eagerly rewrites a schema's resolvers in place,
//! while [`CodeDirective`] pairs a renameable declaration
//! ([`CodeDirective::type_defs`]) with a schema-to-schema transform so
//! independently configured directive names can coexist.

#![warn(unreachable_pub)]

mod completion;
mod context;
pub mod directive;
pub mod error;
pub mod graphql;
pub mod json_ext;
mod resolver;
mod sandbox;
mod schema;
mod transform;

pub use context::BoxError;
pub use context::Context;
pub use context::HostFunction;
pub use directive::DEFAULT_DIRECTIVE_NAME;
pub use directive::FieldCoordinate;
pub use directive::FieldSource;
pub use directive::type_defs;
pub use resolver::BoxResolver;
pub use resolver::CodeOptions;
pub use resolver::ResolveInfo;
pub use resolver::ResolverRequest;
pub use resolver::resolver_from_source;
pub use schema::FieldSelection;
pub use schema::Schema;
pub use transform::CodeDirective;
pub use transform::CodeDirectiveVisitor;
pub use transform::Conf;
