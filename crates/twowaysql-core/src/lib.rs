//! # twowaysql-core
//!
//! A two-way SQL template engine. Two-way SQL is source text that executes
//! as ordinary SQL with its literal default values, and doubles as a
//! parameterized template when processed by this engine: parameter
//! comments bind named inputs, list parameters expand into IN clauses,
//! conditions whose parameters are absent are pruned, and the surrounding
//! SQL is repaired (dangling `WHERE`, leading `AND`/`OR`, empty
//! parentheses).
//!
//! ## Binding parameters
//!
//! ```rust
//! use twowaysql_core::{parse, Bindings};
//!
//! let result = parse(
//!     "SELECT * FROM t WHERE a = /* $a */1 AND b = /* $b */2",
//!     &Bindings::new().bind("a", 10),
//! )
//! .unwrap();
//!
//! assert_eq!(result.sql, "SELECT * FROM t WHERE a = ?");
//! assert_eq!(result.params.len(), 1);
//! ```
//!
//! ## Dialects and IN expansion
//!
//! ```rust
//! use twowaysql_core::{Bindings, Dialect, Engine};
//!
//! let engine = Engine::new(Dialect::Postgresql);
//! let result = engine
//!     .parse(
//!         "WHERE id IN /* $ids */(1,2,3)",
//!         &Bindings::new().bind("ids", vec![7_i64, 8]),
//!     )
//!     .unwrap();
//!
//! assert_eq!(result.sql, "WHERE id IN (%s, %s)");
//! ```

pub mod bindings;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod lexer;
pub mod value;

mod binder;
mod directive;
mod line;
mod param;
mod rewrite;
mod tree;

pub use bindings::Bindings;
pub use dialect::{Dialect, PlaceholderStyle};
pub use engine::{parse, Diagnostic, Engine, IncludeResolver, ParseOptions, ParseResult};
pub use error::{ParseError, Result};
pub use value::{BindValue, ToBindValue};
