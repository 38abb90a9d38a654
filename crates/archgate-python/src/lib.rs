//! # archgate-python
//!
//! Tree-sitter based Python support for archgate.
//!
//! - [`PythonExtractor`] pulls `import` / `from ... import` edges out of
//!   Python source, resolves relative imports and maps files to module names

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod python;

pub use python::PythonExtractor;
