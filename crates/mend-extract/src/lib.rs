//! # mend-extract
//!
//! Lexical extraction for the MEND pipeline.
//!
//! Language models wrap their answer in prose and markdown fences, and often
//! print a draft before the corrected version. [`scanner::JsonExtractor`]
//! finds every balanced top-level `{ ... }` span in such text and parses the
//! last one, implementing [`mend_core::traits::Extractor`].
//!
//! ```rust,ignore
//! use mend_extract::JsonExtractor;
//! use mend_core::traits::Extractor;
//!
//! let value = JsonExtractor::new().extract("Here you go:\n```json\n{\"a\": 1}\n```")?;
//! ```

pub mod scanner;

pub use scanner::JsonExtractor;
