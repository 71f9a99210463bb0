#![allow(clippy::identity_op)]
#![allow(non_snake_case)]

pub mod builder;
pub mod language;
pub mod runtime;

pub use builder::alloc_term;
pub use language::readback::{as_code, as_term};
pub use language::syntax::{read_term, Term};
pub use runtime::*;

/// Parses `code`, builds it on a fresh heap, fully normalizes it, and
/// returns the normal form as code together with the number of rewrites.
pub fn eval_code(code: &str) -> Result<(String, u64), String> {
  let term = read_term(code)?;
  let mut heap = Heap::new();
  let host = alloc_term(&mut heap, &term)?;
  heap.normalize(host);
  Ok((as_code(&heap, host), heap.get_gas()))
}
