//! Allocates parsed terms into the runtime's memory.
//!
//! The surface language is not linear: a lambda- or duplicator-bound name may
//! occur any number of times. The graph, however, gives every binder exactly
//! one occurrence. The builder bridges the two by routing each additional use
//! of a name through a freshly colored duplicator, so the graph that reaches
//! the reducer already satisfies the binder/occurrence invariant.

use crate::language::syntax::{Term, MAX_ID, MAX_SURFACE_COL};
use crate::runtime::*;

// A binder in scope while building: how many occurrences remain, and the
// pointer the next occurrence should take.
struct Binder {
  name: String,
  rem: u64,
  cur: Ptr,
}

/// Allocates `term` on the heap and returns the location of its root cell.
/// Fails on unbound names and on Ctr/Cal payloads that do not fit a pointer.
pub fn alloc_term(heap: &mut Heap, term: &Term) -> Result<u64, String> {
  let mut counts = vec![];
  count_uses(term, &mut vec![], &mut counts)?;
  let root = heap.alloc(1);
  let mut next = 0;
  let ptr = build(heap, term, &mut vec![], &counts, &mut next)?;
  heap.link(root, ptr);
  Ok(root)
}

// First pass: occurrence counts for every binder, in traversal order. The
// second pass replays the same traversal, so position in `counts` identifies
// the binder.
fn count_uses(term: &Term, scope: &mut Vec<(String, u64)>, counts: &mut Vec<u64>) -> Result<(), String> {
  match term {
    Term::Var { name } => match scope.iter_mut().rev().find(|(n, _)| n == name) {
      Some((_, uses)) => {
        *uses += 1;
        Ok(())
      }
      None => Err(format!("unbound variable '{}'", name)),
    },
    Term::Lam { name, body } => {
      let slot = counts.len();
      counts.push(0);
      scope.push((name.clone(), 0));
      count_uses(body, scope, counts)?;
      let (_, uses) = scope.pop().unwrap();
      counts[slot] = uses;
      Ok(())
    }
    Term::App { func, argm } => {
      count_uses(func, scope, counts)?;
      count_uses(argm, scope, counts)
    }
    Term::Sup { val0, val1, .. } => {
      count_uses(val0, scope, counts)?;
      count_uses(val1, scope, counts)
    }
    Term::Dup { nam0, nam1, expr, body, .. } => {
      // the expression is outside the scope of the two projections
      count_uses(expr, scope, counts)?;
      let slot = counts.len();
      counts.push(0);
      counts.push(0);
      scope.push((nam0.clone(), 0));
      scope.push((nam1.clone(), 0));
      count_uses(body, scope, counts)?;
      let (_, uses1) = scope.pop().unwrap();
      let (_, uses0) = scope.pop().unwrap();
      counts[slot] = uses0;
      counts[slot + 1] = uses1;
      Ok(())
    }
    Term::Ctr { args, .. } | Term::Cal { args, .. } => {
      for arg in args {
        count_uses(arg, scope, counts)?;
      }
      Ok(())
    }
  }
}

// Second pass: allocate nodes, handing every occurrence its pointer.
fn build(
  heap: &mut Heap,
  term: &Term,
  scope: &mut Vec<Binder>,
  counts: &[u64],
  next: &mut usize,
) -> Result<Ptr, String> {
  match term {
    Term::Var { name } => {
      let binder = scope
        .iter_mut()
        .rev()
        .find(|b| b.name == *name)
        .ok_or_else(|| format!("unbound variable '{}'", name))?;
      Ok(occurrence(heap, binder))
    }
    Term::Lam { name, body } => {
      let lam = heap.alloc(2);
      let uses = counts[*next];
      *next += 1;
      scope.push(Binder { name: name.clone(), rem: uses, cur: Var(lam) });
      let body = build(heap, body, scope, counts, next)?;
      heap.link(lam + 1, body);
      scope.pop();
      Ok(Lam(lam))
    }
    Term::App { func, argm } => {
      let app = heap.alloc(2);
      let func = build(heap, func, scope, counts, next)?;
      heap.link(app + 0, func);
      let argm = build(heap, argm, scope, counts, next)?;
      heap.link(app + 1, argm);
      Ok(App(app))
    }
    Term::Sup { col, val0, val1 } => {
      if *col > MAX_SURFACE_COL {
        return Err(format!("color {} is outside the surface range 0..={}", col, MAX_SURFACE_COL));
      }
      let par = heap.alloc(2);
      let val0 = build(heap, val0, scope, counts, next)?;
      heap.link(par + 0, val0);
      let val1 = build(heap, val1, scope, counts, next)?;
      heap.link(par + 1, val1);
      Ok(Par(*col, par))
    }
    Term::Dup { col, nam0, nam1, expr, body } => {
      if *col > MAX_SURFACE_COL {
        return Err(format!("color {} is outside the surface range 0..={}", col, MAX_SURFACE_COL));
      }
      let dup = heap.alloc(3);
      let expr = build(heap, expr, scope, counts, next)?;
      heap.link(dup + 2, expr);
      let uses0 = counts[*next];
      let uses1 = counts[*next + 1];
      *next += 2;
      scope.push(Binder { name: nam0.clone(), rem: uses0, cur: Dp0(*col, dup) });
      scope.push(Binder { name: nam1.clone(), rem: uses1, cur: Dp1(*col, dup) });
      let body = build(heap, body, scope, counts, next)?;
      scope.pop();
      scope.pop();
      // the duplicator floats: the body is what takes its place in the tree
      Ok(body)
    }
    Term::Ctr { id, args } | Term::Cal { id, args } => {
      let arity = args.len() as u64;
      if *id > MAX_ID || arity > MAX_ID {
        return Err(format!("id or arity of {} does not fit an 8-bit payload", term));
      }
      let loc = heap.alloc(arity);
      for (i, arg) in args.iter().enumerate() {
        let arg = build(heap, arg, scope, counts, next)?;
        heap.link(loc + i as u64, arg);
      }
      Ok(if matches!(term, Term::Ctr { .. }) { Ctr(arity, *id, loc) } else { Cal(arity, *id, loc) })
    }
  }
}

// Hands out the pointer for one occurrence of `binder`. The last use takes
// the binder's pointer itself; every earlier use splits a fresh duplicator
// off the remaining uses.
fn occurrence(heap: &mut Heap, binder: &mut Binder) -> Ptr {
  if binder.rem <= 1 {
    binder.rem = 0;
    binder.cur
  } else {
    let col = heap.gen_col();
    let dup = heap.alloc(3);
    heap.link(dup + 2, binder.cur);
    binder.cur = Dp1(col, dup);
    binder.rem -= 1;
    Dp0(col, dup)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::language::readback::as_code;
  use crate::language::syntax::read_term;

  fn alloc_code(heap: &mut Heap, code: &str) -> u64 {
    alloc_term(heap, &read_term(code).unwrap()).unwrap()
  }

  #[test]
  fn rejects_unbound_variables() {
    let mut heap = Heap::new();
    let term = read_term("λx: (x y)").unwrap();
    assert!(alloc_term(&mut heap, &term).is_err());
  }

  #[test]
  fn scoping_is_lexical() {
    let mut heap = Heap::new();
    // the inner x shadows the outer one
    let host = alloc_code(&mut heap, "λx: λx: x");
    assert_eq!(heap.sanity_check(host), Ok(()));
    assert_eq!(as_code(&heap, host), "λx0: λx1: x1");
  }

  #[test]
  fn a_linear_term_builds_without_duplicators() {
    let mut heap = Heap::new();
    let host = alloc_code(&mut heap, "λf: λx: (f x)");
    assert_eq!(heap.sanity_check(host), Ok(()));
    // 3 two-cell nodes plus the root cell
    assert_eq!(heap.heap_size(), 7);
  }

  #[test]
  fn repeated_names_are_shared_through_duplicators() {
    let mut heap = Heap::new();
    let host = alloc_code(&mut heap, "λd: (d d)");
    assert_eq!(heap.sanity_check(host), Ok(()));
    // lambda + app + root + one generated duplicator
    assert_eq!(heap.heap_size(), 8);
    let body = heap.load_arg(heap.load_ptr(host), 1);
    assert_eq!(get_tag(heap.load_arg(body, 0)), Tag::DP0);
    assert_eq!(get_tag(heap.load_arg(body, 1)), Tag::DP1);
    let dp0 = heap.load_arg(body, 0);
    assert!(get_ex0(dp0) >= 0x80, "generated colors sit above the surface range");
  }

  #[test]
  fn three_uses_chain_two_duplicators() {
    let mut heap = Heap::new();
    let host = alloc_code(&mut heap, "λd: ((d d) d)");
    assert_eq!(heap.sanity_check(host), Ok(()));
    let body = heap.load_arg(heap.load_ptr(host), 1);
    let inner = heap.load_arg(body, 0);
    let d1 = heap.load_arg(inner, 0);
    let d2 = heap.load_arg(inner, 1);
    let d3 = heap.load_arg(body, 1);
    assert_eq!(get_tag(d1), Tag::DP0);
    assert_eq!(get_tag(d2), Tag::DP0);
    assert_eq!(get_tag(d3), Tag::DP1);
    // the chain uses two duplicators with distinct generated colors
    assert_ne!(get_ex0(d1), get_ex0(d2));
    assert_ne!(get_pos(d1), get_pos(d2));
    assert_eq!(get_pos(d2), get_pos(d3));
  }

  #[test]
  fn explicit_duplicators_bind_their_projections() {
    let mut heap = Heap::new();
    let host = alloc_code(&mut heap, "!3<a b> = λx: x; (a b)");
    assert_eq!(heap.sanity_check(host), Ok(()));
    let app = heap.load_ptr(host);
    let dp0 = heap.load_arg(app, 0);
    let dp1 = heap.load_arg(app, 1);
    assert_eq!(get_tag(dp0), Tag::DP0);
    assert_eq!(get_tag(dp1), Tag::DP1);
    assert_eq!(get_ex0(dp0), 3);
    assert_eq!(get_pos(dp0), get_pos(dp1));
  }

  #[test]
  fn constructors_allocate_their_arity() {
    let mut heap = Heap::new();
    let host = alloc_code(&mut heap, "$9:2{λx: x $4:0{}}");
    assert_eq!(heap.sanity_check(host), Ok(()));
    let ctr = heap.load_ptr(host);
    assert_eq!(get_tag(ctr), Tag::CTR);
    assert_eq!(get_ex0(ctr), 2);
    assert_eq!(get_ex1(ctr), 9);
  }

  #[test]
  fn unused_binders_stay_nil() {
    let mut heap = Heap::new();
    let host = alloc_code(&mut heap, "λa: λb: a");
    assert_eq!(heap.sanity_check(host), Ok(()));
    let lam_a = heap.load_ptr(host);
    let lam_b = heap.load_arg(lam_a, 1);
    assert_eq!(heap.load_arg(lam_b, 0), Nil());
  }
}
