//! Reads terms back from the runtime's memory.

use crate::language::syntax::Term;
use crate::runtime::*;
use std::collections::{HashMap, HashSet};

/// Reads back the term at `host`, as surface code.
pub fn as_code(heap: &Heap, host: u64) -> String {
  format!("{}", as_term(heap, host))
}

/// Reads back the term at `host`. Lambda binders get fresh `x{n}` names in
/// traversal order. Duplicator projections are resolved through per-color
/// direction stacks: entering a Dp0/Dp1 records which side of a matching
/// superposition to take, so sharing left by reduction stays invisible and
/// only genuinely superposed values read back as `&c<_ _>`.
pub fn as_term(heap: &Heap, host: u64) -> Term {
  fn gen_var_names(heap: &Heap, names: &mut HashMap<Ptr, String>, seen: &mut HashSet<Ptr>, term: Ptr) {
    if !seen.insert(term) {
      return;
    }
    match get_tag(term) {
      Tag::LAM => {
        let var = Var(get_loc(term, 0));
        names.insert(var, format!("x{}", names.len()));
        gen_var_names(heap, names, seen, heap.load_arg(term, 1));
      }
      Tag::APP | Tag::PAR => {
        gen_var_names(heap, names, seen, heap.load_arg(term, 0));
        gen_var_names(heap, names, seen, heap.load_arg(term, 1));
      }
      Tag::DP0 | Tag::DP1 => {
        gen_var_names(heap, names, seen, heap.load_arg(term, 2));
      }
      Tag::CTR | Tag::CAL => {
        for i in 0..get_ex0(term) {
          gen_var_names(heap, names, seen, heap.load_arg(term, i));
        }
      }
      _ => {}
    }
  }

  struct Stacks {
    stacks: HashMap<u64, Vec<bool>>,
  }

  impl Stacks {
    fn new() -> Self {
      Self { stacks: HashMap::new() }
    }
    fn peek(&self, col: u64) -> Option<bool> {
      self.stacks.get(&col).and_then(|stack| stack.last().copied())
    }
    fn pop(&mut self, col: u64) -> bool {
      self.stacks.entry(col).or_default().pop().unwrap_or(false)
    }
    fn push(&mut self, col: u64, val: bool) {
      self.stacks.entry(col).or_default().push(val);
    }
  }

  fn readback(heap: &Heap, names: &HashMap<Ptr, String>, stacks: &mut Stacks, term: Ptr) -> Term {
    match get_tag(term) {
      Tag::LAM => {
        let body = readback(heap, names, stacks, heap.load_arg(term, 1));
        let var = Var(get_loc(term, 0));
        let name = names.get(&var).cloned().unwrap_or_else(|| "_".to_string());
        Term::Lam { name, body: Box::new(body) }
      }
      Tag::APP => {
        let func = readback(heap, names, stacks, heap.load_arg(term, 0));
        let argm = readback(heap, names, stacks, heap.load_arg(term, 1));
        Term::App { func: Box::new(func), argm: Box::new(argm) }
      }
      Tag::PAR => {
        let col = get_ex0(term);
        if let Some(side) = stacks.peek(col) {
          let val = heap.load_arg(term, side as u64);
          let old = stacks.pop(col);
          let got = readback(heap, names, stacks, val);
          stacks.push(col, old);
          got
        } else {
          let val0 = readback(heap, names, stacks, heap.load_arg(term, 0));
          let val1 = readback(heap, names, stacks, heap.load_arg(term, 1));
          Term::Sup { col, val0: Box::new(val0), val1: Box::new(val1) }
        }
      }
      Tag::DP0 => {
        let col = get_ex0(term);
        stacks.push(col, false);
        let got = readback(heap, names, stacks, heap.load_arg(term, 2));
        stacks.pop(col);
        got
      }
      Tag::DP1 => {
        let col = get_ex0(term);
        stacks.push(col, true);
        let got = readback(heap, names, stacks, heap.load_arg(term, 2));
        stacks.pop(col);
        got
      }
      Tag::CTR | Tag::CAL => {
        let id = get_ex1(term);
        let args =
          (0..get_ex0(term)).map(|i| readback(heap, names, stacks, heap.load_arg(term, i))).collect();
        if get_tag(term) == Tag::CTR {
          Term::Ctr { id, args }
        } else {
          Term::Cal { id, args }
        }
      }
      Tag::VAR => {
        let name =
          names.get(&term).cloned().unwrap_or_else(|| format!("v{}", get_loc(term, 0)));
        Term::Var { name }
      }
      // erased or malformed positions have no surface form
      _ => Term::Var { name: "~".to_string() },
    }
  }

  let term = heap.load_ptr(host);
  let mut names = HashMap::new();
  let mut seen = HashSet::new();
  gen_var_names(heap, &mut names, &mut seen, term);
  readback(heap, &names, &mut Stacks::new(), term)
}
