//! End-to-end reduction scenarios, driven through the textual surface.

use insta::assert_snapshot;
use opal::{alloc_term, as_code, as_term, read_term, Heap, Term};

// Church encodings
// ----------------

const TRU: &str = "λt: λf: t";
const FLS: &str = "λt: λf: f";

fn numeral(n: usize) -> String {
  let mut body = String::from("z");
  for _ in 0..n {
    body = format!("(s {})", body);
  }
  format!("λs: λz: {}", body)
}

// nand a b = (a (b false true) true)
fn nand() -> String {
  format!("λa: λb: ((a ((b {FLS}) {TRU})) {TRU})")
}

// slow n = not^n true, where not v = (nand v v); a tree of nands
fn slow(n: usize) -> String {
  format!("(({} λv: (({} v) v)) {TRU})", numeral(n), nand())
}

// Helpers
// -------

fn eval(code: &str) -> (Heap, u64) {
  let term = read_term(code).unwrap();
  let mut heap = Heap::new();
  let host = alloc_term(&mut heap, &term).unwrap();
  heap.normalize(host);
  heap.sanity_check(host).unwrap();
  (heap, host)
}

fn normalize(code: &str) -> (String, u64) {
  let (heap, host) = eval(code);
  (as_code(&heap, host), heap.get_gas())
}

// Renames every binder in traversal order, so two terms compare equal
// exactly when they are identical up to variable names.
fn canon(term: &Term, scope: &mut Vec<(String, String)>, fresh: &mut usize) -> Term {
  let rename = |name: &str, scope: &mut Vec<(String, String)>, fresh: &mut usize| {
    let new = format!("k{}", *fresh);
    *fresh += 1;
    scope.push((name.to_string(), new.clone()));
    new
  };
  match term {
    Term::Var { name } => {
      let name = scope
        .iter()
        .rev()
        .find(|(old, _)| old == name)
        .map(|(_, new)| new.clone())
        .unwrap_or_else(|| name.clone());
      Term::Var { name }
    }
    Term::Lam { name, body } => {
      let name = rename(name, scope, fresh);
      let body = Box::new(canon(body, scope, fresh));
      scope.pop();
      Term::Lam { name, body }
    }
    Term::App { func, argm } => Term::App {
      func: Box::new(canon(func, scope, fresh)),
      argm: Box::new(canon(argm, scope, fresh)),
    },
    Term::Sup { col, val0, val1 } => Term::Sup {
      col: *col,
      val0: Box::new(canon(val0, scope, fresh)),
      val1: Box::new(canon(val1, scope, fresh)),
    },
    Term::Dup { col, nam0, nam1, expr, body } => {
      let expr = Box::new(canon(expr, scope, fresh));
      let nam0 = rename(nam0, scope, fresh);
      let nam1 = rename(nam1, scope, fresh);
      let body = Box::new(canon(body, scope, fresh));
      scope.pop();
      scope.pop();
      Term::Dup { col: *col, nam0, nam1, expr, body }
    }
    Term::Ctr { id, args } => {
      Term::Ctr { id: *id, args: args.iter().map(|x| canon(x, scope, fresh)).collect() }
    }
    Term::Cal { id, args } => {
      Term::Cal { id: *id, args: args.iter().map(|x| canon(x, scope, fresh)).collect() }
    }
  }
}

fn alpha_eq(a: &Term, b: &Term) -> bool {
  canon(a, &mut vec![], &mut 0) == canon(b, &mut vec![], &mut 0)
}

// Scenarios
// ---------

#[test]
fn beta_reduction_of_a_constant() {
  let (norm, gas) = normalize("(λx: x λa: λb: a)");
  assert_snapshot!(norm, @"λx0: λx1: x0");
  assert_eq!(gas, 1);
}

#[test]
fn self_application_of_the_identity() {
  let (norm, gas) = normalize("(λx: (x x) λy: y)");
  assert_snapshot!(norm, @"λx0: x0");
  assert!(gas >= 2, "gas was {}", gas);
}

#[test]
fn duplicated_identity_applied_to_itself() {
  let (norm, gas) = normalize("!0<a b> = λx: x; (a b)");
  assert_snapshot!(norm, @"λx0: x0");
  assert!(gas >= 3, "gas was {}", gas);
}

#[test]
fn applying_a_superposition_superposes_the_results() {
  let (norm, gas) = normalize("(&0<λx: x λx: x> λk: k)");
  assert_snapshot!(norm, @"&0<λx0: x0 λx1: x1>");
  assert!(gas >= 2, "gas was {}", gas);
}

#[test]
fn church_double_of_one_is_two() {
  let double = "λn: λs: λz: ((n λk: (s (s k))) z)";
  let succ = "λm: λs: λz: (s ((m s) z))";
  let code = format!("({double} ({succ} {}))", numeral(0));
  let (norm, gas) = normalize(&code);
  assert_snapshot!(norm, @"λx0: λx1: (x0 (x0 x1))");
  assert!(gas > 0);
}

#[test]
fn shared_nand_tree_evaluates_to_false() {
  let small = {
    let (heap, _) = eval(&slow(2));
    heap.get_gas()
  };
  let code = format!("(({}) {} {})", nand(), slow(4), slow(4));
  let (heap, host) = eval(&code);
  let expect = read_term(FLS).unwrap();
  let got = as_term(&heap, host);
  assert!(alpha_eq(&got, &expect), "expected false, got {}", got);
  // the full tree costs more than a small one, but sharing keeps it tame
  assert!(heap.get_gas() > small);
  assert!(heap.get_gas() < 10_000, "sharing failed: {} rewrites", heap.get_gas());
}

// Idempotence and convergence
// ---------------------------

#[test]
fn normalization_is_idempotent() {
  let term = read_term(&format!("({} λv: (({} v) v))", numeral(3), nand())).unwrap();
  let mut heap = Heap::new();
  let host = alloc_term(&mut heap, &term).unwrap();
  heap.normalize(host);
  let gas = heap.get_gas();
  let norm = as_code(&heap, host);
  heap.normalize(host);
  assert_eq!(heap.get_gas(), gas, "a second normalization spent gas");
  assert_eq!(as_code(&heap, host), norm);
}

#[test]
fn increasing_gas_limits_converge_to_the_same_normal_form() {
  let code = format!("({} ({} {}))", "λn: λs: λz: ((n λk: (s (s k))) z)", "λm: λs: λz: (s ((m s) z))", numeral(1));
  let reference = normalize(&code).0;
  let mut partials = vec![];
  for limit in [1u64, 2, 4, 8, 16, 64, 256] {
    let term = read_term(&code).unwrap();
    let mut heap = Heap::new();
    heap.set_gas_limit(limit);
    let host = alloc_term(&mut heap, &term).unwrap();
    heap.normalize(host);
    partials.push((limit, as_code(&heap, host), heap.get_gas() < limit));
  }
  // once the limit stops biting, every result is the reference normal form
  let mut converged = false;
  for (limit, norm, finished) in partials {
    if finished || converged {
      converged = true;
      assert_eq!(norm, reference, "diverged at limit {}", limit);
    }
  }
  assert!(converged, "no tested limit was enough to finish");
}

// Confluence
// ----------

#[test]
fn reduction_order_does_not_change_the_normal_form() {
  // both an APP-PAR redex (at the root) and a DUP-LAM redex (in the
  // argument) are available; fire them in either order
  let code = "(&0<λa: a λb: b> !1<u v> = λc: c; (u v))";
  let term = read_term(code).unwrap();

  let mut heap1 = Heap::new();
  let host1 = alloc_term(&mut heap1, &term).unwrap();
  heap1.normalize(host1);

  let mut heap2 = Heap::new();
  let host2 = alloc_term(&mut heap2, &term).unwrap();
  // force the argument first, then the whole term
  let app = heap2.load_ptr(host2);
  heap2.reduce(opal::get_loc(app, 1));
  heap2.normalize(host2);

  heap1.sanity_check(host1).unwrap();
  heap2.sanity_check(host2).unwrap();
  assert_eq!(as_code(&heap1, host1), as_code(&heap2, host2));
}

// Gas exhaustion
// --------------

#[test]
fn a_diverging_term_stops_exactly_at_the_limit() {
  // (Y λh: h) never reaches a normal form
  let code = "(λf: (λx: (f (x x)) λx: (f (x x))) λh: h)";
  let term = read_term(code).unwrap();
  let mut heap = Heap::new();
  heap.set_gas_limit(100);
  let host = alloc_term(&mut heap, &term).unwrap();
  heap.normalize(host);
  assert_eq!(heap.get_gas(), 100);
  // exhaustion is idempotent
  heap.normalize(host);
  assert_eq!(heap.get_gas(), 100);
}

#[test]
fn gas_limits_are_per_heap() {
  let mut heap = Heap::new();
  heap.set_gas_limit(7);
  assert_eq!(heap.get_gas_limit(), 7);
  let heap2 = Heap::new();
  assert_eq!(heap2.get_gas_limit(), opal::default_gas_limit());
}
