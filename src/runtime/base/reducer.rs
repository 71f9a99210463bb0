use crate::runtime::*;
use tracing::debug;

// The reduction drivers
// ---------------------
//
// `reduce` walks the spine below `host` and applies rewrite rules until the
// cell at `host` holds a weak head normal form. Whether a rule leaves a
// possible redex at `host` decides the control flow after it fires:
//
// - APP-LAM, DUP-LAM and the annihilating DUP-PAR rewrite `host` in place
//   into something that may itself be the next redex, so the loop continues.
// - APP-PAR, the commuting DUP-PAR and DUP-CTR leave a fresh superposition
//   or constructor at `host`, which is already whnf, so the loop returns.
//
// `normal` then forces every child of the whnf, post-order, with a visited
// set keyed by node base position: the graph routinely shares subterms
// through duplicators and must not be forced twice.
//
// Because nodes carry no parent pointers, a rewrite deep in the graph can
// uncover a redex above a position `normal` already passed through (a scope
// violation). A single `normal` pass is therefore not enough; `normalize`
// re-runs it until a pass spends no gas. That fixpoint is the public
// contract for full normalization.

impl Heap {
  // Reduces the term at `host` to weak head normal form, in place.
  pub fn reduce(&mut self, host: u64) -> Ptr {
    loop {
      let term = self.load_ptr(host);
      match get_tag(term) {
        Tag::APP => {
          let arg0 = self.reduce(get_loc(term, 0));
          if self.gas_exhausted() {
            return self.load_ptr(host);
          }
          match get_tag(arg0) {
            Tag::LAM => {
              rewriters::app_lam::apply(self, host, term, arg0);
            }
            Tag::PAR => {
              return rewriters::app_par::apply(self, host, term, arg0);
            }
            _ => return term,
          }
        }
        Tag::DP0 | Tag::DP1 => {
          let arg0 = self.reduce(get_loc(term, 2));
          if self.gas_exhausted() {
            return self.load_ptr(host);
          }
          match get_tag(arg0) {
            Tag::LAM => {
              rewriters::dup_lam::apply(self, host, term, arg0);
            }
            Tag::PAR if get_ex0(term) == get_ex0(arg0) => {
              rewriters::dup_dup::apply(self, host, term, arg0);
            }
            Tag::PAR => {
              return rewriters::dup_par::apply(self, host, term, arg0);
            }
            Tag::CTR => {
              return rewriters::dup_ctr::apply(self, host, term, arg0);
            }
            _ => return term,
          }
        }
        _ => return term,
      }
    }
  }

  // One normalization pass: whnf the head, then force every child slot,
  // writing results back through `link`. Shared subgraphs are visited once.
  pub fn normal(&mut self, host: u64, seen: &mut im::HashSet<u64>) -> Ptr {
    let term = self.reduce(host);
    let mut rec_locs = vec![];
    match get_tag(term) {
      Tag::LAM => {
        rec_locs.push(get_loc(term, 1));
      }
      Tag::APP | Tag::PAR => {
        rec_locs.push(get_loc(term, 0));
        rec_locs.push(get_loc(term, 1));
      }
      Tag::DP0 | Tag::DP1 => {
        rec_locs.push(get_loc(term, 2));
      }
      Tag::CTR | Tag::CAL => {
        for i in 0..get_ex0(term) {
          rec_locs.push(get_loc(term, i));
        }
      }
      _ => {}
    }
    if rec_locs.is_empty() {
      return term;
    }
    let base = get_loc(term, 0);
    if seen.contains(&base) {
      return term;
    }
    seen.insert(base);
    for loc in rec_locs {
      let ptr = self.normal(loc, seen);
      self.link(loc, ptr);
    }
    self.load_ptr(host)
  }

  // Fully normalizes the term at `host`: re-runs `normal` until a pass
  // performs no rewrite, resolving the redexes that scope violations can
  // uncover above already-visited positions.
  pub fn normalize(&mut self, host: u64) -> Ptr {
    let mut gas = self.get_gas();
    let mut pass = 0u64;
    loop {
      self.normal(host, &mut im::HashSet::new());
      pass += 1;
      let new_gas = self.get_gas();
      debug!(pass, gas = new_gas, "normalization pass");
      if new_gas == gas {
        break;
      }
      gas = new_gas;
    }
    self.load_ptr(host)
  }
}

#[cfg(test)]
mod tests {
  use crate::runtime::*;

  // (λx(x) λy(y)), built by hand through the embedding API
  fn identity_app(heap: &mut Heap) -> u64 {
    let lam_x = heap.alloc(2);
    heap.link(lam_x + 1, Var(lam_x));
    let lam_y = heap.alloc(2);
    heap.link(lam_y + 1, Var(lam_y));
    let app = heap.alloc(2);
    heap.link(app + 0, Lam(lam_x));
    heap.link(app + 1, Lam(lam_y));
    let root = heap.alloc(1);
    heap.link(root, App(app));
    root
  }

  #[test]
  fn beta_reduces_in_one_step() {
    let mut heap = Heap::new();
    let root = identity_app(&mut heap);
    let norm = heap.reduce(root);
    assert_eq!(get_tag(norm), Tag::LAM);
    assert!(get_tag(norm).is_whnf());
    assert_eq!(heap.get_gas(), 1);
    // both 2-cell nodes of the redex were reclaimed
    assert_eq!(heap.free_count(2), 2);
  }

  #[test]
  fn whnf_stops_at_the_head() {
    let mut heap = Heap::new();
    // λz((λx(x) λy(y))): the redex sits under the lambda, whnf must not fire it
    let inner = identity_app(&mut heap);
    let lam_z = heap.alloc(2);
    let body = heap.take_ptr(inner);
    heap.link(lam_z + 1, body);
    let root = heap.alloc(1);
    heap.link(root, Lam(lam_z));
    let norm = heap.reduce(root);
    assert_eq!(get_tag(norm), Tag::LAM);
    assert_eq!(heap.get_gas(), 0);
  }

  #[test]
  fn normal_forces_under_binders() {
    let mut heap = Heap::new();
    let inner = identity_app(&mut heap);
    let lam_z = heap.alloc(2);
    let body = heap.take_ptr(inner);
    heap.link(lam_z + 1, body);
    let root = heap.alloc(1);
    heap.link(root, Lam(lam_z));
    heap.normalize(root);
    assert_eq!(heap.get_gas(), 1);
    let body = heap.load_ptr(lam_z + 1);
    assert_eq!(get_tag(body), Tag::LAM);
  }

  #[test]
  fn applying_a_constructor_is_a_noop() {
    let mut heap = Heap::new();
    let ctr = heap.alloc(0);
    let app = heap.alloc(2);
    heap.link(app + 0, Ctr(0, 7, ctr));
    let lam = heap.alloc(2);
    heap.link(lam + 1, Var(lam));
    heap.link(app + 1, Lam(lam));
    let root = heap.alloc(1);
    heap.link(root, App(app));
    let norm = heap.reduce(root);
    assert_eq!(get_tag(norm), Tag::APP);
    assert_eq!(heap.get_gas(), 0);
  }

  #[test]
  fn gas_limit_halts_reduction_cleanly() {
    let mut heap = Heap::new();
    heap.set_gas_limit(0);
    let root = identity_app(&mut heap);
    let norm = heap.reduce(root);
    assert_eq!(get_tag(norm), Tag::APP);
    // the limit left the head unreduced
    assert!(!get_tag(norm).is_whnf());
    assert_eq!(heap.get_gas(), 0);
    // exhaustion is idempotent: nothing ever fires again
    let norm = heap.normalize(root);
    assert_eq!(get_tag(norm), Tag::APP);
    assert_eq!(heap.get_gas(), 0);
    // raising the limit resumes exactly where we stopped
    heap.set_gas_limit(u64::MAX);
    let norm = heap.normalize(root);
    assert_eq!(get_tag(norm), Tag::LAM);
    assert_eq!(heap.get_gas(), 1);
  }
}
