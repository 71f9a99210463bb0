use crate::runtime::*;
use tracing::trace;

// !c<r s> = λx(f)
// --------------- DUP-LAM
// !c<f0 f1> = f
// r <- λx0(f0)
// s <- λx1(f1)
// x <- &c<x0 x1>
pub fn apply(heap: &mut Heap, host: u64, term: Ptr, arg0: Ptr) -> Ptr {
  trace!(host, "dup-lam");
  heap.inc_gas();
  let col = get_ex0(term);
  let let0 = heap.alloc(3);
  let par0 = heap.alloc(2);
  let lam0 = heap.alloc(2);
  let lam1 = heap.alloc(2);
  let body = heap.take_arg(arg0, 1);
  heap.link(let0 + 2, body);
  heap.link(par0 + 1, Var(lam1));
  heap.link(par0 + 0, Var(lam0));
  heap.link(lam0 + 1, Dp0(col, let0));
  heap.link(lam1 + 1, Dp1(col, let0));
  let xbind = heap.take_arg(arg0, 0);
  heap.subst(xbind, Par(col, par0));
  let rbind = heap.take_arg(term, 0);
  heap.subst(rbind, Lam(lam0));
  let sbind = heap.take_arg(term, 1);
  heap.subst(sbind, Lam(lam1));
  let done = Lam(if get_tag(term) == Tag::DP0 { lam0 } else { lam1 });
  heap.link(host, done);
  heap.free(get_loc(term, 0), 3);
  heap.free(get_loc(arg0, 0), 2);
  done
}
