use crate::runtime::*;
use tracing::trace;

// !c<x y> = $k:n{a b ...}
// ----------------------- DUP-CTR
// !c<a0 a1> = a
// !c<b0 b1> = b
// ...
// x <- $k:n{a0 b0 ...}
// y <- $k:n{a1 b1 ...}
pub fn apply(heap: &mut Heap, host: u64, term: Ptr, arg0: Ptr) -> Ptr {
  trace!(host, "dup-ctr");
  heap.inc_gas();
  let col = get_ex0(term);
  let arity = get_ex0(arg0);
  let id = get_ex1(arg0);
  if arity == 0 {
    let xbind = heap.take_arg(term, 0);
    heap.subst(xbind, Ctr(0, id, 0));
    let ybind = heap.take_arg(term, 1);
    heap.subst(ybind, Ctr(0, id, 0));
    heap.free(get_loc(term, 0), 3);
  } else {
    // the old Ctr node becomes the first copy
    let ctr0 = get_loc(arg0, 0);
    let ctr1 = heap.alloc(arity);
    for i in 0..arity {
      let leti = heap.alloc(3);
      let argi = heap.take_arg(arg0, i);
      heap.link(leti + 2, argi);
      heap.link(ctr0 + i, Dp0(col, leti));
      heap.link(ctr1 + i, Dp1(col, leti));
    }
    let xbind = heap.take_arg(term, 0);
    heap.subst(xbind, Ctr(arity, id, ctr0));
    let ybind = heap.take_arg(term, 1);
    heap.subst(ybind, Ctr(arity, id, ctr1));
    heap.free(get_loc(term, 0), 3);
  }
  heap.load_ptr(host)
}
