use crate::runtime::*;
use tracing::trace;

// !A<x y> = &B<a b>
// ----------------------- DUP-PAR (commute: distinct colors)
// !A<xa xb> = a
// !A<ya yb> = b
// x <- &B<xa ya>
// y <- &B<xb yb>
pub fn apply(heap: &mut Heap, host: u64, term: Ptr, arg0: Ptr) -> Ptr {
  trace!(host, "dup-par-commute");
  heap.inc_gas();
  let dcol = get_ex0(term);
  let pcol = get_ex0(arg0);
  let par0 = heap.alloc(2);
  let let0 = heap.alloc(3);
  // the old Par node becomes the second fresh Par
  let par1 = get_loc(arg0, 0);
  let let1 = heap.alloc(3);
  let val0 = heap.take_arg(arg0, 0);
  heap.link(let0 + 2, val0);
  let val1 = heap.take_arg(arg0, 1);
  heap.link(let1 + 2, val1);
  heap.link(par1 + 0, Dp1(dcol, let0));
  heap.link(par1 + 1, Dp1(dcol, let1));
  heap.link(par0 + 0, Dp0(dcol, let0));
  heap.link(par0 + 1, Dp0(dcol, let1));
  let xbind = heap.take_arg(term, 0);
  heap.subst(xbind, Par(pcol, par0));
  let ybind = heap.take_arg(term, 1);
  heap.subst(ybind, Par(pcol, par1));
  heap.free(get_loc(term, 0), 3);
  heap.load_ptr(host)
}
