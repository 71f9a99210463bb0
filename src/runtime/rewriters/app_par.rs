use crate::runtime::*;
use tracing::trace;

// (&c<f0 f1> a)
// ------------------- APP-PAR
// !c<a0 a1> = a
// &c<(f0 a0) (f1 a1)>
pub fn apply(heap: &mut Heap, host: u64, term: Ptr, arg0: Ptr) -> Ptr {
  trace!(host, "app-par");
  heap.inc_gas();
  let col = get_ex0(arg0);
  // the old App and Par nodes become the two new Apps
  let app0 = get_loc(term, 0);
  let app1 = get_loc(arg0, 0);
  let let0 = heap.alloc(3);
  let par0 = heap.alloc(2);
  let argm = heap.take_arg(term, 1);
  heap.link(let0 + 2, argm);
  heap.link(app0 + 1, Dp0(col, let0));
  let fun0 = heap.take_arg(arg0, 0);
  heap.link(app0 + 0, fun0);
  let fun1 = heap.take_arg(arg0, 1);
  heap.link(app1 + 0, fun1);
  heap.link(app1 + 1, Dp1(col, let0));
  heap.link(par0 + 0, App(app0));
  heap.link(par0 + 1, App(app1));
  heap.link(host, Par(col, par0))
}
