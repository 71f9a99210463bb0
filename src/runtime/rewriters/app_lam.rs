use crate::runtime::*;
use tracing::trace;

// (λx(body) a)
// ------------ APP-LAM
// x <- a
// body
pub fn apply(heap: &mut Heap, host: u64, term: Ptr, arg0: Ptr) -> Ptr {
  trace!(host, "app-lam");
  heap.inc_gas();
  let bind = heap.take_arg(arg0, 0);
  let argm = heap.take_arg(term, 1);
  heap.subst(bind, argm);
  let body = heap.take_arg(arg0, 1);
  let done = heap.link(host, body);
  heap.free(get_loc(term, 0), 2);
  heap.free(get_loc(arg0, 0), 2);
  done
}
