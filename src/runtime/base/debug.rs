use crate::runtime::*;
use std::collections::HashSet;
use thiserror::Error;

// Debug
// -----

pub fn show_ptr(x: Ptr) -> String {
  if x == 0 {
    String::from("~")
  } else {
    let tag = get_tag(x);
    match tag {
      Tag::PAR | Tag::DP0 | Tag::DP1 => {
        format!("{}({:02x}, {:08x})", tag.as_str(), get_ex0(x), get_pos(x))
      }
      Tag::CTR | Tag::CAL => {
        format!("{}({:02x}, {:02x}, {:08x})", tag.as_str(), get_ex0(x), get_ex1(x), get_pos(x))
      }
      _ => format!("{}({:08x})", tag.as_str(), get_pos(x)),
    }
  }
}

pub fn show_heap(heap: &Heap) -> String {
  let mut text: String = String::new();
  for idx in 0..heap.node.len() {
    let ptr = heap.load_ptr(idx as u64);
    if ptr != 0 {
      text.push_str(&format!("{:04x} | ", idx));
      text.push_str(&show_ptr(ptr));
      text.push('\n');
    }
  }
  text
}

// Sanity checking
// ---------------

// Invariant violations are programmer bugs, not user errors: a failed check
// means some rewrite broke the binder/occurrence bond and the engine must
// not keep reducing this graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SanityError {
  #[error("broken back-edge: {0} at {1:#x} is not answered by a Lnk pointing back")]
  BackEdge(String, u64),
  #[error("broken binder: slot {0:#x} holds a Lnk whose occurrence does not point back")]
  Binder(u64),
  #[error("stray Lnk at {0:#x}: back-edges may only live on binder slots")]
  StrayLnk(u64),
  #[error("freed cell {0:#x} is reachable from the root")]
  FreedReachable(u64),
  #[error("position {0:#x} is out of heap bounds")]
  OutOfBounds(u64),
}

impl Heap {
  // Walks the graph reachable from `host` and verifies the structural
  // invariants: every Var/Dp0/Dp1 is answered by a Lnk pointing back at it,
  // every binder slot is Nil or a well-formed Lnk, no back-edge sits outside
  // a binder slot, and no freed cell is reachable.
  pub fn sanity_check(&self, host: u64) -> Result<(), SanityError> {
    let freed: HashSet<u64> = self.free_cells().into_iter().collect();
    let mut seen: HashSet<u64> = HashSet::new();
    let mut stack: Vec<u64> = vec![host];

    let in_bounds = |loc: u64| (loc as usize) < self.node.len();

    // A binder slot must hold Nil, or a Lnk whose occurrence points back here.
    let check_binder = |slot: u64| -> Result<(), SanityError> {
      let bind = self.load_ptr(slot);
      match get_tag(bind) {
        Tag::NIL => Ok(()),
        Tag::LNK => {
          let occ = get_loc(bind, 0);
          if !in_bounds(occ) {
            return Err(SanityError::OutOfBounds(occ));
          }
          let var = self.load_ptr(occ);
          let tag = get_tag(var);
          if tag.is_bound() && get_loc(var, tag.bind_slot()) == slot {
            Ok(())
          } else {
            Err(SanityError::Binder(slot))
          }
        }
        _ => Err(SanityError::Binder(slot)),
      }
    };

    while let Some(loc) = stack.pop() {
      if !in_bounds(loc) {
        return Err(SanityError::OutOfBounds(loc));
      }
      if freed.contains(&loc) {
        return Err(SanityError::FreedReachable(loc));
      }
      let term = self.load_ptr(loc);
      let tag = get_tag(term);
      match tag {
        Tag::VAR | Tag::DP0 | Tag::DP1 => {
          let slot = get_loc(term, tag.bind_slot());
          if !in_bounds(slot) {
            return Err(SanityError::OutOfBounds(slot));
          }
          if self.load_ptr(slot) != Lnk(loc) {
            return Err(SanityError::BackEdge(tag.as_str().to_string(), loc));
          }
          // a duplicator is only reachable through its projections; check the
          // node once and descend into the shared expression
          if tag != Tag::VAR {
            let dup = get_loc(term, 0);
            if seen.insert(dup) {
              check_binder(dup + 0)?;
              check_binder(dup + 1)?;
              stack.push(dup + 2);
            }
          }
        }
        Tag::LNK => {
          return Err(SanityError::StrayLnk(loc));
        }
        Tag::LAM => {
          let base = get_loc(term, 0);
          if seen.insert(base) {
            check_binder(base)?;
            stack.push(base + 1);
          }
        }
        Tag::APP | Tag::PAR => {
          let base = get_loc(term, 0);
          if seen.insert(base) {
            stack.push(base + 0);
            stack.push(base + 1);
          }
        }
        Tag::CTR | Tag::CAL => {
          let base = get_loc(term, 0);
          if get_ex0(term) > 0 && seen.insert(base) {
            for i in 0..get_ex0(term) {
              stack.push(base + i);
            }
          }
        }
        Tag::NIL => {}
      }
    }
    Ok(())
  }
}
