// The memory model
// ----------------
//
// The runtime memory is a flat vector of u64 tagged pointers. That is:
//
//   Mem ::= Vec<Ptr>
//
// A pointer has 4 parts:
//
//   Ptr ::= 0xTabPPPPPPPPPPP
//
// Where:
//
//   T : u4  is the pointer tag
//   a : u8  is the 1st payload (a fan color, or a Ctr/Cal arity)
//   b : u8  is the 2nd payload (a Ctr/Cal id)
//   P : u44 is the base index of the target node
//
// There are 10 possible tags:
//
//   Tag | Val | Meaning
//   ----| --- | -------------------------------
//   NIL |   0 | an absent or erased value; the all-zero cell
//   LNK |   1 | a back-edge, placed on binder slots, pointing to the occurrence
//   DP0 |   2 | a variable, bound to the 1st projection of a duplicator
//   DP1 |   3 | a variable, bound to the 2nd projection of a duplicator
//   VAR |   4 | a variable, bound to the one argument of a lambda
//   LAM |   5 | a lambda
//   APP |   6 | an application
//   PAR |   7 | a superposition (a colored pair)
//   CTR |   8 | a constructor
//   CAL |   9 | a function call
//
// A node is a tuple of N pointers stored on sequential memory indices:
//
//   Lambda Node (2 cells):
//   - [0] => either NIL or a LNK pointing to the variable occurrence
//   - [1] => pointer to the lambda's body
//
//   Application Node (2 cells):
//   - [0] => pointer to the function
//   - [1] => pointer to the argument
//
//   Superposition Node (2 cells, colored):
//   - [0] => pointer to the 1st superposed value
//   - [1] => pointer to the 2nd superposed value
//
//   Duplicator Node (3 cells, colored):
//   - [0] => either NIL or a LNK pointing to the DP0 occurrence
//   - [1] => either NIL or a LNK pointing to the DP1 occurrence
//   - [2] => pointer to the duplicated expression
//
//   Constructor / Call Node (`ex0` cells):
//   - [i] => pointer to the ith field / argument
//
// Notes:
//
//   1. Duplicator nodes DON'T have a body. They float outside the tree.
//   2. Lambdas and duplicators point to their variables, and vice-versa.
//   3. LNK pointers only show up inside lambdas and duplicators.
//   4. DP0 and DP1 pointers share one duplicator node: both carry its base.
//   5. The color distinguishes sharings of distinct origins: same-colored
//      duplicator/superposition pairs annihilate, different-colored ones
//      commute across each other.
//
// Example:
//
//   Surface:
//
//     λx: !0<a b> = x; (a b)
//
//   Memory:
//
//     Root : Ptr(LAM, 0, 0, 0x0)
//     0x00 | Ptr(LNK, 0, 0, 0x4) // the lambda's binder slot
//     0x01 | Ptr(APP, 0, 0, 0x5) // the lambda's body
//     0x02 | Ptr(LNK, 0, 0, 0x5) // the duplicator's 1st binder slot
//     0x03 | Ptr(LNK, 0, 0, 0x6) // the duplicator's 2nd binder slot
//     0x04 | Ptr(VAR, 0, 0, 0x0) // the duplicated expression
//     0x05 | Ptr(DP0, 0, 0, 0x2) // the application's function
//     0x06 | Ptr(DP1, 0, 0, 0x2) // the application's argument
//
// The binder/occurrence bond is a two-way, non-owning relation: the binder
// slot holds LNK(occ) and the cell at occ holds the matching VAR/DP0/DP1.
// `link` is the only primitive allowed to write variable-bearing pointers
// into memory; it re-establishes the bond on every write.

use std::collections::HashMap;
use std::sync::OnceLock;

// Types
// -----

pub type Ptr = u64;

// Pointer constants
// -----------------

pub const VAL: u64 = 1;
pub const EX1: u64 = 1 << 44;
pub const EX0: u64 = 1 << 52;
pub const TAG: u64 = 1 << 60;

pub const POS_MASK: u64 = EX1 - 1;
pub const EXT_MASK: u64 = 0xFF;

// Largest node size served by the sized free-list buckets; bigger Ctr/Cal
// nodes fall back to a per-arity map.
pub const BUCKETS: u64 = 4;

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum Tag {
  NIL = 0x0,
  LNK = 0x1,
  DP0 = 0x2,
  DP1 = 0x3,
  VAR = 0x4,
  LAM = 0x5,
  APP = 0x6,
  PAR = 0x7,
  CTR = 0x8,
  CAL = 0x9,
}

impl Tag {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::NIL => "Nil",
      Self::LNK => "Lnk",
      Self::DP0 => "Dp0",
      Self::DP1 => "Dp1",
      Self::VAR => "Var",
      Self::LAM => "Lam",
      Self::APP => "App",
      Self::PAR => "Par",
      Self::CTR => "Ctr",
      Self::CAL => "Cal",
    }
  }

  pub fn as_u64(&self) -> u64 {
    *self as u64
  }

  // True for the variable-bearing tags whose writes must maintain a back-edge.
  pub fn is_bound(&self) -> bool {
    matches!(self, Self::DP0 | Self::DP1 | Self::VAR)
  }

  // Offset of the binder slot a bound pointer answers to. Tag values are
  // arranged so this is the lowest tag bit: DP0 -> 0, DP1 -> 1, VAR -> 0.
  pub fn bind_slot(&self) -> u64 {
    self.as_u64() & 0x1
  }

  pub fn is_whnf(&self) -> bool {
    !matches!(self, Self::APP | Self::DP0 | Self::DP1)
  }
}

impl std::fmt::Display for Tag {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl From<u64> for Tag {
  fn from(value: u64) -> Self {
    match value {
      0x0 => Self::NIL,
      0x1 => Self::LNK,
      0x2 => Self::DP0,
      0x3 => Self::DP1,
      0x4 => Self::VAR,
      0x5 => Self::LAM,
      0x6 => Self::APP,
      0x7 => Self::PAR,
      0x8 => Self::CTR,
      0x9 => Self::CAL,
      _ => panic!("invalid tag: {:x}", value),
    }
  }
}

impl From<Tag> for u64 {
  fn from(value: Tag) -> Self {
    value as u64
  }
}

// Pointer constructors
// --------------------

pub fn Nil() -> Ptr {
  0
}

pub fn Lnk(pos: u64) -> Ptr {
  (Tag::LNK.as_u64() * TAG) | pos
}

pub fn Dp0(col: u64, pos: u64) -> Ptr {
  (Tag::DP0.as_u64() * TAG) | (col * EX0) | pos
}

pub fn Dp1(col: u64, pos: u64) -> Ptr {
  (Tag::DP1.as_u64() * TAG) | (col * EX0) | pos
}

pub fn Var(pos: u64) -> Ptr {
  (Tag::VAR.as_u64() * TAG) | pos
}

pub fn Lam(pos: u64) -> Ptr {
  (Tag::LAM.as_u64() * TAG) | pos
}

pub fn App(pos: u64) -> Ptr {
  (Tag::APP.as_u64() * TAG) | pos
}

pub fn Par(col: u64, pos: u64) -> Ptr {
  (Tag::PAR.as_u64() * TAG) | (col * EX0) | pos
}

pub fn Ctr(ari: u64, id: u64, pos: u64) -> Ptr {
  (Tag::CTR.as_u64() * TAG) | (ari * EX0) | (id * EX1) | pos
}

pub fn Cal(ari: u64, id: u64, pos: u64) -> Ptr {
  (Tag::CAL.as_u64() * TAG) | (ari * EX0) | (id * EX1) | pos
}

// Pointer getters
// ---------------

pub fn get_tag(ptr: Ptr) -> Tag {
  (ptr / TAG).into()
}

pub fn get_ex0(ptr: Ptr) -> u64 {
  (ptr / EX0) & EXT_MASK
}

pub fn get_ex1(ptr: Ptr) -> u64 {
  (ptr / EX1) & EXT_MASK
}

pub fn get_pos(ptr: Ptr) -> u64 {
  ptr & POS_MASK
}

pub fn get_loc(ptr: Ptr, slot: u64) -> u64 {
  get_pos(ptr) + slot
}

// Number of cells a node occupies, given its head pointer.
pub fn arity_of(ptr: Ptr) -> u64 {
  match get_tag(ptr) {
    Tag::NIL | Tag::LNK | Tag::VAR => 0,
    Tag::LAM | Tag::APP | Tag::PAR => 2,
    Tag::DP0 | Tag::DP1 => 3,
    Tag::CTR | Tag::CAL => get_ex0(ptr),
  }
}

// Default gas limit, read once from the GAS_LIMIT environment variable.
pub fn default_gas_limit() -> u64 {
  static LIMIT: OnceLock<u64> = OnceLock::new();
  *LIMIT.get_or_init(|| {
    std::env::var("GAS_LIMIT").ok().and_then(|v| v.parse::<u64>().ok()).unwrap_or(u64::MAX)
  })
}

// Heap
// ----

// The sole mutable resource of the engine: the cell vector, the size-bucketed
// free lists, the rewrite counter and the generated-color counter.
pub struct Heap {
  pub node: Vec<Ptr>,
  free: [Vec<u64>; 4],
  free_big: HashMap<u64, Vec<u64>>,
  gas: u64,
  limit: u64,
  cols: u64,
}

impl Default for Heap {
  fn default() -> Self {
    Self::new()
  }
}

impl Heap {
  pub fn new() -> Self {
    Heap {
      node: Vec::new(),
      free: [Vec::new(), Vec::new(), Vec::new(), Vec::new()],
      free_big: HashMap::new(),
      gas: 0,
      limit: default_gas_limit(),
      cols: 0,
    }
  }

  pub fn with_capacity(cells: usize) -> Self {
    let mut heap = Self::new();
    heap.node.reserve(cells);
    heap
  }

  // Drops every node, free list and counter; the gas limit is kept.
  pub fn reset(&mut self) {
    self.node.clear();
    for bucket in self.free.iter_mut() {
      bucket.clear();
    }
    self.free_big.clear();
    self.gas = 0;
    self.cols = 0;
  }

  // Gas
  // ---

  pub fn get_gas(&self) -> u64 {
    self.gas
  }

  pub fn inc_gas(&mut self) {
    self.gas += 1;
  }

  pub fn get_gas_limit(&self) -> u64 {
    self.limit
  }

  pub fn set_gas_limit(&mut self, limit: u64) {
    self.limit = limit;
  }

  pub fn gas_exhausted(&self) -> bool {
    self.gas >= self.limit
  }

  // Fresh colors for sharing nodes introduced by the graph builder. Surface
  // colors live in 0..=127; generated ones cycle through 128..=255.
  pub fn gen_col(&mut self) -> u64 {
    let col = 0x80 | (self.cols & 0x7F);
    self.cols += 1;
    col
  }

  // Allocator
  // ---------

  // Returns the base index of `arity` contiguous cells, reusing a freed node
  // of the same size when one is available, bumping the tail otherwise.
  pub fn alloc(&mut self, arity: u64) -> u64 {
    if arity == 0 {
      return 0;
    }
    let reused = if arity < BUCKETS {
      self.free[arity as usize].pop()
    } else {
      self.free_big.get_mut(&arity).and_then(|bucket| bucket.pop())
    };
    match reused {
      Some(loc) => loc,
      None => {
        let loc = self.node.len() as u64;
        self.node.resize(self.node.len() + arity as usize, Nil());
        loc
      }
    }
  }

  // Zeroes the node's cells and returns them to the size bucket.
  pub fn free(&mut self, loc: u64, arity: u64) {
    if arity == 0 {
      return;
    }
    for i in 0..arity {
      self.node[(loc + i) as usize] = Nil();
    }
    if arity < BUCKETS {
      self.free[arity as usize].push(loc);
    } else {
      self.free_big.entry(arity).or_default().push(loc);
    }
  }

  // Allocator introspection: total cells ever claimed from the tail, and how
  // many nodes of a given size sit on the free list.
  pub fn heap_size(&self) -> usize {
    self.node.len()
  }

  pub fn free_count(&self, arity: u64) -> usize {
    if arity < BUCKETS {
      self.free[arity as usize].len()
    } else {
      self.free_big.get(&arity).map_or(0, |bucket| bucket.len())
    }
  }

  // Every cell currently sitting on a free list.
  pub fn free_cells(&self) -> Vec<u64> {
    let mut cells = vec![];
    for (arity, bucket) in self.free.iter().enumerate() {
      for &loc in bucket {
        cells.extend(loc..loc + arity as u64);
      }
    }
    for (&arity, bucket) in self.free_big.iter() {
      for &loc in bucket {
        cells.extend(loc..loc + arity);
      }
    }
    cells
  }

  // Pointers
  // --------

  // Given a location, loads the ptr stored on it.
  pub fn load_ptr(&self, loc: u64) -> Ptr {
    self.node[loc as usize]
  }

  // Given a pointer to a node, loads its nth slot.
  pub fn load_arg(&self, term: Ptr, slot: u64) -> Ptr {
    self.load_ptr(get_loc(term, slot))
  }

  // Given a location, takes the ptr stored on it, leaving Nil.
  pub fn take_ptr(&mut self, loc: u64) -> Ptr {
    std::mem::take(&mut self.node[loc as usize])
  }

  // Given a pointer to a node, takes its nth slot.
  pub fn take_arg(&mut self, term: Ptr, slot: u64) -> Ptr {
    self.take_ptr(get_loc(term, slot))
  }

  // Writes a ptr to memory. Updates binders: storing a VAR/DP0/DP1 patches
  // the corresponding binder slot to a LNK back at this location.
  pub fn link(&mut self, loc: u64, ptr: Ptr) -> Ptr {
    self.node[loc as usize] = ptr;
    let tag = get_tag(ptr);
    if tag.is_bound() {
      let slot = get_loc(ptr, tag.bind_slot());
      self.node[slot as usize] = Lnk(loc);
    }
    ptr
  }

  // Substitution
  // ------------

  // Performs a [x <- val] substitution. `bind` is the content of a binder
  // slot: a LNK naming the one occurrence, or NIL when the variable was
  // never used, in which case `val` just became unreachable on this path.
  pub fn subst(&mut self, bind: Ptr, val: Ptr) {
    if get_tag(bind) == Tag::LNK {
      self.link(get_loc(bind, 0), val);
    } else {
      self.collect(val, None);
    }
  }

  // Garbage collection
  // ------------------

  // Frees a subgraph that just became unreachable, niling every binder slot
  // it meets on the way down. The walk is optimistic: it stops at PAR nodes
  // (niling the slot that held them, when known), because a superposition is
  // fan-shared and the other side of the fan may still be live. Unreachable
  // fans left behind are reclaimed by an external full GC pass, not here.
  pub fn collect(&mut self, term: Ptr, host: Option<u64>) {
    let mut stack: Vec<(Ptr, Option<u64>)> = vec![(term, host)];
    while let Some((term, host)) = stack.pop() {
      match get_tag(term) {
        Tag::DP0 | Tag::DP1 => {
          let dup = get_loc(term, 0);
          self.link(dup + get_tag(term).bind_slot(), Nil());
          let other = dup + (1 - get_tag(term).bind_slot());
          if get_tag(self.load_ptr(other)) == Tag::NIL {
            // both projections erased: the duplicator and its expression go
            let expr = self.take_ptr(dup + 2);
            self.free(dup, 3);
            stack.push((expr, None));
          }
        }
        Tag::VAR => {
          self.link(get_loc(term, 0), Nil());
        }
        Tag::LAM => {
          let bind = self.take_arg(term, 0);
          if get_tag(bind) == Tag::LNK {
            self.link(get_loc(bind, 0), Nil());
          }
          let body = self.take_arg(term, 1);
          self.free(get_loc(term, 0), 2);
          stack.push((body, None));
        }
        Tag::APP => {
          let func = self.take_arg(term, 0);
          let argm = self.take_arg(term, 1);
          self.free(get_loc(term, 0), 2);
          stack.push((func, None));
          stack.push((argm, None));
        }
        Tag::PAR => {
          if let Some(host) = host {
            self.link(host, Nil());
          }
          // fan-shared subgraph: left for the full GC
        }
        Tag::CTR | Tag::CAL => {
          let arity = arity_of(term);
          for i in 0..arity {
            let arg = self.take_arg(term, i);
            stack.push((arg, None));
          }
          self.free(get_loc(term, 0), arity);
        }
        Tag::LNK | Tag::NIL => {}
      }
    }
  }
}
