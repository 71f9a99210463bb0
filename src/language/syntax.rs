use highlight_error::highlight_error;
use TSPL::{new_parser, Parser};

// Types
// =====

// Term
// ----
//
// The textual surface recognized by the companion parser:
//
//   λname: body        lambda
//   (f a b ...)        application (left-nested)
//   &c<a b>            superposition with color c
//   !c<n0 n1> = e; k   duplicator: n0/n1 name the projections of e in k
//   $id:arity{a b ..}  constructor
//   @id:arity{a b ..}  function call
//   name               variable occurrence

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
  Var { name: String },
  Dup { col: u64, nam0: String, nam1: String, expr: Box<Term>, body: Box<Term> },
  Sup { col: u64, val0: Box<Term>, val1: Box<Term> },
  Lam { name: String, body: Box<Term> },
  App { func: Box<Term>, argm: Box<Term> },
  Ctr { id: u64, args: Vec<Term> },
  Cal { id: u64, args: Vec<Term> },
}

// Surface colors are capped so the builder can generate fresh ones above.
pub const MAX_SURFACE_COL: u64 = 0x7F;

// Ctr/Cal ids and arities travel in 8-bit pointer payloads.
pub const MAX_ID: u64 = 0xFF;

impl Term {
  /// returns a term representing the variable called `name`
  pub fn variable(name: impl Into<String>) -> Self {
    Self::Var { name: name.into() }
  }

  /// returns a term representing the expression `λparam: body`
  pub fn lambda(param: impl Into<String>, body: Self) -> Self {
    Self::Lam { name: param.into(), body: Box::new(body) }
  }

  /// returns a term representing the expression `(func arg)`
  pub fn application(func: Self, arg: Self) -> Self {
    Self::App { func: Box::new(func), argm: Box::new(arg) }
  }

  /// returns a term applying `func` to every argument in order
  pub fn applications(func: Self, args: impl IntoIterator<Item = Self>) -> Self {
    args.into_iter().fold(func, Self::application)
  }

  /// returns a term representing the superposition `&col<val0 val1>`
  pub fn superposition(col: u64, val0: Self, val1: Self) -> Self {
    Self::Sup { col, val0: Box::new(val0), val1: Box::new(val1) }
  }

  /// returns a term representing the expression `$id:arity{args...}`
  pub fn constructor(id: u64, args: impl IntoIterator<Item = Self>) -> Self {
    Self::Ctr { id, args: args.into_iter().collect() }
  }
}

// Stringifier
// ===========

impl std::fmt::Display for Term {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    fn fields(args: &[Term]) -> String {
      args.iter().map(|x| format!("{}", x)).collect::<Vec<String>>().join(" ")
    }
    match self {
      Self::Var { name } => write!(f, "{}", name),
      Self::Dup { col, nam0, nam1, expr, body } => {
        write!(f, "!{}<{} {}> = {}; {}", col, nam0, nam1, expr, body)
      }
      Self::Sup { col, val0, val1 } => write!(f, "&{}<{} {}>", col, val0, val1),
      Self::Lam { name, body } => write!(f, "λ{}: {}", name, body),
      Self::App { func, argm } => {
        let mut args = vec![argm];
        let mut expr = func;
        while let Self::App { func, argm } = &**expr {
          args.push(argm);
          expr = func;
        }
        args.reverse();
        write!(f, "({} {})", expr, args.iter().map(|x| format!("{}", x)).collect::<Vec<String>>().join(" "))
      }
      Self::Ctr { id, args } => write!(f, "${}:{}{{{}}}", id, args.len(), fields(args)),
      Self::Cal { id, args } => write!(f, "@{}:{}{{{}}}", id, args.len(), fields(args)),
    }
  }
}

// Parser
// ======

new_parser!(TermParser);

impl<'i> TermParser<'i> {
  pub fn parse_term(&mut self) -> Result<Term, String> {
    self.skip_trivia();
    match self.peek_one() {
      Some('λ') => {
        self.advance_one();
        let name = self.parse_name()?;
        self.consume(":")?;
        let body = Box::new(self.parse_term()?);
        Ok(Term::Lam { name, body })
      }
      Some('(') => {
        self.advance_one();
        let mut func = self.parse_term()?;
        self.skip_trivia();
        while self.peek_one() != Some(')') {
          if self.peek_one().is_none() {
            return self.expected("')'")?;
          }
          let argm = self.parse_term()?;
          func = Term::App { func: Box::new(func), argm: Box::new(argm) };
          self.skip_trivia();
        }
        self.consume(")")?;
        Ok(func)
      }
      Some('&') => {
        self.advance_one();
        let col = self.parse_col()?;
        self.consume("<")?;
        let val0 = Box::new(self.parse_term()?);
        let val1 = Box::new(self.parse_term()?);
        self.consume(">")?;
        Ok(Term::Sup { col, val0, val1 })
      }
      Some('!') => {
        self.advance_one();
        let col = self.parse_col()?;
        self.consume("<")?;
        let nam0 = self.parse_name()?;
        self.skip_trivia();
        let nam1 = self.parse_name()?;
        self.consume(">")?;
        self.consume("=")?;
        let expr = Box::new(self.parse_term()?);
        self.consume(";")?;
        let body = Box::new(self.parse_term()?);
        Ok(Term::Dup { col, nam0, nam1, expr, body })
      }
      Some('$') => {
        self.advance_one();
        let (id, args) = self.parse_fields()?;
        Ok(Term::Ctr { id, args })
      }
      Some('@') => {
        self.advance_one();
        let (id, args) = self.parse_fields()?;
        Ok(Term::Cal { id, args })
      }
      Some(_) => {
        let name = self.parse_name()?;
        Ok(Term::Var { name })
      }
      None => self.expected("term")?,
    }
  }

  fn parse_u64_lit(&mut self) -> Result<u64, String> {
    self.skip_trivia();
    let start = self.index;
    let digits = self.take_while(|c| c.is_ascii_digit());
    let end = self.index;
    if digits.is_empty() {
      return self.expected("number")?;
    }
    digits
      .parse::<u64>()
      .map_err(|err| format!("invalid number literal: {}\n{}", err, highlight_error(start, end, self.input)))
  }

  fn parse_col(&mut self) -> Result<u64, String> {
    let start = self.index;
    let col = self.parse_u64_lit()?;
    if col > MAX_SURFACE_COL {
      return Err(format!(
        "color {} is outside the surface range 0..={}\n{}",
        col,
        MAX_SURFACE_COL,
        highlight_error(start, self.index, self.input)
      ));
    }
    Ok(col)
  }

  // `id:arity{a b ...}`, shared by constructors and calls
  fn parse_fields(&mut self) -> Result<(u64, Vec<Term>), String> {
    let start = self.index;
    let id = self.parse_u64_lit()?;
    if id > MAX_ID {
      return Err(format!(
        "id {} does not fit an 8-bit payload\n{}",
        id,
        highlight_error(start, self.index, self.input)
      ));
    }
    self.consume(":")?;
    let arity = self.parse_u64_lit()?;
    self.consume("{")?;
    let mut args = vec![];
    self.skip_trivia();
    while self.peek_one() != Some('}') {
      if self.peek_one().is_none() {
        return self.expected("'}'")?;
      }
      args.push(self.parse_term()?);
      self.skip_trivia();
    }
    self.consume("}")?;
    if args.len() as u64 != arity {
      return Err(format!(
        "arity mismatch: {} declared, {} given\n{}",
        arity,
        args.len(),
        highlight_error(start, self.index, self.input)
      ));
    }
    Ok((id, args))
  }
}

pub fn read_term(code: &str) -> Result<Term, String> {
  let mut parser = TermParser::new(code);
  let term = parser.parse_term()?;
  parser.skip_trivia();
  if !parser.is_eof() {
    return parser.expected("end of input")?;
  }
  Ok(term)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn roundtrips(code: &str) {
    let term = read_term(code).unwrap();
    assert_eq!(format!("{}", term), code);
    assert_eq!(read_term(&format!("{}", term)).unwrap(), term);
  }

  #[test]
  fn parses_the_surface_forms() {
    roundtrips("λx: x");
    roundtrips("(f a)");
    roundtrips("&3<λx: x λy: y>");
    roundtrips("!0<a b> = λx: x; (a b)");
    roundtrips("$7:2{λx: x $0:0{}}");
    roundtrips("@1:1{λx: x}");
  }

  #[test]
  fn applications_nest_to_the_left() {
    let term = read_term("(f a b)").unwrap();
    let expect = Term::applications(
      Term::variable("f"),
      [Term::variable("a"), Term::variable("b")],
    );
    assert_eq!(term, expect);
    assert_eq!(format!("{}", term), "(f a b)");
  }

  #[test]
  fn lambda_bodies_take_one_term() {
    // the body of λx stops at `x`; `y` belongs to the enclosing application
    let term = read_term("(λx: x y)").unwrap();
    let expect = Term::application(
      Term::lambda("x", Term::variable("x")),
      Term::variable("y"),
    );
    assert_eq!(term, expect);
  }

  #[test]
  fn rejects_unbalanced_brackets() {
    assert!(read_term("(f a").is_err());
    assert!(read_term("&0<a b").is_err());
    assert!(read_term("λx x").is_err());
  }

  #[test]
  fn rejects_out_of_range_colors() {
    assert!(read_term("&128<a b>").is_err());
    assert!(read_term("!200<a b> = x; a").is_err());
    assert!(read_term("&127<λx: x λy: y>").is_ok());
  }

  #[test]
  fn rejects_arity_mismatches() {
    assert!(read_term("$1:2{λx: x}").is_err());
    assert!(read_term("@1:0{λx: x}").is_err());
  }

  #[test]
  fn rejects_trailing_garbage() {
    assert!(read_term("λx: x λy: y").is_err());
  }
}
