#![allow(dead_code)]

//! rpeg is a packrat PEG parser combinator library with direct support for
//! left-recursive rules. A grammar is a set of named rules composed from a
//! small vocabulary of primitives and combinators; the engine drives the
//! root rule over a string, memoises rule results per input position, and
//! on failure reports the diagnostic that reached furthest into the input.
//!
//! You will notice two kinds of names, as in most combinator libraries:
//!
//!   * Ones starting with a capital letter are `struct`s (such as
//!     `StringParser`, `First`, `Rule`). You can create them with
//!     `Name::new()`.
//!   * Ones starting with a lower case letter (such as `string`, `first`,
//!     `memo_left`) are convenience functions returning those structs.
//!
//! Rule bodies are written as closures over `&mut ParseState` that run
//! sub-parsers with `?`; `sequence` wraps such a closure into a parser and
//! takes care of backtracking and failure labelling. Left-recursive rules
//! work when wrapped in `memo_left`, which finds the fixed point of the
//! rule at each position by seeding the memo table with a failure and
//! re-running the body until it stops growing.
//!
//! Here's a short example with a left-recursive rule:
//!
//! ```
//! use rpeg::{first, memo_left, regex, sequence, string};
//! use rpeg::{ParseResult, ParseState, Parser, PegParser, Rule};
//!
//! // expr := expr '+' num | num
//! let num = Rule::define("num", regex("[0-9]+"));
//! let expr: Rule<String> = Rule::new("expr");
//! expr.bind(memo_left(first((
//!     sequence({
//!         let (head, tail) = (expr.clone(), num.clone());
//!         let plus = string("+");
//!         move |st: &mut ParseState| -> ParseResult<String> {
//!             let left = head.parse(st)?;
//!             plus.parse(st)?;
//!             let right = tail.parse(st)?;
//!             Ok(format!("({}+{})", left, right))
//!         }
//!     }),
//!     num,
//! ))));
//!
//! let parser = PegParser::new(expr).require_end_of_input();
//! assert_eq!(Ok("((1+2)+3)".to_string()), parser.try_parse("1+2+3"));
//!
//! let failure = parser.try_parse("1+2+x").unwrap_err();
//! println!("{}", failure.report("1+2+x"));
//! ```
//!
//! Parsers returned by functions such as `regex()` compile their pattern
//! once; construct them outside rule-body closures and capture them, so
//! they are not rebuilt on every invocation.
//!
//! Note that not all primitives and combinators are exported at the crate
//! level! Only "important" ones are.

#[allow(unused_imports)]
#[macro_use]
extern crate time_test;

pub mod combinators;
pub mod memo;
pub mod parser;
pub mod primitives;
pub mod rules;
mod state;

pub use combinators::{
    first, maybe, one_or_more, separated, sequence, zero_or_more, First, Maybe, Separated,
    Sequence,
};
pub use memo::{memo, memo_left, Memo, MemoLeft};
pub use parser::{MatchFailure, ParseResult, Parser, PegParser};
pub use primitives::{
    character, end_of_input, regex, string, whitespace, CharParser, EndOfInput, RegexParser,
    StringParser,
};
pub use rules::Rule;
pub use state::{Hold, ParseState};
