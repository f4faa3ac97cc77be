use std::marker::PhantomData;

use crate::parser::{MatchFailure, ParseResult, Parser};
use crate::state::ParseState;

/// Wraps a rule body given as a closure. The closure runs sub-parsers in
/// order with `?` and assembles their results; `Sequence` adds the
/// backtracking and diagnostic discipline around it.
///
/// When the body fails with a failure belonging to a different rule, the
/// failure is wrapped in one labelled with the enclosing rule, keeping the
/// inner failure as its cause. A failure already labelled with the
/// enclosing rule passes through unchanged, so a rule failing on its own
/// terminal keeps its precise message.
pub struct Sequence<R, F> {
    body: F,
    _result: PhantomData<fn() -> R>,
}

impl<R, F> Sequence<R, F>
where
    F: Fn(&mut ParseState) -> ParseResult<R>,
{
    pub fn new(body: F) -> Sequence<R, F> {
        Sequence {
            body,
            _result: PhantomData,
        }
    }
}

impl<R, F> Parser for Sequence<R, F>
where
    F: Fn(&mut ParseState) -> ParseResult<R>,
{
    type Result = R;
    fn parse(&self, st: &mut ParseState) -> ParseResult<R> {
        let hold = st.hold();
        match (self.body)(st) {
            Ok(value) => {
                st.release(hold);
                Ok(value)
            }
            Err(inner) => {
                let failure = if inner.rule == st.current_rule() {
                    inner
                } else {
                    st.failure_with_cause("Error parsing sequence", inner)
                };
                st.reset(hold);
                Err(failure)
            }
        }
    }
}

pub fn sequence<R, F>(body: F) -> Sequence<R, F>
where
    F: Fn(&mut ParseState) -> ParseResult<R>,
{
    Sequence::new(body)
}

/// Ordered choice: tries each alternative in declaration order and commits
/// to the first that succeeds. Construct it with a tuple of alternatives
/// sharing one result type.
pub struct First<T> {
    t: T,
}

impl<T> First<T> {
    pub fn new(alternatives: T) -> First<T> {
        First { t: alternatives }
    }
}

macro_rules! first_impl {
    ( ( $($ptype:ident/$ix:tt),+ ) ) => {
        impl<R, $($ptype: Parser<Result = R>,)+> Parser for First<($($ptype,)+)> {
            type Result = R;
            fn parse(&self, st: &mut ParseState) -> ParseResult<Self::Result> {
                st.descend()?;
                let mut deepest: Option<MatchFailure> = None;
                $(
                    let hold = st.hold();
                    match (self.t.$ix).parse(st) {
                        Ok(value) => {
                            st.release(hold);
                            st.ascend();
                            return Ok(value);
                        }
                        Err(failure) => {
                            st.reset(hold);
                            deepest = Some(match deepest.take() {
                                Some(seen) if seen.rank <= failure.rank => seen,
                                _ => failure,
                            });
                        }
                    }
                )+
                st.ascend();
                let mut names: Vec<&'static str> = vec![];
                $(
                    if let Some(name) = (self.t.$ix).label() {
                        names.push(name);
                    }
                )+
                let message = if names.is_empty() {
                    "No alternative matched".to_string()
                } else {
                    format!("Expected one of: {}", names.join(", "))
                };
                match deepest {
                    Some(cause) => Err(st.failure_with_cause(message, cause)),
                    None => unreachable!(),
                }
            }
        }
    }
}

first_impl!((P0 / 0, P1 / 1));
first_impl!((P0 / 0, P1 / 1, P2 / 2));
first_impl!((P0 / 0, P1 / 1, P2 / 2, P3 / 3));
first_impl!((P0 / 0, P1 / 1, P2 / 2, P3 / 3, P4 / 4));
first_impl!((P0 / 0, P1 / 1, P2 / 2, P3 / 3, P4 / 4, P5 / 5));
first_impl!((P0 / 0, P1 / 1, P2 / 2, P3 / 3, P4 / 4, P5 / 5, P6 / 6));
first_impl!((
    P0 / 0,
    P1 / 1,
    P2 / 2,
    P3 / 3,
    P4 / 4,
    P5 / 5,
    P6 / 6,
    P7 / 7
));
first_impl!((
    P0 / 0,
    P1 / 1,
    P2 / 2,
    P3 / 3,
    P4 / 4,
    P5 / 5,
    P6 / 6,
    P7 / 7,
    P8 / 8
));
first_impl!((
    P0 / 0,
    P1 / 1,
    P2 / 2,
    P3 / 3,
    P4 / 4,
    P5 / 5,
    P6 / 6,
    P7 / 7,
    P8 / 8,
    P9 / 9
));

pub fn first<T>(alternatives: T) -> First<T> {
    First::new(alternatives)
}

/// Tries the inner parser; yields `Some(value)` on success and `None` on
/// failure, never failing itself. The cursor is untouched when the inner
/// parser fails.
pub struct Maybe<P> {
    inner: P,
}

impl<P: Parser> Parser for Maybe<P> {
    type Result = Option<P::Result>;
    fn parse(&self, st: &mut ParseState) -> ParseResult<Self::Result> {
        let hold = st.hold();
        match self.inner.parse(st) {
            Ok(value) => {
                st.release(hold);
                Ok(Some(value))
            }
            Err(_) => {
                st.reset(hold);
                Ok(None)
            }
        }
    }
}

pub fn maybe<P: Parser>(inner: P) -> Maybe<P> {
    Maybe { inner }
}

/// Collects repeated matches of the inner parser into a vector, stopping
/// at the first failure. An iteration that succeeds without moving the
/// cursor ends the loop, so zero-width parsers cannot spin it forever.
pub struct Repeat<P> {
    inner: P,
    min: usize,
}

impl<P: Parser> Parser for Repeat<P> {
    type Result = Vec<P::Result>;
    fn parse(&self, st: &mut ParseState) -> ParseResult<Self::Result> {
        let start = st.hold();
        let mut items = vec![];
        loop {
            let hold = st.hold();
            let before = st.index();
            match self.inner.parse(st) {
                Ok(item) => {
                    st.release(hold);
                    let advanced = st.index() > before;
                    items.push(item);
                    if !advanced {
                        break;
                    }
                }
                Err(failure) => {
                    st.reset(hold);
                    if items.len() < self.min {
                        let out = st.failure_with_cause("Expected at least one occurrence", failure);
                        st.reset(start);
                        return Err(out);
                    }
                    break;
                }
            }
        }
        st.release(start);
        Ok(items)
    }
}

pub fn zero_or_more<P: Parser>(inner: P) -> Repeat<P> {
    Repeat { inner, min: 0 }
}

pub fn one_or_more<P: Parser>(inner: P) -> Repeat<P> {
    Repeat { inner, min: 1 }
}

/// Parses items separated by a separator. A trailing separator is not
/// consumed; when the item after it fails, both are backtracked. With
/// `required` set, a missing leading item is a failure instead of an
/// empty list.
pub struct Separated<P, S> {
    item: P,
    sep: S,
    required: bool,
}

impl<P: Parser, S: Parser> Parser for Separated<P, S> {
    type Result = Vec<P::Result>;
    fn parse(&self, st: &mut ParseState) -> ParseResult<Self::Result> {
        let lead = st.hold();
        let first_item = match self.item.parse(st) {
            Ok(value) => {
                st.release(lead);
                value
            }
            Err(failure) => {
                st.reset(lead);
                if self.required {
                    return Err(st.failure_with_cause("Expected at least one occurrence", failure));
                }
                return Ok(vec![]);
            }
        };
        let mut items = vec![first_item];
        loop {
            let hold = st.hold();
            let before = st.index();
            let more = self
                .sep
                .parse(st)
                .and_then(|_| self.item.parse(st));
            match more {
                Ok(item) => {
                    st.release(hold);
                    let advanced = st.index() > before;
                    items.push(item);
                    if !advanced {
                        break;
                    }
                }
                Err(_) => {
                    st.reset(hold);
                    break;
                }
            }
        }
        Ok(items)
    }
}

pub fn separated<P: Parser, S: Parser>(sep: S, required: bool, item: P) -> Separated<P, S> {
    Separated {
        item,
        sep,
        required,
    }
}

/// Applies a fallible user function to the inner result. An `Err` from
/// the function fails the parse and rewinds the cursor to where the inner
/// parser started.
pub struct Transform<R, R2, P, F> {
    p: P,
    f: F,
    _marker: PhantomData<fn(R) -> R2>,
}

impl<R, R2, P, F> Transform<R, R2, P, F>
where
    P: Parser<Result = R>,
    F: Fn(R) -> Result<R2, String>,
{
    pub fn new(p: P, f: F) -> Transform<R, R2, P, F> {
        Transform {
            p,
            f,
            _marker: PhantomData,
        }
    }
}

impl<R, R2, P, F> Parser for Transform<R, R2, P, F>
where
    P: Parser<Result = R>,
    F: Fn(R) -> Result<R2, String>,
{
    type Result = R2;
    fn parse(&self, st: &mut ParseState) -> ParseResult<R2> {
        let hold = st.hold();
        match self.p.parse(st) {
            Ok(value) => match (self.f)(value) {
                Ok(mapped) => {
                    st.release(hold);
                    Ok(mapped)
                }
                Err(message) => {
                    let failure = st.failure(message);
                    st.reset(hold);
                    Err(failure)
                }
            },
            Err(failure) => {
                st.reset(hold);
                Err(failure)
            }
        }
    }
    fn label(&self) -> Option<&'static str> {
        self.p.label()
    }
}

/// Applies an infallible function to the inner result.
pub struct Map<R, R2, P, F> {
    p: P,
    f: F,
    _marker: PhantomData<fn(R) -> R2>,
}

impl<R, R2, P, F> Map<R, R2, P, F>
where
    P: Parser<Result = R>,
    F: Fn(R) -> R2,
{
    pub fn new(p: P, f: F) -> Map<R, R2, P, F> {
        Map {
            p,
            f,
            _marker: PhantomData,
        }
    }
}

impl<R, R2, P, F> Parser for Map<R, R2, P, F>
where
    P: Parser<Result = R>,
    F: Fn(R) -> R2,
{
    type Result = R2;
    fn parse(&self, st: &mut ParseState) -> ParseResult<R2> {
        Ok((self.f)(self.p.parse(st)?))
    }
    fn label(&self) -> Option<&'static str> {
        self.p.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{character, regex, string, whitespace};
    use crate::rules::Rule;

    #[test]
    fn sequence_assembles_and_backtracks() {
        let a = string("ab");
        let b = string("cd");
        let p = sequence(move |st: &mut ParseState| -> ParseResult<String> {
            let left = a.parse(st)?;
            let right = b.parse(st)?;
            Ok(format!("{}{}", left, right))
        });

        let mut st = ParseState::new("abcd");
        assert_eq!(Ok("abcd".to_string()), p.parse(&mut st));
        assert!(st.finished());

        // Failure after partial consumption leaves the cursor untouched.
        let mut st = ParseState::new("abxx");
        assert!(p.parse(&mut st).is_err());
        assert_eq!(0, st.index());
    }

    #[test]
    fn sequence_labels_foreign_failures_once() {
        let inner = Rule::define(
            "inner",
            sequence(|st: &mut ParseState| -> ParseResult<String> {
                string("x").parse(st)
            }),
        );
        let outer = Rule::define(
            "outer",
            sequence(move |st: &mut ParseState| -> ParseResult<String> {
                inner.parse(st)
            }),
        );

        let mut st = ParseState::new("y");
        let failure = outer.parse(&mut st).unwrap_err();
        // One wrapper labelled "outer"; the terminal failure inside
        // "inner" passed through its own sequence unchanged.
        assert_eq!("outer", failure.rule);
        assert_eq!("Error parsing sequence", failure.message);
        let cause = failure.cause.as_deref().unwrap();
        assert_eq!("inner", cause.rule);
        assert_eq!("Expected \"x\"", cause.message);
        assert!(cause.cause.is_none());
    }

    #[test]
    fn first_commits_to_the_first_success() {
        let p = first((string("ab"), string("a")));
        let mut st = ParseState::new("ab");
        assert_eq!(Ok("ab".to_string()), p.parse(&mut st));

        let mut st = ParseState::new("ac");
        assert_eq!(Ok("a".to_string()), p.parse(&mut st));
        assert_eq!(1, st.index());
    }

    #[test]
    fn first_lists_named_alternatives() {
        let num = Rule::define("num", regex("[0-9]+"));
        let word = Rule::define("word", regex("[a-z]+"));
        let p = first((num, word));
        let mut st = ParseState::new("???");
        let failure = p.parse(&mut st).unwrap_err();
        assert_eq!("Expected one of: num, word", failure.message);
        assert!(failure.cause.is_some());
        assert_eq!(0, st.index());
    }

    #[test]
    fn first_keeps_the_deepest_cause() {
        let long = sequence(|st: &mut ParseState| -> ParseResult<String> {
            let a = string("ab").parse(st)?;
            let b = string("cd").parse(st)?;
            Ok(format!("{}{}", a, b))
        });
        let p = first((long, string("zz")));
        let mut st = ParseState::new("abxx");
        let failure = p.parse(&mut st).unwrap_err();
        // The first alternative got two characters in; its failure is the
        // cause, not the "zz" mismatch at the start.
        assert_eq!(-2, failure.cause.as_deref().unwrap().rank);
    }

    #[test]
    fn maybe_conserves_position() {
        let p = maybe(string("ab"));
        let mut st = ParseState::new("abc");
        assert_eq!(Ok(Some("ab".to_string())), p.parse(&mut st));
        assert_eq!(2, st.index());

        let mut st = ParseState::new("xyz");
        assert_eq!(Ok(None), p.parse(&mut st));
        assert_eq!(0, st.index());
    }

    #[test]
    fn zero_or_more_collects() {
        let p = zero_or_more(character('a'));
        let mut st = ParseState::new("aaab");
        assert_eq!(Ok(vec!['a', 'a', 'a']), p.parse(&mut st));
        assert_eq!(3, st.index());

        let mut st = ParseState::new("b");
        assert_eq!(Ok(vec![]), p.parse(&mut st));
        assert_eq!(0, st.index());
    }

    #[test]
    fn one_or_more_requires_a_match() {
        let p = one_or_more(character('a'));
        let mut st = ParseState::new("b");
        let failure = p.parse(&mut st).unwrap_err();
        assert_eq!("Expected at least one occurrence", failure.message);
        assert_eq!("Expected 'a'", failure.cause.as_deref().unwrap().message);
        assert_eq!(0, st.index());

        let mut st = ParseState::new("aab");
        assert_eq!(Ok(vec!['a', 'a']), p.parse(&mut st));
    }

    #[test]
    fn repetition_terminates_on_zero_width_success() {
        let p = zero_or_more(whitespace());
        let mut st = ParseState::new("abc");
        assert_eq!(Ok(vec!["".to_string()]), p.parse(&mut st));
        assert_eq!(0, st.index());
    }

    #[test]
    fn separated_list() {
        let p = separated(character(','), false, regex("[0-9]+"));
        let mut st = ParseState::new("1,22,333");
        assert_eq!(
            Ok(vec!["1".to_string(), "22".to_string(), "333".to_string()]),
            p.parse(&mut st)
        );
        assert!(st.finished());

        let mut st = ParseState::new("x");
        assert_eq!(Ok(vec![]), p.parse(&mut st));
        assert_eq!(0, st.index());
    }

    #[test]
    fn separated_leaves_trailing_separator() {
        let p = separated(character(','), true, regex("[0-9]+"));
        let mut st = ParseState::new("1,2,x");
        assert_eq!(Ok(vec!["1".to_string(), "2".to_string()]), p.parse(&mut st));
        assert_eq!(3, st.index());
    }

    #[test]
    fn separated_required_fails_on_empty() {
        let p = separated(character(','), true, regex("[0-9]+"));
        let mut st = ParseState::new("x");
        let failure = p.parse(&mut st).unwrap_err();
        assert_eq!("Expected at least one occurrence", failure.message);
        assert_eq!(0, st.index());
    }

    #[test]
    fn apply_fails_and_rewinds() {
        let even = regex("[0-9]+").apply(|s: String| {
            let n: i64 = s.parse().map_err(|e| format!("{}", e))?;
            if n % 2 == 0 {
                Ok(n)
            } else {
                Err(format!("{} is odd", n))
            }
        });
        let mut st = ParseState::new("42");
        assert_eq!(Ok(42), even.parse(&mut st));

        let mut st = ParseState::new("7");
        let failure = even.parse(&mut st).unwrap_err();
        assert_eq!("7 is odd", failure.message);
        assert_eq!(0, st.index());
    }

    #[test]
    fn map_transforms() {
        let p = regex("[0-9]+").map(|s: String| s.len());
        let mut st = ParseState::new("12345");
        assert_eq!(Ok(5), p.parse(&mut st));
    }

    #[test]
    fn map_keeps_the_rule_label() {
        let num = Rule::define("num", regex("[0-9]+"));
        let mapped = num.map(|s: String| s.len());
        assert_eq!(Some("num"), mapped.label());
    }
}
