use std::any::Any;
use std::rc::Rc;

use log::trace;

use crate::parser::{ParseResult, Parser};
use crate::state::ParseState;

/// One memo table slot: the outcome of running a rule at one position.
/// Success values are stored type-erased; `end` is where the cursor ended
/// up (meaningless for failures).
#[derive(Clone)]
pub(crate) struct MemoEntry {
    pub result: Result<Rc<dyn Any>, crate::parser::MatchFailure>,
    pub end: usize,
}

fn replay<T: Clone + 'static>(
    st: &mut ParseState,
    rule: &'static str,
    entry: MemoEntry,
) -> ParseResult<T> {
    match entry.result {
        Ok(value) => {
            let value = value.downcast::<T>().unwrap_or_else(|_| {
                panic!(
                    "memo table holds a mismatched type for rule '{}'; rule names must be unique",
                    rule
                )
            });
            st.jump(entry.end);
            Ok((*value).clone())
        }
        Err(failure) => Err(failure),
    }
}

/// Packrat memoisation.
///
/// Wrap the immediate body of a `Rule` to cache its outcome per input
/// position, keyed by the rule's name. A cached success replays by moving
/// the cursor to the recorded end; a cached failure replays as a failure
/// without running the body again. This is what makes grammars without
/// left recursion parse in linear time.
///
/// Not for left-recursive rules: use `memo_left` there, and never both on
/// the same rule, since the two interpret the table differently.
pub struct Memo<P> {
    inner: P,
}

impl<P> Parser for Memo<P>
where
    P: Parser,
    P::Result: Clone + 'static,
{
    type Result = P::Result;

    fn label(&self) -> Option<&'static str> {
        self.inner.label()
    }

    fn parse(&self, st: &mut ParseState) -> ParseResult<P::Result> {
        let rule = st.current_rule();
        let pos = st.index();
        if let Some(entry) = st.memo_lookup(rule, pos) {
            trace!("memo hit for '{}' at {}", rule, pos);
            return replay(st, rule, entry);
        }
        match self.inner.parse(st) {
            Ok(value) => {
                let end = st.index();
                st.memo_insert(
                    rule,
                    pos,
                    MemoEntry {
                        result: Ok(Rc::new(value.clone()) as Rc<dyn Any>),
                        end,
                    },
                );
                Ok(value)
            }
            Err(failure) => {
                st.memo_insert(
                    rule,
                    pos,
                    MemoEntry {
                        result: Err(failure.clone()),
                        end: pos,
                    },
                );
                Err(failure)
            }
        }
    }
}

pub fn memo<P>(inner: P) -> Memo<P>
where
    P: Parser,
    P::Result: Clone + 'static,
{
    Memo { inner }
}

/// Seed-and-grow memoisation for left-recursive rules.
///
/// On the first invocation at a position, the table is seeded with a
/// failure, so the body's leftmost self-reference fails immediately and a
/// non-recursive alternative supplies the base case. The body is then
/// re-run from the same position; each pass replays the previous best
/// parse for its self-reference and may extend it by one layer. The loop
/// stops as soon as a pass fails to reach further than the one before,
/// and the best parse wins.
///
/// The growth only extends the left spine, so the right-hand side of a
/// left-recursive alternative must be a non-recursive rule (the atomic
/// term), or the tail would never be consumed differently.
pub struct MemoLeft<P> {
    inner: P,
}

impl<P> Parser for MemoLeft<P>
where
    P: Parser,
    P::Result: Clone + 'static,
{
    type Result = P::Result;

    fn label(&self) -> Option<&'static str> {
        self.inner.label()
    }

    fn parse(&self, st: &mut ParseState) -> ParseResult<P::Result> {
        let rule = st.current_rule();
        let start = st.index();
        if let Some(entry) = st.memo_lookup(rule, start) {
            trace!("memo hit for '{}' at {}", rule, start);
            return replay(st, rule, entry);
        }

        // Seed with a failure so the first self-reference unwinds and the
        // base-case alternative gets to run.
        let seed = st.failure(format!("Expected {}", rule));
        st.memo_insert(
            rule,
            start,
            MemoEntry {
                result: Err(seed.clone()),
                end: start,
            },
        );

        let mut last: ParseResult<P::Result> = Err(seed);
        let mut last_end: Option<usize> = None;
        loop {
            st.jump(start);
            let attempt = self.inner.parse(st);
            let end = if attempt.is_ok() { st.index() } else { start };
            if last_end.map_or(false, |prev| end <= prev) {
                break;
            }
            trace!("rule '{}' at {} grew to {}", rule, start, end);
            let stored = match &attempt {
                Ok(value) => Ok(Rc::new(value.clone()) as Rc<dyn Any>),
                Err(failure) => Err(failure.clone()),
            };
            st.memo_insert(rule, start, MemoEntry { result: stored, end });
            last = attempt;
            last_end = Some(end);
        }

        match last {
            Ok(value) => {
                st.jump(last_end.unwrap_or(start));
                Ok(value)
            }
            Err(failure) => {
                st.jump(start);
                Err(failure)
            }
        }
    }
}

pub fn memo_left<P>(inner: P) -> MemoLeft<P>
where
    P: Parser,
    P::Result: Clone + 'static,
{
    MemoLeft { inner }
}
