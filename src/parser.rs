use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::combinators::{Map, Transform};
use crate::state::{ParseState, DEFAULT_RECURSION_LIMIT};

/// The single failure type raised by parsers.
///
/// A failure names the innermost rule that was being parsed, the cursor
/// position at the moment of failure, a short message, and optionally the
/// failure that propagated up into it. The precomputed `rank` orders
/// failures by how far into the input they (or any failure in their cause
/// chain) occurred; smaller is deeper and therefore more informative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchFailure {
    pub rule: &'static str,
    pub pos: usize,
    pub message: String,
    pub cause: Option<Box<MatchFailure>>,
    pub(crate) rank: i64,
}

impl MatchFailure {
    pub(crate) fn new(
        rule: &'static str,
        pos: usize,
        message: String,
        cause: Option<MatchFailure>,
    ) -> MatchFailure {
        let mut rank = -(pos as i64);
        if let Some(cause) = &cause {
            rank = rank.min(cause.rank);
        }
        MatchFailure {
            rule,
            pos,
            message,
            cause: cause.map(Box::new),
            rank,
        }
    }

    /// Renders the failure against the input it came from: the offending
    /// line, a marker under the failure column, and the message.
    ///
    /// ```text
    /// Error in rule 'num' at line 1: 1+x
    ///                                  /\
    /// Error: Expected /[0-9]+/
    /// ```
    pub fn report(&self, input: &str) -> String {
        let (line_no, col) = line_col(input, self.pos);
        let prefix = if self.rule.is_empty() {
            format!("Error at line {}: ", line_no)
        } else {
            format!("Error in rule '{}' at line {}: ", self.rule, line_no)
        };
        let line = input.lines().nth(line_no - 1).unwrap_or("");
        let indent = prefix.chars().count() + col - 1;
        format!(
            "{}{}\n{}/\\\nError: {}",
            prefix,
            line,
            " ".repeat(indent),
            self.message
        )
    }
}

/// 1-based line and column of a byte offset, counting columns in
/// characters.
fn line_col(input: &str, pos: usize) -> (usize, usize) {
    let prefix = &input[..pos.min(input.len())];
    let line = prefix.matches('\n').count() + 1;
    let col = prefix.rsplit('\n').next().unwrap_or("").chars().count() + 1;
    (line, col)
}

impl fmt::Display for MatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.rule.is_empty() {
            write!(f, "Error at offset {}: {}", self.pos, self.message)?;
        } else {
            write!(
                f,
                "Error in rule '{}' at offset {}: {}",
                self.rule, self.pos, self.message
            )?;
        }
        if let Some(cause) = &self.cause {
            write!(f, "; caused by: {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for MatchFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

pub type ParseResult<R> = Result<R, MatchFailure>;

pub trait Parser {
    type Result;

    /// parse consumes input from `st` and returns a result or a failure.
    /// A failing parser leaves the cursor where it found it; whatever it
    /// consumed before failing has been backtracked.
    fn parse(&self, st: &mut ParseState) -> ParseResult<Self::Result>;

    /// The name under which this parser appears in choice diagnostics.
    /// Named rules report their rule name; everything else is anonymous.
    fn label(&self) -> Option<&'static str> {
        None
    }

    /// apply transforms the result of this parser using a Transform
    /// combinator. Returning `Err` from the function fails the parse at
    /// the position where this parser started.
    fn apply<R2, F>(self, f: F) -> Transform<Self::Result, R2, Self, F>
    where
        Self: Sized,
        F: Fn(Self::Result) -> Result<R2, String>,
    {
        Transform::new(self, f)
    }

    /// map transforms the result of this parser with an infallible
    /// function.
    fn map<R2, F>(self, f: F) -> Map<Self::Result, R2, Self, F>
    where
        Self: Sized,
        F: Fn(Self::Result) -> R2,
    {
        Map::new(self, f)
    }
}

/// The driver. Holds a grammar's root rule; each `try_parse` call is an
/// independent session with a fresh cursor, memo table, and failure
/// record.
pub struct PegParser<T> {
    root: Rc<dyn Parser<Result = T>>,
    require_eoi: bool,
    recursion_limit: usize,
}

impl<T: 'static> PegParser<T> {
    pub fn new(root: impl Parser<Result = T> + 'static) -> PegParser<T> {
        PegParser {
            root: Rc::new(root),
            require_eoi: false,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// After a successful root parse, fail unless the whole input was
    /// consumed.
    pub fn require_end_of_input(mut self) -> PegParser<T> {
        self.require_eoi = true;
        self
    }

    /// Overrides the default bound on nested choice depth (1000).
    pub fn with_recursion_limit(mut self, limit: usize) -> PegParser<T> {
        self.recursion_limit = limit;
        self
    }

    /// Runs the grammar against `input`. On failure, the returned failure
    /// is the one that occurred furthest into the input during the whole
    /// attempt, which is not necessarily the one the root rule propagated.
    pub fn try_parse(&self, input: &str) -> Result<T, MatchFailure> {
        let mut st = ParseState::with_recursion_limit(input, self.recursion_limit);
        debug!("starting parse of {} bytes", input.len());
        let parsed = self.root.parse(&mut st).and_then(|value| {
            if self.require_eoi && !st.finished() {
                Err(st.failure("Expected end of input"))
            } else {
                Ok(value)
            }
        });
        match parsed {
            Ok(value) => Ok(value),
            Err(raised) => {
                let best = st.best_failure().unwrap_or(raised);
                debug!("parse failed: {}", best);
                Err(best)
            }
        }
    }
}
