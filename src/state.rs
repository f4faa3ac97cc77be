use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::memo::MemoEntry;
use crate::parser::MatchFailure;

/// Default bound on nested choice depth before a parse attempt is aborted.
pub const DEFAULT_RECURSION_LIMIT: usize = 1000;

/// ParseState encapsulates one parse session: the input, the cursor, the
/// stack of rule names currently being parsed, the memo table, and the
/// record of every failure raised so far (ranked by how far into the input
/// it occurred).
///
/// A fresh `ParseState` is created for every `try_parse` call, so memo
/// entries and recorded failures never leak between sessions.
pub struct ParseState<'a> {
    input: &'a str,
    pos: usize,
    rules: Vec<&'static str>,
    memo: HashMap<(&'static str, usize), MemoEntry>,
    failures: BinaryHeap<Reverse<RankedFailure>>,
    failure_seq: u64,
    depth: usize,
    recursion_limit: usize,
}

/// A captured cursor position. Consume it with exactly one `reset` (to
/// backtrack) or `release` (to commit).
pub struct Hold(usize);

/// Heap entry ordering: rank first (deepest wins), creation order on ties
/// so the report is deterministic.
struct RankedFailure {
    failure: MatchFailure,
    seq: u64,
}

impl PartialEq for RankedFailure {
    fn eq(&self, other: &RankedFailure) -> bool {
        self.failure.rank == other.failure.rank && self.seq == other.seq
    }
}

impl Eq for RankedFailure {}

impl PartialOrd for RankedFailure {
    fn partial_cmp(&self, other: &RankedFailure) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankedFailure {
    fn cmp(&self, other: &RankedFailure) -> std::cmp::Ordering {
        self.failure
            .rank
            .cmp(&other.failure.rank)
            .then(self.seq.cmp(&other.seq))
    }
}

impl<'a> ParseState<'a> {
    pub fn new(input: &'a str) -> ParseState<'a> {
        ParseState::with_recursion_limit(input, DEFAULT_RECURSION_LIMIT)
    }

    pub fn with_recursion_limit(input: &'a str, limit: usize) -> ParseState<'a> {
        ParseState {
            input,
            pos: 0,
            rules: vec![],
            memo: HashMap::new(),
            failures: BinaryHeap::new(),
            failure_seq: 0,
            depth: 0,
            recursion_limit: limit,
        }
    }

    pub fn index(&self) -> usize {
        self.pos
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    /// The unconsumed suffix starting at the cursor.
    pub fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub fn finished(&self) -> bool {
        self.pos == self.input.len()
    }

    pub fn hold(&mut self) -> Hold {
        Hold(self.pos)
    }

    pub fn reset(&mut self, h: Hold) {
        self.pos = h.0;
    }

    pub fn release(&mut self, _h: Hold) {}

    /// Moves the cursor forward by `n` bytes. `n` must end on a character
    /// boundary; the primitives guarantee this by construction.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(self.input.is_char_boundary(self.pos + n));
        self.pos += n;
    }

    pub(crate) fn jump(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub(crate) fn enter_rule(&mut self, name: &'static str) {
        self.rules.push(name);
    }

    pub(crate) fn leave_rule(&mut self) {
        self.rules.pop();
    }

    pub(crate) fn current_rule(&self) -> &'static str {
        self.rules.last().copied().unwrap_or("")
    }

    /// Creates a failure at the current position, attributed to the
    /// innermost rule, and records it for the final report.
    pub fn failure<S: Into<String>>(&mut self, message: S) -> MatchFailure {
        self.failure_impl(message.into(), None)
    }

    /// Like `failure`, with the failure that triggered this one chained as
    /// its cause. The new failure inherits the cause's rank when the cause
    /// reached deeper into the input.
    pub fn failure_with_cause<S: Into<String>>(
        &mut self,
        message: S,
        cause: MatchFailure,
    ) -> MatchFailure {
        self.failure_impl(message.into(), Some(cause))
    }

    fn failure_impl(&mut self, message: String, cause: Option<MatchFailure>) -> MatchFailure {
        let failure = MatchFailure::new(self.current_rule(), self.pos, message, cause);
        self.failures.push(Reverse(RankedFailure {
            failure: failure.clone(),
            seq: self.failure_seq,
        }));
        self.failure_seq += 1;
        failure
    }

    /// The best-ranked failure recorded so far: the one that occurred
    /// furthest into the input.
    pub(crate) fn best_failure(&self) -> Option<MatchFailure> {
        self.failures
            .peek()
            .map(|Reverse(ranked)| ranked.failure.clone())
    }

    pub(crate) fn memo_lookup(&self, rule: &'static str, pos: usize) -> Option<MemoEntry> {
        self.memo.get(&(rule, pos)).cloned()
    }

    pub(crate) fn memo_insert(&mut self, rule: &'static str, pos: usize, entry: MemoEntry) {
        self.memo.insert((rule, pos), entry);
    }

    pub(crate) fn descend(&mut self) -> Result<(), MatchFailure> {
        if self.depth == self.recursion_limit {
            return Err(self.failure(
                "Recursion limit exceeded; a recursive rule may need memo or memo_left",
            ));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn ascend(&mut self) {
        self.depth -= 1;
    }
}
