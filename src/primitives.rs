use regex::Regex;

use crate::parser::{ParseResult, Parser};
use crate::state::ParseState;

/// Matches a single literal character.
pub struct CharParser(char);

impl CharParser {
    pub fn new(c: char) -> CharParser {
        CharParser(c)
    }
}

impl Parser for CharParser {
    type Result = char;
    fn parse(&self, st: &mut ParseState) -> ParseResult<char> {
        match st.remaining().chars().next() {
            Some(c) if c == self.0 => {
                st.advance(c.len_utf8());
                Ok(c)
            }
            _ => Err(st.failure(format!("Expected '{}'", self.0))),
        }
    }
}

/// Matches a literal string.
pub struct StringParser(String);

impl StringParser {
    pub fn new<S: AsRef<str>>(s: S) -> StringParser {
        StringParser(s.as_ref().to_owned())
    }
}

impl Parser for StringParser {
    type Result = String;
    fn parse(&self, st: &mut ParseState) -> ParseResult<String> {
        if st.remaining().starts_with(self.0.as_str()) {
            st.advance(self.0.len());
            Ok(self.0.clone())
        } else {
            Err(st.failure(format!("Expected \"{}\"", self.0)))
        }
    }
}

/// Matches a regular expression anchored at the cursor. The pattern is
/// compiled once, wrapped in `\A(?:...)`, so a match must begin exactly at
/// the current position; the cursor is never scanned forward.
pub struct RegexParser {
    pattern: String,
    re: Regex,
}

impl RegexParser {
    pub fn new(pattern: &str) -> Result<RegexParser, regex::Error> {
        let re = Regex::new(&format!(r"\A(?:{})", pattern))?;
        Ok(RegexParser {
            pattern: pattern.to_owned(),
            re,
        })
    }
}

impl Parser for RegexParser {
    type Result = String;
    fn parse(&self, st: &mut ParseState) -> ParseResult<String> {
        match self.re.find(st.remaining()) {
            Some(m) => {
                let text = m.as_str().to_owned();
                st.advance(m.end());
                Ok(text)
            }
            None => Err(st.failure(format!("Expected /{}/", self.pattern))),
        }
    }
}

/// Succeeds only when the whole input has been consumed.
pub struct EndOfInput;

impl Parser for EndOfInput {
    type Result = ();
    fn parse(&self, st: &mut ParseState) -> ParseResult<()> {
        if st.finished() {
            Ok(())
        } else {
            Err(st.failure("Expected end of input"))
        }
    }
}

pub fn character(c: char) -> CharParser {
    CharParser::new(c)
}

pub fn string<S: AsRef<str>>(s: S) -> StringParser {
    StringParser::new(s)
}

/// Builds an anchored regex matcher.
///
/// Panics if `pattern` is not a valid regular expression; use
/// `RegexParser::new` to handle the error instead.
pub fn regex(pattern: &str) -> RegexParser {
    RegexParser::new(pattern)
        .unwrap_or_else(|e| panic!("invalid regex {:?}: {}", pattern, e))
}

pub fn end_of_input() -> EndOfInput {
    EndOfInput
}

/// Skips any amount of whitespace. Always succeeds, possibly matching
/// nothing, so it must not be the body of a repetition by itself.
pub fn whitespace() -> RegexParser {
    regex(r"\s*")
}
