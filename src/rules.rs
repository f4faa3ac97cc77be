use std::cell::RefCell;
use std::rc::Rc;

use crate::parser::{ParseResult, Parser};
use crate::state::ParseState;

/// A named grammar rule.
///
/// The name is bound together with the body and is pushed onto the parse
/// state for the duration of every invocation, so failures raised inside
/// the body are attributed to this rule. The body lives in a shared slot
/// that may be filled after handles have been cloned into other rule
/// bodies, which is how forward references and recursion (including
/// mutual recursion) are expressed:
///
/// ```
/// use rpeg::{sequence, string, ParseResult, ParseState, Parser, Rule};
///
/// let word: Rule<String> = Rule::new("word");
/// let greeting = Rule::define("greeting", {
///     let word = word.clone(); // forward reference, bound below
///     let blank = string(" ");
///     sequence(move |st: &mut ParseState| -> ParseResult<String> {
///         let hello = word.parse(st)?;
///         blank.parse(st)?;
///         let name = word.parse(st)?;
///         Ok(format!("{}-{}", hello, name))
///     })
/// });
/// word.bind(rpeg::regex("[a-z]+"));
///
/// let mut st = ParseState::new("hi you");
/// assert_eq!(Ok("hi-you".to_string()), greeting.parse(&mut st));
/// ```
///
/// Rule names must be unique within a grammar; this is not checked.
pub struct Rule<T> {
    name: &'static str,
    slot: Rc<RefCell<Option<Rc<dyn Parser<Result = T>>>>>,
}

impl<T> Clone for Rule<T> {
    fn clone(&self) -> Rule<T> {
        Rule {
            name: self.name,
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: 'static> Rule<T> {
    /// Declares a rule whose body will be bound later.
    pub fn new(name: &'static str) -> Rule<T> {
        Rule {
            name,
            slot: Rc::new(RefCell::new(None)),
        }
    }

    /// Declares and binds in one step, for rules nothing refers to before
    /// this point.
    pub fn define(name: &'static str, body: impl Parser<Result = T> + 'static) -> Rule<T> {
        let rule = Rule::new(name);
        rule.bind(body);
        rule
    }

    /// Binds the rule body. Binding again replaces the body.
    pub fn bind(&self, body: impl Parser<Result = T> + 'static) {
        *self.slot.borrow_mut() = Some(Rc::new(body));
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: 'static> Parser for Rule<T> {
    type Result = T;

    fn label(&self) -> Option<&'static str> {
        Some(self.name)
    }

    fn parse(&self, st: &mut ParseState) -> ParseResult<T> {
        let body = self.slot.borrow().clone();
        let body =
            body.unwrap_or_else(|| panic!("rule '{}' was invoked before being bound", self.name));
        st.enter_rule(self.name);
        let result = body.parse(st);
        st.leave_rule();
        result
    }
}
