//! Injected yes/no and pick-one decisions.
//!
//! Reconciliation and restore ask before doing anything destructive. The
//! terminal implementation lives in the CLI; tests and batch runs pass a
//! [`FixedDecider`] or their own implementation.

pub trait Decider {
    /// Answer a yes/no question.
    fn confirm(&mut self, prompt: &str) -> bool;

    /// Pick one of `options` by index, or `None` to skip.
    fn choose(&mut self, prompt: &str, options: &[String]) -> Option<usize>;
}

impl<D: Decider + ?Sized> Decider for &mut D {
    fn confirm(&mut self, prompt: &str) -> bool {
        (**self).confirm(prompt)
    }

    fn choose(&mut self, prompt: &str, options: &[String]) -> Option<usize> {
        (**self).choose(prompt, options)
    }
}

/// Gives the same answer to every confirmation and never picks among
/// several options.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecider {
    pub answer: bool,
}

impl FixedDecider {
    pub fn yes() -> Self {
        Self { answer: true }
    }

    pub fn no() -> Self {
        Self { answer: false }
    }
}

impl Decider for FixedDecider {
    fn confirm(&mut self, prompt: &str) -> bool {
        tracing::debug!(prompt, answer = self.answer, "auto-answered confirmation");
        self.answer
    }

    fn choose(&mut self, prompt: &str, _options: &[String]) -> Option<usize> {
        tracing::debug!(prompt, "ambiguous choice left unanswered");
        None
    }
}
