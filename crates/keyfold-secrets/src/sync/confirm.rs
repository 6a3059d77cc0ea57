//! Interactive overwrite confirmation with sticky yes-to-all / no-to-all

use crate::error::SecretError;

use super::Scope;

const RETRY_PROMPT: &str = "Please enter y(es), n(o), ya (yes to all), or na (no to all): ";

/// Source of interactive answers
pub trait Prompter {
    /// Show `prompt` and read one line. `Ok(None)` means no more input is available.
    fn ask(&mut self, prompt: &str) -> Result<Option<String>, SecretError>;
}

/// A normalized answer to an overwrite prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Yes,
    No,
    YesToAll,
    NoToAll,
}

impl Response {
    /// Parse user input, case-insensitively and ignoring surrounding whitespace
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => Some(Self::Yes),
            "n" | "no" => Some(Self::No),
            "ya" | "yes-to-all" => Some(Self::YesToAll),
            "na" | "no-to-all" => Some(Self::NoToAll),
            _ => None,
        }
    }
}

/// Decision state for one sync run. Once a blanket answer is given it never resets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfirmationState {
    #[default]
    Undecided,
    AllYes,
    AllNo,
}

impl ConfirmationState {
    /// Whether to overwrite `key` in `scope`, prompting only while undecided.
    ///
    /// Unrecognized answers are asked again. End of input, or a prompter that fails,
    /// declines this key only.
    pub fn decide<P: Prompter + ?Sized>(
        &mut self,
        key: &str,
        scope: Scope,
        prompter: &mut P,
    ) -> bool {
        match self {
            Self::AllYes => return true,
            Self::AllNo => return false,
            Self::Undecided => {}
        }

        let mut prompt = format!(
            "Secret '{}' already exists in {}. Overwrite? [y/n/ya/na]: ",
            key, scope
        );
        loop {
            let line = match prompter.ask(&prompt) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::warn!(key, %scope, "Operation cancelled");
                    return false;
                }
                Err(e) => {
                    tracing::warn!(key, %scope, error = %e, "Operation cancelled");
                    return false;
                }
            };

            match Response::parse(&line) {
                Some(response) => return self.apply(response),
                None => prompt = RETRY_PROMPT.to_string(),
            }
        }
    }

    /// Apply an answer and return whether it approves. Blanket states ignore the answer.
    pub fn apply(&mut self, response: Response) -> bool {
        match self {
            Self::AllYes => return true,
            Self::AllNo => return false,
            Self::Undecided => {}
        }

        match response {
            Response::Yes => true,
            Response::No => false,
            Response::YesToAll => {
                tracing::debug!("User selected 'yes to all' - will overwrite all remaining secrets");
                *self = Self::AllYes;
                true
            }
            Response::NoToAll => {
                tracing::debug!("User selected 'no to all' - will skip all remaining secrets");
                *self = Self::AllNo;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted {
        answers: VecDeque<&'static str>,
        prompts: Vec<String>,
    }

    impl Scripted {
        fn new(answers: &[&'static str]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                prompts: Vec::new(),
            }
        }
    }

    impl Prompter for Scripted {
        fn ask(&mut self, prompt: &str) -> Result<Option<String>, SecretError> {
            self.prompts.push(prompt.to_string());
            Ok(self.answers.pop_front().map(str::to_string))
        }
    }

    #[test]
    fn test_parse_responses() {
        assert_eq!(Response::parse("Y"), Some(Response::Yes));
        assert_eq!(Response::parse(" yes \n"), Some(Response::Yes));
        assert_eq!(Response::parse("no"), Some(Response::No));
        assert_eq!(Response::parse("YA"), Some(Response::YesToAll));
        assert_eq!(Response::parse("no-to-all"), Some(Response::NoToAll));
        assert_eq!(Response::parse("sure"), None);
        assert_eq!(Response::parse(""), None);
    }

    #[test]
    fn test_single_answers_do_not_transition() {
        let mut state = ConfirmationState::default();
        let mut prompter = Scripted::new(&["y", "n"]);

        assert!(state.decide("A", Scope::Repository, &mut prompter));
        assert!(!state.decide("B", Scope::Repository, &mut prompter));
        assert_eq!(state, ConfirmationState::Undecided);
        assert_eq!(prompter.prompts.len(), 2);
    }

    #[test]
    fn test_yes_to_all_is_sticky() {
        let mut state = ConfirmationState::default();
        let mut prompter = Scripted::new(&["ya"]);

        for key in ["A", "B", "C"] {
            assert!(state.decide(key, Scope::Dependabot, &mut prompter));
        }
        assert_eq!(state, ConfirmationState::AllYes);
        assert_eq!(prompter.prompts.len(), 1);
        assert!(prompter.prompts[0].contains("'A' already exists in Dependabot"));
    }

    #[test]
    fn test_no_to_all_is_sticky() {
        let mut state = ConfirmationState::default();
        let mut prompter = Scripted::new(&["na", "y"]);

        assert!(!state.decide("A", Scope::Repository, &mut prompter));
        assert!(!state.decide("B", Scope::Repository, &mut prompter));
        assert_eq!(state, ConfirmationState::AllNo);
        assert_eq!(prompter.prompts.len(), 1);
        assert!(!state.apply(Response::YesToAll));
        assert_eq!(state, ConfirmationState::AllNo);
    }

    #[test]
    fn test_invalid_answer_reprompts() {
        let mut state = ConfirmationState::default();
        let mut prompter = Scripted::new(&["what", "y"]);

        assert!(state.decide("A", Scope::Repository, &mut prompter));
        assert_eq!(prompter.prompts.len(), 2);
        assert_eq!(prompter.prompts[1], RETRY_PROMPT);
    }

    #[test]
    fn test_end_of_input_declines_without_transition() {
        let mut state = ConfirmationState::default();
        let mut prompter = Scripted::new(&[]);

        assert!(!state.decide("A", Scope::Repository, &mut prompter));
        assert_eq!(state, ConfirmationState::Undecided);

        let mut prompter = Scripted::new(&["y"]);
        assert!(state.decide("B", Scope::Repository, &mut prompter));
    }

    #[test]
    fn test_prompter_failure_declines_without_transition() {
        struct Broken;
        impl Prompter for Broken {
            fn ask(&mut self, _prompt: &str) -> Result<Option<String>, SecretError> {
                Err(SecretError::Prompt("terminal gone".to_string()))
            }
        }

        let mut state = ConfirmationState::default();
        assert!(!state.decide("A", Scope::Repository, &mut Broken));
        assert_eq!(state, ConfirmationState::Undecided);
    }
}
