//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::rc::Rc;

use crate::runner::{CommandOutput, CommandRunner, RunnerError};

/// Records a single invocation made through a test runner.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

fn output(code: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> CommandOutput {
    CommandOutput {
        code,
        stdout: stdout.into(),
        stderr: stderr.into(),
    }
}

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes a successful exit status with empty output.
    pub fn push_success(&self) {
        self.responses.borrow_mut().push_back(output(Some(0), "", ""));
    }

    /// Pushes a successful exit status with the given stdout.
    pub fn push_stdout(&self, stdout: impl Into<String>) {
        self.responses
            .borrow_mut()
            .push_back(output(Some(0), stdout, ""));
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.responses
            .borrow_mut()
            .push_back(output(Some(code), "", "simulated failure"));
    }

    /// Pushes a response with no exit code to simulate abnormal termination.
    pub fn push_missing_exit_code(&self) {
        self.responses.borrow_mut().push_back(output(None, "", ""));
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| RunnerError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

#[derive(Clone, Debug)]
enum Response {
    Output(CommandOutput),
    SpawnFailure,
}

#[derive(Clone, Debug)]
struct Rule {
    needle: String,
    response: Response,
}

/// Command runner answering by substring match on the rendered command.
///
/// Rules are matched against [`CommandInvocation::command_string`], newest
/// first, so a test can override a rule its fixture registered. Commands
/// matching no rule succeed with empty output, which suits long pipelines
/// where only a few calls matter to a test.
#[derive(Clone, Debug, Default)]
pub struct RuleRunner {
    rules: Rc<RefCell<Vec<Rule>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

impl RuleRunner {
    /// Creates a runner with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push_rule(&self, needle: &str, response: Response) {
        self.rules.borrow_mut().push(Rule {
            needle: needle.to_owned(),
            response,
        });
    }

    /// Commands containing `needle` succeed and print `stdout`.
    pub fn respond(&self, needle: &str, stdout: impl Into<String>) {
        self.push_rule(needle, Response::Output(output(Some(0), stdout, "")));
    }

    /// Commands containing `needle` exit with `code` and print `stderr`.
    pub fn fail(&self, needle: &str, code: i32, stderr: impl Into<String>) {
        self.push_rule(needle, Response::Output(output(Some(code), "", stderr)));
    }

    /// Commands containing `needle` cannot be spawned.
    pub fn fail_to_spawn(&self, needle: &str) {
        self.push_rule(needle, Response::SpawnFailure);
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Rendered command strings in invocation order.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .map(CommandInvocation::command_string)
            .collect()
    }

    /// Number of invocations whose command string contains `needle`.
    #[must_use]
    pub fn count_matching(&self, needle: &str) -> usize {
        self.commands()
            .iter()
            .filter(|command| command.contains(needle))
            .count()
    }

    /// Index of the first invocation containing `needle`.
    #[must_use]
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.commands()
            .iter()
            .position(|command| command.contains(needle))
    }
}

impl CommandRunner for RuleRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError> {
        let invocation = CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        };
        let rendered = invocation.command_string();
        self.invocations.borrow_mut().push(invocation);

        let response = self
            .rules
            .borrow()
            .iter()
            .rev()
            .find(|rule| rendered.contains(&rule.needle))
            .map(|rule| rule.response.clone());

        match response {
            Some(Response::Output(scripted)) => Ok(scripted),
            Some(Response::SpawnFailure) => Err(RunnerError::Spawn {
                program: program.to_owned(),
                message: String::from("No such file or directory (os error 2)"),
            }),
            None => Ok(output(Some(0), "", "")),
        }
    }
}
