//! Argument vectors for WP-CLI sub-commands and raw executables.

use std::ffi::OsString;
use std::fmt;

use shell_escape::unix::escape;

/// An argument vector passed to a process without shell interpretation.
///
/// For WP-CLI calls the vector holds the sub-command (`db export ...`); for
/// raw local calls its first element is the program itself.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandLine {
    parts: Vec<String>,
}

impl CommandLine {
    /// Builds a command line from its parts.
    #[must_use]
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.parts.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parts.extend(args.into_iter().map(Into::into));
        self
    }

    /// Returns the parts in order.
    #[must_use]
    pub const fn parts(&self) -> &[String] {
        self.parts.as_slice()
    }

    /// Returns `true` when no parts are present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub(crate) fn os_args(parts: &[String]) -> Vec<OsString> {
        parts.iter().map(OsString::from).collect()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in &self.parts {
            if first {
                first = false;
            } else {
                f.write_str(" ")?;
            }
            f.write_str(escape(part.as_str().into()).as_ref())?;
        }
        Ok(())
    }
}
