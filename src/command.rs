//! Out-of-band command handling.
//!
//! The command channel carries plain strings. Two are recognized: `exit`
//! requests a cooperative shutdown and `help` writes usage text to the log.
//! Anything else is ignored. The dispatcher never touches attachment or
//! channel state, so it can run alongside in-flight batches.

use tracing::{debug, info};

use crate::shutdown::ShutdownSignal;

/// A parsed control message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stop serving requests
    Exit,
    /// Print usage text
    Help,
    /// Anything else
    Unknown(String),
}

impl Command {
    /// Parse a control string, ignoring surrounding whitespace.
    pub fn parse(message: &str) -> Self {
        match message.trim() {
            "exit" => Self::Exit,
            "help" => Self::Help,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// What the dispatcher did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Shutdown was triggered
    Shutdown,
    /// Usage text was emitted
    Help,
    /// Message ignored
    Ignored,
}

/// Handles one control message per call.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    namespace: String,
    shutdown: ShutdownSignal,
}

impl CommandDispatcher {
    /// Create a dispatcher that triggers `shutdown` on `exit`.
    pub fn new(namespace: impl Into<String>, shutdown: ShutdownSignal) -> Self {
        Self {
            namespace: namespace.into(),
            shutdown,
        }
    }

    /// Handle one control message.
    pub fn handle(&self, message: &str) -> CommandOutcome {
        if self.shutdown.is_triggered() {
            debug!(namespace = %self.namespace, message, "Ignoring command during shutdown");
            return CommandOutcome::Ignored;
        }

        match Command::parse(message) {
            Command::Exit => {
                self.shutdown.trigger("exit command");
                CommandOutcome::Shutdown
            }
            Command::Help => {
                self.emit_help();
                CommandOutcome::Help
            }
            Command::Unknown(other) => {
                debug!(namespace = %self.namespace, command = %other, "Ignoring unknown command");
                CommandOutcome::Ignored
            }
        }
    }

    fn emit_help(&self) {
        for line in help_text(&self.namespace) {
            info!("{}", line);
        }
    }
}

/// Usage text for the gateway.
pub fn help_text(namespace: &str) -> Vec<String> {
    let ns = namespace.trim_end_matches('/');
    vec![
        format!("{ns}: InterfaceKit analog and digital I/O gateway"),
        "  read_analog(channels)          analog inputs as volts".to_string(),
        "  read_digital(channels)         digital input states".to_string(),
        "  write_digital(channels, values) drive digital outputs pairwise".to_string(),
        format!("{ns} commands:"),
        "  help    print this text".to_string(),
        "  exit    stop serving requests".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn dispatcher() -> (CommandDispatcher, ShutdownSignal) {
        let shutdown = ShutdownSignal::new();
        (CommandDispatcher::new("/ifkit", shutdown.clone()), shutdown)
    }

    #[test]
    fn test_parse() {
        assert_eq!(Command::parse("exit"), Command::Exit);
        assert_eq!(Command::parse("  help\n"), Command::Help);
        assert_eq!(Command::parse("EXIT"), Command::Unknown("EXIT".to_string()));
    }

    #[test]
    fn test_exit_triggers_shutdown() {
        let (dispatcher, shutdown) = dispatcher();
        assert_eq!(dispatcher.handle("exit"), CommandOutcome::Shutdown);
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_commands_ignored_after_exit() {
        let (dispatcher, _shutdown) = dispatcher();
        dispatcher.handle("exit");
        assert_eq!(dispatcher.handle("help"), CommandOutcome::Ignored);
        assert_eq!(dispatcher.handle("exit"), CommandOutcome::Ignored);
    }

    #[test]
    fn test_unknown_is_ignored() {
        let (dispatcher, shutdown) = dispatcher();
        assert_eq!(dispatcher.handle("reboot"), CommandOutcome::Ignored);
        assert_eq!(dispatcher.handle(""), CommandOutcome::Ignored);
        assert!(!shutdown.is_triggered());
    }

    #[test]
    #[traced_test]
    fn test_help_logs_usage() {
        let (dispatcher, shutdown) = dispatcher();
        assert_eq!(dispatcher.handle("help"), CommandOutcome::Help);
        assert!(!shutdown.is_triggered());
        assert!(logs_contain("/ifkit commands:"));
        assert!(logs_contain("write_digital"));
    }
}
