use crate::application::errors::CommandError;
use crate::domain::entities::{Command, CommandRegistry, Content, Message};

/// Service for managing and executing commands
pub struct CommandService {
    registry: CommandRegistry,
    prefix: String,
}

impl CommandService {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            registry: CommandRegistry::new(),
            prefix: prefix.into(),
        }
    }

    pub fn register(&mut self, command: Command) {
        self.registry.register(command);
    }

    pub fn register_defaults(&mut self) {
        // Help command
        self.register(
            Command::new("help")
                .with_description("Show help message")
                .with_usage("/help")
                .with_handler(|_| {
                    Ok("Available commands:\n/help - Show this message\n/version - Show version"
                        .to_string())
                }),
        );

        // Version command
        self.register(
            Command::new("version")
                .with_description("Show bot version")
                .with_handler(|_| Ok(format!("fortune-bot v{}", env!("CARGO_PKG_VERSION")))),
        );
    }

    /// Dispatch a command message to its handler. Non-command messages and
    /// messages with no matching handler are not an error for the host loop.
    pub fn handle(&self, message: &Message) -> Result<Option<String>, CommandError> {
        let Content::Command { name, args: _ } = &message.content else {
            return Ok(None);
        };

        // Find command (without prefix)
        let cmd = self
            .registry
            .find(name)
            .ok_or_else(|| CommandError::NotFound(name.clone()))?;

        // Execute handler
        if let Some(handler) = &cmd.handler {
            Ok(Some(handler(message.clone())?))
        } else {
            Ok(Some(format!("Command {} not implemented", cmd.name)))
        }
    }

    pub fn get_help(&self, command: Option<&str>) -> String {
        if let Some(name) = command {
            if let Some(cmd) = self.registry.get(name) {
                let mut help = format!(
                    "/{} - {}",
                    cmd.name,
                    cmd.description.as_deref().unwrap_or("No description")
                );
                if let Some(usage) = &cmd.usage {
                    help.push_str(&format!("\nUsage: {}", usage));
                }
                return help;
            }
            return format!("Command /{} not found", name);
        }

        // List all commands
        let mut help = "Available commands:\n".to_string();
        for cmd in self.registry.all() {
            help.push_str(&format!(
                "  /{} - {}\n",
                cmd.name,
                cmd.description.as_deref().unwrap_or("")
            ));
        }
        help
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_registered_command() {
        let mut commands = CommandService::new("/");
        commands.register(
            Command::new("fortune")
                .with_description("Draw today's fortune")
                .with_handler(|msg| Ok(format!("drawn for {}", msg.chat_id))),
        );

        let msg = Message::from_command("u1", "fortune", vec![]);
        let reply = commands.handle(&msg).expect("handler ran");
        assert_eq!(reply.as_deref(), Some("drawn for u1"));
    }

    #[test]
    fn unknown_command_is_an_error() {
        let commands = CommandService::new("/");
        let msg = Message::from_command("u1", "tarot", vec![]);
        assert!(matches!(
            commands.handle(&msg),
            Err(CommandError::NotFound(_))
        ));
    }

    #[test]
    fn plain_text_yields_no_reply() {
        let commands = CommandService::new("/");
        let msg = Message::from_text("u1", "hello");
        assert!(commands.handle(&msg).expect("no error").is_none());
    }
}
