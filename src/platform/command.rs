//! Application command descriptors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Option type codes of the application command API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OptionType {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
}

impl OptionType {
    pub fn is_sub_command(self) -> bool {
        matches!(self, Self::SubCommand | Self::SubCommandGroup)
    }

    /// Lowercase name used in admin API payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SubCommand => "sub_command",
            Self::SubCommandGroup => "sub_command_group",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::User => "user",
            Self::Channel => "channel",
            Self::Role => "role",
            Self::Mentionable => "mentionable",
            Self::Number => "number",
            Self::Attachment => "attachment",
        }
    }
}

impl From<OptionType> for u8 {
    fn from(kind: OptionType) -> Self {
        match kind {
            OptionType::SubCommand => 1,
            OptionType::SubCommandGroup => 2,
            OptionType::String => 3,
            OptionType::Integer => 4,
            OptionType::Boolean => 5,
            OptionType::User => 6,
            OptionType::Channel => 7,
            OptionType::Role => 8,
            OptionType::Mentionable => 9,
            OptionType::Number => 10,
            OptionType::Attachment => 11,
        }
    }
}

impl TryFrom<u8> for OptionType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => Self::SubCommand,
            2 => Self::SubCommandGroup,
            3 => Self::String,
            4 => Self::Integer,
            5 => Self::Boolean,
            6 => Self::User,
            7 => Self::Channel,
            8 => Self::Role,
            9 => Self::Mentionable,
            10 => Self::Number,
            11 => Self::Attachment,
            other => return Err(format!("unknown option type {other}")),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    #[serde(rename = "type")]
    pub kind: OptionType,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

impl CommandOption {
    pub fn new(kind: OptionType, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            required: false,
            choices: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn sub_command(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionType::SubCommand, name, description)
    }

    pub fn group(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionType::SubCommandGroup, name, description)
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn choice(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.choices.push(Choice {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }
}

/// A slash command as known to the platform.
///
/// `id` is assigned by the platform and absent on local descriptors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

impl ApplicationCommand {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }
}

/// Whether two descriptors describe the same command.
///
/// Platform-assigned fields are ignored.
pub fn same_descriptor(local: &ApplicationCommand, remote: &ApplicationCommand) -> bool {
    local.name == remote.name
        && local.description == remote.description
        && local.options == remote.options
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remote_descriptor_equals_local() {
        let local = ApplicationCommand::new("ping", "Ping the bot").option(
            CommandOption::new(OptionType::String, "target", "Who")
                .choice("me", "me")
                .required(),
        );

        let remote: ApplicationCommand = serde_json::from_value(json!({
            "id": "123",
            "application_id": "9",
            "version": "1",
            "name": "ping",
            "description": "Ping the bot",
            "options": [{
                "type": 3, "name": "target", "description": "Who", "required": true,
                "choices": [{"name": "me", "value": "me"}]
            }]
        }))
        .unwrap();

        assert!(same_descriptor(&local, &remote));

        let changed = ApplicationCommand::new("ping", "Ping the bot");
        assert!(!same_descriptor(&changed, &remote));
    }

    #[test]
    fn test_missing_options_equal_empty() {
        let remote: ApplicationCommand =
            serde_json::from_value(json!({"id": "1", "name": "pong", "description": "d"})).unwrap();
        assert!(same_descriptor(&ApplicationCommand::new("pong", "d"), &remote));
    }

    #[test]
    fn test_option_type_codes() {
        assert_eq!(serde_json::to_value(OptionType::SubCommandGroup).unwrap(), json!(2));
        assert!(serde_json::from_value::<OptionType>(json!(42)).is_err());
    }
}
