//! Plans built from validated model replies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::Message;

/// Invoke a registered action with decoded parameters.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct DoCommand {
    /// Name of the action to run.
    pub action: String,
    /// Parameters decoded at the validator boundary.
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Identifier of the native action call this command came from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
}

impl DoCommand {
    /// Creates a DO command.
    #[must_use]
    pub fn new(action: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            action: action.into(),
            parameters,
            action_id: None,
        }
    }

    /// Records the originating action call identifier.
    #[must_use]
    pub fn with_action_id(mut self, id: impl Into<String>) -> Self {
        self.action_id = Some(id.into());
        self
    }
}

/// Emit a message to the user.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SayCommand {
    /// Message handed to the output channel.
    pub response: Message,
}

/// One step of a [`Plan`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum Command {
    /// Invoke an action.
    #[serde(rename = "DO")]
    Do(DoCommand),
    /// Say something.
    #[serde(rename = "SAY")]
    Say(SayCommand),
}

impl Command {
    /// Returns the dispatch label of the command: the action name for DO, `SAY` otherwise.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Do(command) => &command.action,
            Self::Say(_) => "SAY",
        }
    }
}

impl From<DoCommand> for Command {
    fn from(value: DoCommand) -> Self {
        Self::Do(value)
    }
}

impl From<SayCommand> for Command {
    fn from(value: SayCommand) -> Self {
        Self::Say(value)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
enum PlanTag {
    #[default]
    #[serde(rename = "plan")]
    Plan,
}

/// Ordered, immutable list of commands extracted from one model reply.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Plan {
    #[serde(rename = "type", default)]
    tag: PlanTag,
    commands: Vec<Command>,
}

impl Plan {
    /// Creates a plan preserving the supplied command order.
    #[must_use]
    pub fn new(commands: Vec<Command>) -> Self {
        Self {
            tag: PlanTag::Plan,
            commands,
        }
    }

    /// Creates a plan with a single SAY command.
    #[must_use]
    pub fn say(message: Message) -> Self {
        Self::new(vec![Command::Say(SayCommand { response: message })])
    }

    /// Returns the commands in execution order.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Returns the number of commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` when the plan has nothing to execute.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
