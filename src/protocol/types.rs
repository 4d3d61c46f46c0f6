//! Payload and message types shared by the stream and the request builder

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of payload announced by a tag in the response stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    /// Plain response text; routed to whatever channel is on top
    Response,
    /// Display-only text; treated like `Response`
    Text,
    /// Base64 audio of the assistant speaking
    Voice,
    Search,
    Browse,
    /// Script that runs only when risk is pre-accepted
    Python,
    /// Script preceded by a risk rating and review, may need user approval
    PythonWithEvaluation,
    /// Package install arguments
    Pip,
    /// Renderable card streamed straight to the UI
    Card,
    /// Open a file or an application
    Open,
    /// Reminders subcommand
    Reminders,
    /// Media playback; no client-side handler
    Play,
    /// Calendar command; no client-side handler
    Calendar,
    /// Email command; no client-side handler
    Email,
    /// Bare close of the top channel. Also what an empty record decodes to.
    Pop,
    /// Explicit unknown tag, or any character outside the alphabet
    Unknown(char),
    /// No further payload this round; listen for the user afterwards
    FollowUp,
    /// End of the assistant's turn
    End,
}

impl PayloadType {
    /// Decode a tag character. Never fails: characters outside the alphabet
    /// map to [`PayloadType::Unknown`].
    pub fn from_tag(tag: char) -> Self {
        match tag {
            'R' => Self::Response,
            'T' => Self::Text,
            'V' => Self::Voice,
            'S' => Self::Search,
            'B' => Self::Browse,
            'P' => Self::Python,
            'E' => Self::PythonWithEvaluation,
            'p' => Self::Pip,
            'C' => Self::Card,
            'O' => Self::Open,
            'r' => Self::Reminders,
            'Y' => Self::Play,
            'c' => Self::Calendar,
            'e' => Self::Email,
            ' ' => Self::Pop,
            'x' => Self::FollowUp,
            'X' => Self::End,
            other => Self::Unknown(other),
        }
    }

    pub fn tag(self) -> char {
        match self {
            Self::Response => 'R',
            Self::Text => 'T',
            Self::Voice => 'V',
            Self::Search => 'S',
            Self::Browse => 'B',
            Self::Python => 'P',
            Self::PythonWithEvaluation => 'E',
            Self::Pip => 'p',
            Self::Card => 'C',
            Self::Open => 'O',
            Self::Reminders => 'r',
            Self::Play => 'Y',
            Self::Calendar => 'c',
            Self::Email => 'e',
            Self::Pop => ' ',
            Self::Unknown(c) => c,
            Self::FollowUp => 'x',
            Self::End => 'X',
        }
    }

    /// Voice payloads are asides: they never close the channel beneath them.
    pub fn is_aside(self) -> bool {
        matches!(self, Self::Voice)
    }

    /// The command this tag opens a channel for, if any.
    ///
    /// Text-class tags, follow-up and end signals open no channel, and
    /// neither do the tags this client has no handler for.
    pub fn command(self) -> Option<CommandKind> {
        match self {
            Self::Voice => Some(CommandKind::Voice),
            Self::Search => Some(CommandKind::Search),
            Self::Browse => Some(CommandKind::Browse),
            Self::Python => Some(CommandKind::Python),
            Self::PythonWithEvaluation => Some(CommandKind::PythonWithEvaluation),
            Self::Pip => Some(CommandKind::Pip),
            Self::Card => Some(CommandKind::Card),
            Self::Open => Some(CommandKind::Open),
            Self::Reminders => Some(CommandKind::Reminders),
            Self::Unknown(_) => Some(CommandKind::Unknown),
            Self::Response
            | Self::Text
            | Self::Play
            | Self::Calendar
            | Self::Email
            | Self::Pop
            | Self::FollowUp
            | Self::End => None,
        }
    }
}

/// Payload types that own a command channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Voice,
    Search,
    Browse,
    Python,
    PythonWithEvaluation,
    Pip,
    Card,
    Open,
    Reminders,
    Unknown,
}

impl CommandKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Voice => "voice",
            Self::Search => "search",
            Self::Browse => "browse",
            Self::Python => "python",
            Self::PythonWithEvaluation => "python_with_evaluation",
            Self::Pip => "pip",
            Self::Card => "card",
            Self::Open => "open",
            Self::Reminders => "reminders",
            Self::Unknown => "unknown",
        }
    }
}

/// Unit of information sent to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

impl RequestPayload {
    pub fn new(kind: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            kind: kind.into(),
            data: data.into(),
        }
    }

    /// The payload that opens a turn with the user's utterance
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new("response", Value::String(text.into()))
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Entry in the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
