//! Role-tagged messages and the ordered conversation log.
//!
//! The log always starts with one system message. Its tail is in one of
//! two states: [`Tail::Clean`] (ends in system or assistant, ready for
//! input) or [`Tail::PendingUser`] (ends in a user turn awaiting a reply).

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        })
    }
}

/// A single turn. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// Shape of the conversation tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    /// Ends in a system or assistant message.
    Clean,
    /// Ends in a user message with no reply yet.
    PendingUser,
}

/// Ordered message log. Append-only apart from [`Conversation::pop_last`].
///
/// Stores state only; the session enforces alternation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a log with a single system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(content)],
        }
    }

    pub fn append_user(&mut self, content: impl Into<String>) {
        debug_assert_eq!(self.tail(), Tail::Clean, "user turn appended onto a pending user turn");
        self.messages.push(Message::user(content));
    }

    pub fn append_assistant(&mut self, message: Message) {
        debug_assert_eq!(message.role(), Role::Assistant);
        debug_assert_eq!(self.tail(), Tail::PendingUser, "assistant turn without a user turn");
        self.messages.push(message);
    }

    /// Remove and return the final message. The system message is never removed.
    pub fn pop_last(&mut self) -> Option<Message> {
        if self.messages.len() > 1 {
            self.messages.pop()
        } else {
            None
        }
    }

    pub fn last_role(&self) -> Role {
        self.messages.last().map_or(Role::System, Message::role)
    }

    pub fn tail(&self) -> Tail {
        match self.last_role() {
            Role::User => Tail::PendingUser,
            Role::System | Role::Assistant => Tail::Clean,
        }
    }

    /// Transition `PendingUser -> Clean` by dropping the trailing user turn.
    /// A clean log is left untouched.
    pub fn discard_pending(&mut self) -> Option<Message> {
        match self.tail() {
            Tail::PendingUser => self.pop_last(),
            Tail::Clean => None,
        }
    }

    /// Pop back to, and including, the most recent user turn.
    ///
    /// Returns `None` without mutating when the log holds no user turn.
    pub fn take_last_user(&mut self) -> Option<Message> {
        if !self.messages.iter().any(|m| m.role() == Role::User) {
            return None;
        }
        while self.last_role() != Role::User {
            self.pop_last();
        }
        self.pop_last()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
