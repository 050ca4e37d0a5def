//! Inbound events, tagged with the user they belong to.

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// `/start` or `/restart`.
    Start,
    /// `/help`.
    Help,
    /// `/cancel` or `/stop`.
    Cancel,
    /// Any other text message.
    Text(String),
    /// Inline button press, carrying its callback id.
    Button(String),
}

impl Input {
    /// Classify a text message: known commands become their own variants,
    /// everything else stays text. A `@botname` suffix on a command is
    /// accepted, as group chats send it.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        let Some(command) = trimmed.strip_prefix('/') else {
            return Self::Text(text.to_string());
        };
        let command = command.split_whitespace().next().unwrap_or_default();
        let command = command.split('@').next().unwrap_or_default();
        match command.to_lowercase().as_str() {
            "start" | "restart" => Self::Start,
            "help" => Self::Help,
            "cancel" | "stop" => Self::Cancel,
            _ => Self::Text(text.to_string()),
        }
    }

    /// Short kind name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Cancel => "cancel",
            Self::Text(_) => "text",
            Self::Button(_) => "button",
        }
    }
}

/// An input from a specific user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub user_id: String,
    pub input: Input,
}

impl Event {
    pub fn new(user_id: impl Into<String>, input: Input) -> Self {
        Self {
            user_id: user_id.into(),
            input,
        }
    }

    pub fn text(user_id: impl Into<String>, text: &str) -> Self {
        Self::new(user_id, Input::from_text(text))
    }

    pub fn button(user_id: impl Into<String>, callback_id: impl Into<String>) -> Self {
        Self::new(user_id, Input::Button(callback_id.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_recognized() {
        assert_eq!(Input::from_text("/start"), Input::Start);
        assert_eq!(Input::from_text("/restart"), Input::Start);
        assert_eq!(Input::from_text(" /help "), Input::Help);
        assert_eq!(Input::from_text("/cancel"), Input::Cancel);
        assert_eq!(Input::from_text("/stop"), Input::Cancel);
        assert_eq!(Input::from_text("/START@trip_bot"), Input::Start);
    }

    #[test]
    fn other_text_is_kept_verbatim() {
        assert_eq!(
            Input::from_text("Москва, Казань, 2025-07-01 - 2025-07-05, 2"),
            Input::Text("Москва, Казань, 2025-07-01 - 2025-07-05, 2".into())
        );
        assert_eq!(Input::from_text("/unknown"), Input::Text("/unknown".into()));
        assert_eq!(Input::from_text(""), Input::Text(String::new()));
    }

    #[test]
    fn event_constructors() {
        let e = Event::text("7", "/help");
        assert_eq!(e.user_id, "7");
        assert_eq!(e.input, Input::Help);
        assert_eq!(Event::button("7", "summary").input.kind(), "button");
    }
}
