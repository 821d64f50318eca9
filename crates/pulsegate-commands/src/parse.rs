/// A recognised in-band command (spec §4.9), parsed case-insensitively
/// before routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    New,
    Model(String),
    ModelFavs,
    Context,
    Compact(Option<String>),
    Status,
}

pub fn parse(text: &str) -> Option<Command> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let name = parts.next()?.to_lowercase();
    let rest = parts.next().map(str::trim).filter(|s| !s.is_empty());

    match name.as_str() {
        "/help" | "/start" => Some(Command::Help),
        "/new" => Some(Command::New),
        "/model" => rest.map(|s| Command::Model(s.to_string())),
        "/modelfavs" => Some(Command::ModelFavs),
        "/context" => Some(Command::Context),
        "/compact" => Some(Command::Compact(rest.map(str::to_string))),
        "/status" => Some(Command::Status),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands_case_insensitively() {
        assert_eq!(parse("/HELP"), Some(Command::Help));
        assert_eq!(parse("/Start"), Some(Command::Help));
        assert_eq!(parse("/new"), Some(Command::New));
        assert_eq!(parse("/status"), Some(Command::Status));
    }

    #[test]
    fn model_requires_an_argument() {
        assert_eq!(parse("/model"), None);
        assert_eq!(parse("/model   "), None);
        assert_eq!(parse("/model gpt-5"), Some(Command::Model("gpt-5".to_string())));
    }

    #[test]
    fn compact_argument_is_optional() {
        assert_eq!(parse("/compact"), Some(Command::Compact(None)));
        assert_eq!(parse("/compact keep recent tool calls"), Some(Command::Compact(Some("keep recent tool calls".to_string()))));
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse("hello there"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn unknown_slash_word_is_not_a_command() {
        assert_eq!(parse("/banana"), None);
    }
}
