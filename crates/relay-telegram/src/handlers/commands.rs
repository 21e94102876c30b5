use relay_core::messaging::types::CommandKind;

/// Recognise `/start` and `/help`, including the `/cmd@botname args` form
/// Telegram sends in groups. Anything else is not a command.
pub(crate) fn parse_command(text: &str) -> Option<CommandKind> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?.split('@').next().unwrap_or("");
    CommandKind::from_name(name)
}
