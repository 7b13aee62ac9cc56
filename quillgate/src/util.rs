//! Small convenience constructors for common types.

use crate::{FileRef, Message, Role, SessionId, TurnOptions};

pub fn user_message(text: impl Into<String>) -> Message {
    Message::new(Role::User, text)
}

pub fn assistant_message(text: impl Into<String>) -> Message {
    Message::new(Role::Assistant, text)
}

pub fn session(id: impl Into<SessionId>) -> SessionId {
    id.into()
}

pub fn attachment(
    name: impl Into<String>,
    handle: impl Into<String>,
    mime_type: impl Into<String>,
) -> FileRef {
    FileRef::resolved(name, handle, mime_type)
}

pub fn instructed_turn(instruction: impl Into<String>) -> TurnOptions {
    TurnOptions::default().with_system_instruction(instruction)
}

#[cfg(test)]
mod tests {
    use crate::Role;

    use super::{attachment, instructed_turn, session, user_message};

    #[test]
    fn message_and_session_helpers_apply_expected_defaults() {
        let message = user_message("hello");
        assert_eq!(message.role, Role::User);

        let session = session("thread-1");
        assert_eq!(session.as_str(), "thread-1");
    }

    #[test]
    fn attachment_helper_produces_a_resolved_reference() {
        let file = attachment("brief.pdf", "files/abc", "application/pdf");
        assert_eq!(file.handle.as_deref(), Some("files/abc"));
    }

    #[test]
    fn instructed_turn_sets_the_system_instruction() {
        let options = instructed_turn("be concise");
        assert_eq!(options.system_instruction.as_deref(), Some("be concise"));
    }
}
