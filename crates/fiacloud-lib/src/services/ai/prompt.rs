// Prompt construction for chat and file edits

use crate::models::MessageRole;

use super::openai::ChatMessage;

pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful AI coding assistant.";

pub const EDIT_SYSTEM_PROMPT: &str = "You are a code editor. Apply the user's instruction \
to the file and call the update_file tool with the complete updated file content. Do not \
include markdown code blocks or explanations unless strictly necessary for the file format.";

/// Chat system prompt with the context files appended
pub fn chat_system_prompt(context_files: &[(String, String)]) -> String {
    let mut prompt = CHAT_SYSTEM_PROMPT.to_string();
    if !context_files.is_empty() {
        prompt.push_str("\n\nHere are the files in the current context:\n");
        for (name, content) in context_files {
            prompt.push_str(&format!(
                "\n--- File: {} ---\n{}\n--- End of File ---\n",
                name, content
            ));
        }
    }
    prompt
}

/// Messages for a whole-file edit request
pub fn edit_messages(instruction: &str, file_name: &str, content: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::new(MessageRole::System, EDIT_SYSTEM_PROMPT),
        ChatMessage::new(
            MessageRole::User,
            format!(
                "User Instruction: {}\n\nFile: {}\n\nCurrent File Content:\n{}",
                instruction, file_name, content
            ),
        ),
    ]
}

/// Drop a markdown fence wrapping the entire text
///
/// Only the first and last lines are removed, so fenced blocks inside the
/// file survive.
pub fn strip_code_fence(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.len() < 6 || !trimmed.starts_with("```") || !trimmed.ends_with("```") {
        return content.to_string();
    }
    let lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() < 2 {
        return content.to_string();
    }
    let mut body = lines[1..lines.len() - 1].join("\n");
    if content.ends_with('\n') && !body.is_empty() {
        body.push('\n');
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_prompt_without_context() {
        assert_eq!(chat_system_prompt(&[]), CHAT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_chat_prompt_lists_context_files() {
        let prompt = chat_system_prompt(&[("a.md".to_string(), "# A".to_string())]);
        assert!(prompt.starts_with(CHAT_SYSTEM_PROMPT));
        assert!(prompt.contains("--- File: a.md ---\n# A\n--- End of File ---"));
    }

    #[test]
    fn test_edit_messages() {
        let messages = edit_messages("fix typo", "notes.txt", "helo");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[1].content.contains("User Instruction: fix typo"));
        assert!(messages[1].content.ends_with("Current File Content:\nhelo"));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```rust\nfn a() {}\n```"), "fn a() {}");
        assert_eq!(strip_code_fence("```\nx\n```\n"), "x\n");
        assert_eq!(strip_code_fence("plain\n"), "plain\n");
        assert_eq!(strip_code_fence("```"), "```");

        let inner = "intro\n```\ncode\n```";
        assert_eq!(strip_code_fence(inner), inner);
    }
}
