//! Status and message bars.

use std::time::Instant;

use core_state::{EditorState, Mode};

/// Status line content, padded or truncated to `width` columns.
pub fn status_line(state: &EditorState, width: usize) -> String {
    let name = state
        .buffer
        .file_name
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "[No Name]".to_string());
    let modified = if state.buffer.modified { " +" } else { "" };
    let cursors = if state.cursors.is_multi() {
        format!(" [{} cursors]", state.cursors.len())
    } else {
        String::new()
    };
    let left = format!("{name}{modified}{cursors}");
    let (row, col) = state.cursors.primary().pos();
    let right = format!(
        "Ln {}, Col {}  {} lines",
        row + 1,
        col + 1,
        state.buffer.line_count()
    );
    let used = left.chars().count() + right.chars().count();
    if used >= width {
        let mut s: String = left.chars().chain(right.chars()).take(width).collect();
        while s.chars().count() < width {
            s.push(' ');
        }
        s
    } else {
        let mut s = left;
        for _ in 0..width - used {
            s.push(' ');
        }
        s.push_str(&right);
        s
    }
}

/// Message line: an active prompt wins over the (5 s) status message.
pub fn message_line(state: &EditorState, now: Instant) -> String {
    match state.mode {
        Mode::Search => {
            let label = match (state.search.replace, state.search.forward) {
                (true, _) if state.search.replace_phase => "replace with",
                (true, _) => "replace",
                (false, true) => "search",
                (false, false) => "search (rev)",
            };
            format!("{label}: {}", state.prompt)
        }
        Mode::GotoLine => format!("goto line: {}", state.prompt),
        Mode::SaveAs => format!("save as: {}", state.prompt),
        _ => state
            .status
            .current(now)
            .map(|s| s.to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::Action;
    use core_text::Buffer;

    fn state(text: &str) -> EditorState {
        EditorState::new(Buffer::from_bytes(text.as_bytes()).expect("buffer"))
    }

    #[test]
    fn status_line_is_exactly_width() {
        let st = state("hello\nworld\n");
        let line = status_line(&st, 60);
        assert_eq!(line.chars().count(), 60);
        assert!(line.contains("[No Name]"));
        assert!(line.contains("Ln 1, Col 1"));
        assert!(line.contains("2 lines"));
    }

    #[test]
    fn modified_marker_appears_after_edit() {
        let mut st = state("x");
        st.insert_char('y').unwrap();
        assert!(status_line(&st, 40).contains('+'));
    }

    #[test]
    fn message_line_shows_prompt_and_expires_status() {
        let mut st = state("x");
        st.status.set("saved");
        assert_eq!(message_line(&st, Instant::now()), "saved");
        let later = Instant::now() + std::time::Duration::from_secs(6);
        assert_eq!(message_line(&st, later), "");
        st.apply_action(Action::GotoLinePrompt).unwrap();
        st.apply_action(Action::PromptChar('4')).unwrap();
        assert_eq!(message_line(&st, Instant::now()), "goto line: 4");
    }
}
