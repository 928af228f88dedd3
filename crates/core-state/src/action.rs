//! Key dispatch: key event -> action -> effect.
//!
//! The mode is a flat enum consulted before normal dispatch: prompts and
//! the leader menu consume keys first, and everything else falls through
//! to editing. Actions the state cannot resolve alone (quitting, launching
//! a worker search) surface as `Effect`s for the caller.

use core_text::{Result, WrapMode};

use crate::EditorState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Decoded key, already stripped of terminal escape plumbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Ctrl(char),
    Enter,
    Escape,
    Backspace,
    Delete,
    Tab,
    Arrow {
        dir: Direction,
        shift: bool,
        ctrl: bool,
        alt: bool,
    },
    Home { shift: bool },
    End { shift: bool },
    PageUp { shift: bool },
    PageDown { shift: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderMenu {
    Top,
    File,
    View,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Search,
    GotoLine,
    SaveAs,
    QuitConfirm,
    ReloadConfirm,
    Leader(LeaderMenu),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    InsertChar(char),
    InsertNewline,
    Backspace,
    DeleteForward,
    Move {
        dir: Direction,
        select: bool,
        word: bool,
    },
    Home { select: bool },
    End { select: bool },
    PageUp { select: bool },
    PageDown { select: bool },
    AddCursorAbove,
    AddCursorBelow,
    Cancel,
    Undo,
    Redo,
    Save,
    SaveAsPrompt,
    QuitRequest,
    ReloadPrompt,
    GotoLinePrompt,
    SearchStart { forward: bool, replace: bool },
    SearchNext,
    SearchPrev,
    LeaderEnter,
    LeaderKey(char),
    PromptChar(char),
    PromptBackspace,
    PromptSubmit,
    PromptCancel,
    ConfirmYes,
    ConfirmNo,
    CycleWrap,
    Unknown,
}

/// Outcome the caller must act on; everything else already happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    Quit,
    /// The search pattern changed; (re)submit the search task.
    SearchChanged,
    /// Replace-all was requested for the current pattern/replacement.
    ReplaceAll,
    /// The buffer was saved; the swap file can go.
    Saved,
}

/// Map a key to an action given the current mode.
pub fn action_for_key(mode: Mode, key: KeyInput) -> Action {
    match mode {
        Mode::Search => match key {
            KeyInput::Char(c) => Action::PromptChar(c),
            KeyInput::Backspace => Action::PromptBackspace,
            KeyInput::Enter => Action::PromptSubmit,
            KeyInput::Escape => Action::PromptCancel,
            KeyInput::Arrow {
                dir: Direction::Down | Direction::Right,
                ..
            } => Action::SearchNext,
            KeyInput::Arrow {
                dir: Direction::Up | Direction::Left,
                ..
            } => Action::SearchPrev,
            KeyInput::Tab => Action::PromptChar('\t'),
            _ => Action::None,
        },
        Mode::GotoLine | Mode::SaveAs => match key {
            KeyInput::Char(c) => Action::PromptChar(c),
            KeyInput::Backspace => Action::PromptBackspace,
            KeyInput::Enter => Action::PromptSubmit,
            KeyInput::Escape => Action::PromptCancel,
            _ => Action::None,
        },
        Mode::QuitConfirm | Mode::ReloadConfirm => match key {
            KeyInput::Char('y') | KeyInput::Char('Y') | KeyInput::Enter => Action::ConfirmYes,
            KeyInput::Char('n') | KeyInput::Char('N') | KeyInput::Escape => Action::ConfirmNo,
            _ => Action::None,
        },
        Mode::Leader(_) => match key {
            KeyInput::Escape => Action::PromptCancel,
            KeyInput::Char(c) => Action::LeaderKey(c),
            _ => Action::Unknown,
        },
        Mode::Normal => match key {
            KeyInput::Char(c) => Action::InsertChar(c),
            KeyInput::Tab => Action::InsertChar('\t'),
            KeyInput::Enter => Action::InsertNewline,
            KeyInput::Backspace => Action::Backspace,
            KeyInput::Delete => Action::DeleteForward,
            KeyInput::Escape => Action::Cancel,
            KeyInput::Arrow {
                dir: dir @ (Direction::Up | Direction::Down),
                alt: true,
                ..
            } => {
                if dir == Direction::Up {
                    Action::AddCursorAbove
                } else {
                    Action::AddCursorBelow
                }
            }
            KeyInput::Arrow {
                dir, shift, ctrl, ..
            } => Action::Move {
                dir,
                select: shift,
                word: ctrl,
            },
            KeyInput::Home { shift } => Action::Home { select: shift },
            KeyInput::End { shift } => Action::End { select: shift },
            KeyInput::PageUp { shift } => Action::PageUp { select: shift },
            KeyInput::PageDown { shift } => Action::PageDown { select: shift },
            KeyInput::Ctrl('s') => Action::Save,
            KeyInput::Ctrl('q') => Action::QuitRequest,
            KeyInput::Ctrl('f') => Action::SearchStart {
                forward: true,
                replace: false,
            },
            KeyInput::Ctrl('b') => Action::SearchStart {
                forward: false,
                replace: false,
            },
            KeyInput::Ctrl('h') => Action::SearchStart {
                forward: true,
                replace: true,
            },
            KeyInput::Ctrl('g') => Action::GotoLinePrompt,
            KeyInput::Ctrl('z') => Action::Undo,
            KeyInput::Ctrl('y') => Action::Redo,
            KeyInput::Ctrl('k') => Action::LeaderEnter,
            KeyInput::Ctrl(_) => Action::Unknown,
        },
    }
}

impl EditorState {
    /// Execute one action; unused transitions are no-ops.
    pub fn apply_action(&mut self, action: Action) -> Result<Effect> {
        match action {
            Action::None | Action::Unknown => Ok(Effect::None),
            Action::InsertChar(c) => {
                self.insert_char(c)?;
                Ok(Effect::None)
            }
            Action::InsertNewline => {
                self.insert_newline()?;
                Ok(Effect::None)
            }
            Action::Backspace => {
                self.backspace()?;
                Ok(Effect::None)
            }
            Action::DeleteForward => {
                self.delete_forward()?;
                Ok(Effect::None)
            }
            Action::Move { dir, select, word } => {
                self.move_cursors(dir, select, word);
                Ok(Effect::None)
            }
            Action::Home { select } => {
                self.move_home(select);
                Ok(Effect::None)
            }
            Action::End { select } => {
                self.move_end(select);
                Ok(Effect::None)
            }
            Action::PageUp { select } => {
                self.move_page(Direction::Up, select);
                Ok(Effect::None)
            }
            Action::PageDown { select } => {
                self.move_page(Direction::Down, select);
                Ok(Effect::None)
            }
            Action::AddCursorAbove => {
                self.add_cursor_above();
                Ok(Effect::None)
            }
            Action::AddCursorBelow => {
                self.add_cursor_below();
                Ok(Effect::None)
            }
            Action::Cancel => {
                self.cursors.collapse();
                self.cursors.primary_mut().clear_selection();
                Ok(Effect::None)
            }
            Action::Undo => {
                self.undo()?;
                Ok(Effect::None)
            }
            Action::Redo => {
                self.redo()?;
                Ok(Effect::None)
            }
            Action::Save => self.do_save(),
            Action::SaveAsPrompt => {
                self.mode = Mode::SaveAs;
                self.prompt.clear();
                Ok(Effect::None)
            }
            Action::QuitRequest => {
                if self.buffer.modified {
                    self.mode = Mode::QuitConfirm;
                    self.status.set("Unsaved changes. Quit anyway? (y/n)");
                    Ok(Effect::None)
                } else {
                    Ok(Effect::Quit)
                }
            }
            Action::ReloadPrompt => {
                self.mode = Mode::ReloadConfirm;
                self.status.set("Reload from disk? (y/n)");
                Ok(Effect::None)
            }
            Action::GotoLinePrompt => {
                self.mode = Mode::GotoLine;
                self.prompt.clear();
                Ok(Effect::None)
            }
            Action::SearchStart { forward, replace } => {
                self.mode = Mode::Search;
                self.prompt.clear();
                self.search.forward = forward;
                self.search.replace = replace;
                self.search.replace_phase = false;
                self.search.pattern.clear();
                self.search.replacement.clear();
                Ok(Effect::None)
            }
            Action::SearchNext => {
                self.goto_match(true);
                Ok(Effect::None)
            }
            Action::SearchPrev => {
                self.goto_match(false);
                Ok(Effect::None)
            }
            Action::LeaderEnter => {
                self.mode = Mode::Leader(LeaderMenu::Top);
                self.status.set("leader: [f]ile [v]iew [s]earch [q]uit");
                Ok(Effect::None)
            }
            Action::LeaderKey(c) => self.leader_key(c),
            Action::PromptChar(c) => self.prompt_char(c),
            Action::PromptBackspace => self.prompt_backspace(),
            Action::PromptSubmit => self.prompt_submit(),
            Action::PromptCancel => {
                self.mode = Mode::Normal;
                self.prompt.clear();
                Ok(Effect::None)
            }
            Action::ConfirmYes => match self.mode {
                Mode::QuitConfirm => Ok(Effect::Quit),
                Mode::ReloadConfirm => {
                    self.mode = Mode::Normal;
                    self.reload()?;
                    Ok(Effect::None)
                }
                _ => Ok(Effect::None),
            },
            Action::ConfirmNo => {
                self.mode = Mode::Normal;
                Ok(Effect::None)
            }
            Action::CycleWrap => {
                self.wrap_mode = match self.wrap_mode {
                    WrapMode::None => WrapMode::Word,
                    WrapMode::Word => WrapMode::Character,
                    WrapMode::Character => WrapMode::None,
                };
                for row in 0..self.buffer.line_count() {
                    if let Some(line) = self.buffer.line(row) {
                        line.invalidate_wrap();
                    }
                }
                self.status.set(format!("wrap: {:?}", self.wrap_mode));
                Ok(Effect::None)
            }
        }
    }

    fn do_save(&mut self) -> Result<Effect> {
        if self.buffer.file_name.is_none() {
            self.mode = Mode::SaveAs;
            self.prompt.clear();
            return Ok(Effect::None);
        }
        match self.buffer.save() {
            Ok(bytes) => {
                self.status.set(format!("Saved ({bytes} bytes)"));
                Ok(Effect::Saved)
            }
            Err(e) => {
                // The buffer stays modified; show the system error.
                self.status.set(format!("Save failed: {e}"));
                Ok(Effect::None)
            }
        }
    }

    fn leader_key(&mut self, c: char) -> Result<Effect> {
        let Mode::Leader(menu) = self.mode else {
            return Ok(Effect::None);
        };
        match (menu, c) {
            (LeaderMenu::Top, 'f') => {
                self.mode = Mode::Leader(LeaderMenu::File);
                self.status.set("file: [s]ave save-[a]s [r]eload");
                Ok(Effect::None)
            }
            (LeaderMenu::Top, 'v') => {
                self.mode = Mode::Leader(LeaderMenu::View);
                self.status.set("view: [w]rap");
                Ok(Effect::None)
            }
            (LeaderMenu::Top, 's') => {
                self.mode = Mode::Leader(LeaderMenu::Search);
                self.status.set("search: [f]orward [b]ackward [r]eplace");
                Ok(Effect::None)
            }
            (LeaderMenu::Top, 'q') => {
                self.mode = Mode::Normal;
                self.apply_action(Action::QuitRequest)
            }
            (LeaderMenu::File, 's') => {
                self.mode = Mode::Normal;
                self.do_save()
            }
            (LeaderMenu::File, 'a') => {
                self.mode = Mode::SaveAs;
                self.prompt.clear();
                Ok(Effect::None)
            }
            (LeaderMenu::File, 'r') => {
                self.mode = Mode::ReloadConfirm;
                self.status.set("Reload from disk? (y/n)");
                Ok(Effect::None)
            }
            (LeaderMenu::View, 'w') => {
                self.mode = Mode::Normal;
                self.apply_action(Action::CycleWrap)
            }
            (LeaderMenu::Search, 'f') => {
                self.mode = Mode::Normal;
                self.apply_action(Action::SearchStart {
                    forward: true,
                    replace: false,
                })
            }
            (LeaderMenu::Search, 'b') => {
                self.mode = Mode::Normal;
                self.apply_action(Action::SearchStart {
                    forward: false,
                    replace: false,
                })
            }
            (LeaderMenu::Search, 'r') => {
                self.mode = Mode::Normal;
                self.apply_action(Action::SearchStart {
                    forward: true,
                    replace: true,
                })
            }
            _ => {
                // Unknown key: report and stay in leader mode.
                self.status.set(format!("leader: unknown key '{c}'"));
                Ok(Effect::None)
            }
        }
    }

    fn prompt_char(&mut self, c: char) -> Result<Effect> {
        self.prompt.push(c);
        if self.mode == Mode::Search && !self.search.replace_phase {
            self.search.pattern = self.prompt.clone();
            return Ok(Effect::SearchChanged);
        }
        Ok(Effect::None)
    }

    fn prompt_backspace(&mut self) -> Result<Effect> {
        self.prompt.pop();
        if self.mode == Mode::Search && !self.search.replace_phase {
            self.search.pattern = self.prompt.clone();
            return Ok(Effect::SearchChanged);
        }
        Ok(Effect::None)
    }

    fn prompt_submit(&mut self) -> Result<Effect> {
        match self.mode {
            Mode::GotoLine => {
                self.mode = Mode::Normal;
                match self.prompt.trim().parse::<usize>() {
                    Ok(n) if n >= 1 => {
                        let row = (n - 1).min(self.buffer.line_count().saturating_sub(1));
                        self.cursors.collapse();
                        let c = self.cursors.primary_mut();
                        c.move_to(row, 0);
                        c.clear_selection();
                        c.goal_col = 0;
                    }
                    _ => self.status.set("Not a line number"),
                }
                self.prompt.clear();
                Ok(Effect::None)
            }
            Mode::SaveAs => {
                let path = self.prompt.trim().to_string();
                self.mode = Mode::Normal;
                self.prompt.clear();
                if path.is_empty() {
                    return Ok(Effect::None);
                }
                match self.buffer.save_as(&path) {
                    Ok(bytes) => {
                        self.status.set(format!("Saved {path} ({bytes} bytes)"));
                        Ok(Effect::Saved)
                    }
                    Err(e) => {
                        self.status.set(format!("Save failed: {e}"));
                        Ok(Effect::None)
                    }
                }
            }
            Mode::Search => {
                // In a replace flow the first submit captures the pattern
                // and the second the replacement.
                if self.search.replace && !self.search.replace_phase {
                    self.search.replace_phase = true;
                    self.prompt.clear();
                    self.status.set("replace with:");
                    return Ok(Effect::None);
                }
                if self.search.replace {
                    self.search.replacement = self.prompt.clone();
                    self.mode = Mode::Normal;
                    self.prompt.clear();
                    return Ok(Effect::ReplaceAll);
                }
                self.mode = Mode::Normal;
                self.prompt.clear();
                self.goto_match(self.search.forward);
                Ok(Effect::None)
            }
            _ => Ok(Effect::None),
        }
    }
}
