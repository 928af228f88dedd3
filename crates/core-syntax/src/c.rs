//! C/C++ highlight pass: linear left-to-right over one line.
//!
//! The pass resets every cell to the normal token, asks the pair layer
//! whether the line starts inside a block comment, and then walks the cells
//! once. Strings and character literals never span lines here; block
//! comments do, via the initial containment query.

use core_text::{Buffer, Result, Token};

use crate::pairs;

const KEYWORDS: &[&str] = &[
    "auto",
    "break",
    "case",
    "catch",
    "class",
    "const",
    "constexpr",
    "continue",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "extern",
    "for",
    "goto",
    "if",
    "inline",
    "namespace",
    "new",
    "noexcept",
    "operator",
    "private",
    "protected",
    "public",
    "register",
    "restrict",
    "return",
    "sizeof",
    "static",
    "struct",
    "switch",
    "template",
    "this",
    "throw",
    "try",
    "typedef",
    "typename",
    "union",
    "using",
    "virtual",
    "volatile",
    "while",
    "_Alignas",
    "_Alignof",
    "_Atomic",
    "_Generic",
    "_Noreturn",
    "_Static_assert",
    "_Thread_local",
];

const TYPES: &[&str] = &[
    "bool",
    "char",
    "double",
    "float",
    "int",
    "long",
    "short",
    "signed",
    "unsigned",
    "void",
    "wchar_t",
    "size_t",
    "ssize_t",
    "ptrdiff_t",
    "intptr_t",
    "uintptr_t",
    "int8_t",
    "int16_t",
    "int32_t",
    "int64_t",
    "uint8_t",
    "uint16_t",
    "uint32_t",
    "uint64_t",
    "FILE",
    "va_list",
    "_Bool",
];

fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphabetic()
}

fn is_ident(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphanumeric()
}

fn is_number_part(ch: char) -> bool {
    ch.is_ascii_hexdigit() || matches!(ch, '.' | 'x' | 'X' | 'u' | 'U' | 'l' | 'L')
}

/// Highlight one line of C. Warms the line; writes only syntax tags.
pub fn highlight_line(buf: &Buffer, row: usize) -> Result<()> {
    buf.warm_line(row)?;
    let starts_in_comment = pairs::in_block_comment(buf, row, 0)?;
    let Some(line) = buf.line(row) else {
        return Ok(());
    };
    let mut cells = line.cells_mut()?;
    for cell in cells.iter_mut() {
        cell.syntax = Token::Normal;
        cell.flags = core_text::CellFlags::empty();
    }
    let len = cells.len();
    let mut in_comment = starts_in_comment;
    let mut in_string = false;
    let mut in_char = false;
    let mut i = 0usize;
    while i < len {
        let ch = cells[i].ch;
        let next = cells.get(i + 1).map(|c| c.ch);
        if in_comment {
            cells[i].syntax = Token::Comment;
            if ch == '*' && next == Some('/') {
                cells[i + 1].syntax = Token::Comment;
                in_comment = false;
                i += 2;
                continue;
            }
            i += 1;
            continue;
        }
        if in_string || in_char {
            if ch == '\\' && i + 1 < len {
                cells[i].syntax = Token::Escape;
                cells[i + 1].syntax = Token::Escape;
                i += 2;
                continue;
            }
            cells[i].syntax = Token::Str;
            if (in_string && ch == '"') || (in_char && ch == '\'') {
                in_string = false;
                in_char = false;
            }
            i += 1;
            continue;
        }
        if ch == '/' && next == Some('/') {
            for cell in cells[i..].iter_mut() {
                cell.syntax = Token::Comment;
            }
            break;
        }
        if ch == '/' && next == Some('*') {
            cells[i].syntax = Token::Comment;
            cells[i + 1].syntax = Token::Comment;
            in_comment = true;
            i += 2;
            continue;
        }
        if ch == '"' {
            cells[i].syntax = Token::Str;
            in_string = true;
            i += 1;
            continue;
        }
        if ch == '\'' {
            cells[i].syntax = Token::Str;
            in_char = true;
            i += 1;
            continue;
        }
        if ch == '#' && cells[..i].iter().all(|c| matches!(c.ch, ' ' | '\t')) {
            for cell in cells[i..].iter_mut() {
                cell.syntax = Token::Preprocessor;
            }
            break;
        }
        if ch.is_ascii_digit() || (ch == '.' && next.is_some_and(|c| c.is_ascii_digit())) {
            while i < len && is_number_part(cells[i].ch) {
                cells[i].syntax = Token::Number;
                i += 1;
            }
            continue;
        }
        if is_ident_start(ch) {
            let start = i;
            while i < len && is_ident(cells[i].ch) {
                i += 1;
            }
            let word: String = cells[start..i].iter().map(|c| c.ch).collect();
            let token = if KEYWORDS.contains(&word.as_str()) {
                Token::Keyword
            } else if TYPES.contains(&word.as_str()) {
                Token::Type
            } else {
                // A call site: the next non-blank cell is an open paren.
                let mut j = i;
                while j < len && matches!(cells[j].ch, ' ' | '\t') {
                    j += 1;
                }
                if j < len && cells[j].ch == '(' {
                    Token::Function
                } else {
                    Token::Normal
                }
            };
            for cell in cells[start..i].iter_mut() {
                cell.syntax = token;
            }
            continue;
        }
        if matches!(ch, '(' | ')' | '[' | ']' | '{' | '}') {
            cells[i].syntax = Token::Bracket;
            i += 1;
            continue;
        }
        if ch.is_ascii_punctuation() {
            cells[i].syntax = Token::Operator;
            i += 1;
            continue;
        }
        i += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::{Buffer, Token};

    fn highlighted(text: &str) -> Buffer {
        let mut buf = Buffer::from_bytes(text.as_bytes()).expect("buffer");
        crate::pairs::recompute(&mut buf).expect("pairs");
        for row in 0..buf.line_count() {
            highlight_line(&buf, row).expect("highlight");
        }
        buf
    }

    fn tokens(buf: &Buffer, row: usize) -> Vec<Token> {
        buf.line(row)
            .unwrap()
            .cells()
            .unwrap()
            .iter()
            .map(|c| c.syntax)
            .collect()
    }

    #[test]
    fn types_and_functions() {
        let buf = highlighted("int main(void) {\n\treturn 0;\n}\n");
        let t = tokens(&buf, 0);
        assert!(t[0..3].iter().all(|&t| t == Token::Type));
        assert!(t[4..8].iter().all(|&t| t == Token::Function));
        assert_eq!(t[8], Token::Bracket);
        assert!(t[9..13].iter().all(|&t| t == Token::Type)); // void
        assert_eq!(t[15], Token::Bracket); // {
        let t1 = tokens(&buf, 1);
        assert!(t1[1..7].iter().all(|&t| t == Token::Keyword)); // return
        assert_eq!(t1[8], Token::Number);
        let t2 = tokens(&buf, 2);
        assert_eq!(t2[0], Token::Bracket);
    }

    #[test]
    fn block_comment_spans_lines() {
        let buf = highlighted("/* a\nb */");
        assert!(tokens(&buf, 0).iter().all(|&t| t == Token::Comment));
        assert!(tokens(&buf, 1).iter().all(|&t| t == Token::Comment));
    }

    #[test]
    fn line_comment_paints_to_end() {
        let buf = highlighted("x = 1; // note");
        let t = tokens(&buf, 0);
        assert_eq!(t[0], Token::Normal);
        assert_eq!(t[2], Token::Operator);
        assert!(t[7..].iter().all(|&t| t == Token::Comment));
    }

    #[test]
    fn string_with_escape() {
        let buf = highlighted(r#"s = "a\nb";"#);
        let t = tokens(&buf, 0);
        assert_eq!(t[4], Token::Str); // opening quote
        assert_eq!(t[5], Token::Str);
        assert_eq!(t[6], Token::Escape);
        assert_eq!(t[7], Token::Escape);
        assert_eq!(t[8], Token::Str);
        assert_eq!(t[9], Token::Str); // closing quote
        assert_eq!(t[10], Token::Operator);
    }

    #[test]
    fn preprocessor_line() {
        let buf = highlighted("#include <stdio.h>");
        assert!(tokens(&buf, 0).iter().all(|&t| t == Token::Preprocessor));
        let buf = highlighted("  #define X 1");
        assert!(tokens(&buf, 0)[2..].iter().all(|&t| t == Token::Preprocessor));
    }

    #[test]
    fn number_literals() {
        let buf = highlighted("a = 0xFFul + 3.14;");
        let t = tokens(&buf, 0);
        assert!(t[4..10].iter().all(|&t| t == Token::Number));
        assert!(t[13..17].iter().all(|&t| t == Token::Number));
    }

    #[test]
    fn keywords_classified_by_exact_compare() {
        let buf = highlighted("iffy while");
        let t = tokens(&buf, 0);
        assert_eq!(t[0], Token::Normal); // "iffy" is not "if"
        assert!(t[5..].iter().all(|&t| t == Token::Keyword));
    }
}
