//! Theme: a style per token class plus the UI element styles.
//!
//! The loader lives outside the core; the engine ships one built-in dark
//! theme. `apply_contrast` runs at theme application and repairs every
//! foreground that falls below the WCAG minimum against its effective
//! background.

use core_text::Token;

use crate::style::{Attr, Rgb, Style, ensure_contrast};

#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Rgb,
    pub normal: Style,
    pub keyword: Style,
    pub ty: Style,
    pub string: Style,
    pub number: Style,
    pub comment: Style,
    pub preprocessor: Style,
    pub function: Style,
    pub operator: Style,
    pub bracket: Style,
    pub escape: Style,
    pub header: Style,
    pub bold: Style,
    pub italic: Style,
    pub bold_italic: Style,
    pub strikethrough: Style,
    pub code: Style,
    pub link_text: Style,
    pub link_url: Style,
    pub image: Style,
    pub blockquote: Style,
    pub list_marker: Style,
    pub rule: Style,
    pub table: Style,
    pub task_marker: Style,
    pub gutter: Style,
    pub gutter_active: Style,
    pub status_bar: Style,
    pub message_bar: Style,
    pub selection_bg: Rgb,
    pub search_bg: Rgb,
    pub search_current_bg: Rgb,
    pub cursor_line_bg: Rgb,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::dark()
    }
}

impl Theme {
    pub fn dark() -> Theme {
        let background = Rgb::new(0x1e, 0x1e, 0x2a);
        let fg = Rgb::new(0xd5, 0xd5, 0xe0);
        let mut theme = Theme {
            background,
            normal: Style::plain(fg),
            keyword: Style::with_attr(Rgb::new(0xc6, 0x78, 0xdd), Attr::BOLD),
            ty: Style::plain(Rgb::new(0xe5, 0xc0, 0x7b)),
            string: Style::plain(Rgb::new(0x98, 0xc3, 0x79)),
            number: Style::plain(Rgb::new(0xd1, 0x9a, 0x66)),
            comment: Style::with_attr(Rgb::new(0x5c, 0x63, 0x70), Attr::ITALIC),
            preprocessor: Style::plain(Rgb::new(0x56, 0xb6, 0xc2)),
            function: Style::plain(Rgb::new(0x61, 0xaf, 0xef)),
            operator: Style::plain(Rgb::new(0xab, 0xb2, 0xbf)),
            bracket: Style::plain(Rgb::new(0xab, 0xb2, 0xbf)),
            escape: Style::plain(Rgb::new(0x56, 0xb6, 0xc2)),
            header: Style::with_attr(Rgb::new(0x61, 0xaf, 0xef), Attr::BOLD),
            bold: Style::with_attr(fg, Attr::BOLD),
            italic: Style::with_attr(fg, Attr::ITALIC),
            bold_italic: Style::with_attr(fg, Attr::BOLD.union(Attr::ITALIC)),
            strikethrough: Style::with_attr(fg, Attr::STRIKE),
            code: Style::plain(Rgb::new(0x98, 0xc3, 0x79)),
            link_text: Style::with_attr(Rgb::new(0x61, 0xaf, 0xef), Attr::UNDERLINE),
            link_url: Style::with_attr(Rgb::new(0x5c, 0x63, 0x70), Attr::UNDERLINE),
            image: Style::plain(Rgb::new(0xc6, 0x78, 0xdd)),
            blockquote: Style::with_attr(Rgb::new(0x5c, 0x63, 0x70), Attr::ITALIC),
            list_marker: Style::plain(Rgb::new(0xe0, 0x6c, 0x75)),
            rule: Style::plain(Rgb::new(0x5c, 0x63, 0x70)),
            table: Style::plain(Rgb::new(0x56, 0xb6, 0xc2)),
            task_marker: Style::with_attr(Rgb::new(0xe0, 0x6c, 0x75), Attr::BOLD),
            gutter: Style::plain(Rgb::new(0x4b, 0x52, 0x63)),
            gutter_active: Style::with_attr(Rgb::new(0xd5, 0xd5, 0xe0), Attr::BOLD),
            status_bar: Style::with_attr(Rgb::new(0x1e, 0x1e, 0x2a), Attr::BOLD)
                .on(Rgb::new(0x98, 0xc3, 0x79)),
            message_bar: Style::plain(fg),
            selection_bg: Rgb::new(0x3e, 0x44, 0x52),
            search_bg: Rgb::new(0x61, 0x5b, 0x2a),
            search_current_bg: Rgb::new(0x8a, 0x7b, 0x1c),
            cursor_line_bg: Rgb::new(0x26, 0x26, 0x34),
        };
        theme.apply_contrast();
        theme
    }

    /// Style for one token class.
    pub fn style_for(&self, token: Token) -> Style {
        match token {
            Token::Normal => self.normal,
            Token::Keyword => self.keyword,
            Token::Type => self.ty,
            Token::Str => self.string,
            Token::Number => self.number,
            Token::Comment => self.comment,
            Token::Preprocessor => self.preprocessor,
            Token::Function => self.function,
            Token::Operator => self.operator,
            Token::Bracket => self.bracket,
            Token::Escape => self.escape,
            Token::Header1
            | Token::Header2
            | Token::Header3
            | Token::Header4
            | Token::Header5
            | Token::Header6 => self.header,
            Token::Bold => self.bold,
            Token::Italic => self.italic,
            Token::BoldItalic => self.bold_italic,
            Token::Strikethrough => self.strikethrough,
            Token::CodeSpan | Token::CodeBlock | Token::FenceOpen | Token::FenceClose => self.code,
            Token::LinkText => self.link_text,
            Token::LinkUrl => self.link_url,
            Token::Image => self.image,
            Token::Blockquote => self.blockquote,
            Token::ListMarker => self.list_marker,
            Token::HorizontalRule => self.rule,
            Token::Table | Token::TableSeparator | Token::TableHeader => self.table,
            Token::TaskMarker => self.task_marker,
        }
    }

    /// Repair every foreground below the WCAG minimum against its
    /// effective background.
    pub fn apply_contrast(&mut self) {
        let bg = self.background;
        let fix = |s: &mut Style, fallback_bg: Rgb| {
            s.fg = ensure_contrast(s.fg, s.bg.unwrap_or(fallback_bg));
        };
        fix(&mut self.normal, bg);
        fix(&mut self.keyword, bg);
        fix(&mut self.ty, bg);
        fix(&mut self.string, bg);
        fix(&mut self.number, bg);
        fix(&mut self.comment, bg);
        fix(&mut self.preprocessor, bg);
        fix(&mut self.function, bg);
        fix(&mut self.operator, bg);
        fix(&mut self.bracket, bg);
        fix(&mut self.escape, bg);
        fix(&mut self.header, bg);
        fix(&mut self.bold, bg);
        fix(&mut self.italic, bg);
        fix(&mut self.bold_italic, bg);
        fix(&mut self.strikethrough, bg);
        fix(&mut self.code, bg);
        fix(&mut self.link_text, bg);
        fix(&mut self.link_url, bg);
        fix(&mut self.image, bg);
        fix(&mut self.blockquote, bg);
        fix(&mut self.list_marker, bg);
        fix(&mut self.rule, bg);
        fix(&mut self.table, bg);
        fix(&mut self.task_marker, bg);
        fix(&mut self.gutter, bg);
        fix(&mut self.gutter_active, bg);
        fix(&mut self.status_bar, bg);
        fix(&mut self.message_bar, bg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{CONTRAST_MIN, contrast_ratio};

    #[test]
    fn default_theme_meets_contrast_floor() {
        let theme = Theme::dark();
        let bg = theme.background;
        for style in [
            theme.normal,
            theme.keyword,
            theme.comment,
            theme.gutter,
            theme.link_url,
        ] {
            let eff_bg = style.bg.unwrap_or(bg);
            assert!(
                contrast_ratio(style.fg, eff_bg) >= CONTRAST_MIN,
                "style {style:?} below contrast floor"
            );
        }
    }

    #[test]
    fn every_token_has_a_style() {
        let theme = Theme::dark();
        // Spot-check dispatch over the enum's families.
        assert_eq!(theme.style_for(Token::Keyword), theme.keyword);
        assert_eq!(theme.style_for(Token::Header4), theme.header);
        assert_eq!(theme.style_for(Token::FenceClose), theme.code);
        assert_eq!(theme.style_for(Token::TableSeparator), theme.table);
    }
}
