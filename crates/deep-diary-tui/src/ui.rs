use deep_diary_core::image::RgbImage;
use deep_diary_core::ChatRole;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use crate::app::{wrapped_height, App, InputMode, TextInput};

const NOTICE_BADGE: &str = " ! ";

/// Parse a line of text and convert **bold** markdown and `###` headings to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let trimmed = text.trim_start();
    if let Some(heading) = trimmed
        .strip_prefix("### ")
        .or_else(|| trimmed.strip_prefix("## "))
        .or_else(|| trimmed.strip_prefix("# "))
    {
        let mut line = parse_inline(heading);
        for span in line.spans.iter_mut() {
            span.style = span.style.add_modifier(Modifier::BOLD).fg(Color::Magenta);
        }
        return line;
    }
    parse_inline(text)
}

fn parse_inline(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Render a thumbnail with upper-half blocks: one cell holds two pixel rows.
fn photo_lines(thumb: &RgbImage, max_cols: u16, max_rows: u16) -> Vec<Line<'static>> {
    let (w, h) = thumb.dimensions();
    if w == 0 || h == 0 || max_cols == 0 || max_rows == 0 {
        return Vec::new();
    }

    let scale = (w as f32 / max_cols as f32)
        .max(h as f32 / (max_rows as f32 * 2.0))
        .max(1.0);
    let out_w = ((w as f32 / scale) as u32).max(1);
    let out_h = ((h as f32 / scale) as u32).max(1);

    let pixel = |x: u32, y: u32| {
        let src_x = ((x as f32 * scale) as u32).min(w - 1);
        let src_y = ((y as f32 * scale) as u32).min(h - 1);
        let [r, g, b] = thumb.get_pixel(src_x, src_y).0;
        Color::Rgb(r, g, b)
    };

    (0..out_h)
        .step_by(2)
        .map(|y| {
            let spans: Vec<Span<'static>> = (0..out_w)
                .map(|x| {
                    let mut style = Style::default().fg(pixel(x, y));
                    if y + 1 < out_h {
                        style = style.bg(pixel(x, y + 1));
                    }
                    Span::styled("▀", style)
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let notice_rows = app
        .notice
        .as_ref()
        .map_or(0, |n| notice_height(n.as_str(), area.width, area.height / 3));

    // Main layout: header, body, notice, footer
    let [header_area, body_area, notice_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(notice_rows),
        Constraint::Length(1),
    ])
    .areas(area);

    let [main_area, sidebar_area] =
        Layout::horizontal([Constraint::Percentage(68), Constraint::Percentage(32)])
            .areas(body_area);

    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(main_area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_answer_input(app, frame, input_area);
    render_sidebar(app, frame, sidebar_area);
    render_notice(app, frame, notice_area);
    render_footer(app, frame, footer_area);

    if app.input_mode == InputMode::PhotoPath {
        render_photo_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Deep Diary ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("→ {}", app.client.base_url()),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let border_color = if app.input_mode == InputMode::Normal {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" 오늘의 일기 ({}) ", app.session.log().len()));

    let spinning = app.pending.as_ref().is_some_and(|p| p.shows_spinner());

    let text = if app.session.log().is_empty() && !spinning {
        Text::from(vec![
            Line::from(Span::styled(
                "Press 'p' to upload today's photo, then 's' to start the diary.",
                Style::default().fg(Color::DarkGray),
            )),
        ])
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.session.log() {
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.content.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "Diary:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.content.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }
            }
            lines.push(Line::default());
        }

        if spinning {
            lines.push(Line::from(Span::styled(
                "Diary:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("트로트 추천을 불러오는 중{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

/// Visible slice of a text input plus the cursor column inside it.
///
/// Offsets are in terminal columns, so wide characters move the cursor by two.
fn visible_input(input: &TextInput, inner_width: usize) -> (String, u16) {
    let chars: Vec<char> = input.value.chars().collect();
    let cursor = input.cursor.min(chars.len());
    let width_before_cursor =
        |from: usize| -> usize { chars[from..cursor].iter().map(|c| c.width().unwrap_or(0)).sum() };

    // Scroll until the text before the cursor and the cursor cell itself fit
    let mut scroll_offset = 0;
    while scroll_offset < cursor && width_before_cursor(scroll_offset) + 1 > inner_width {
        scroll_offset += 1;
    }

    let mut visible_text = String::new();
    let mut used = 0;
    for &c in &chars[scroll_offset..] {
        let w = c.width().unwrap_or(0);
        if used + w > inner_width {
            break;
        }
        used += w;
        visible_text.push(c);
    }

    (visible_text, width_before_cursor(scroll_offset) as u16)
}

fn render_answer_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" 답변을 입력해보세요 (i) ");

    let (visible_text, cursor_x) =
        visible_input(&app.answer_input, area.width.saturating_sub(2) as usize);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    let [menu_area, photo_area] =
        Layout::vertical([Constraint::Length(7), Constraint::Min(0)]).areas(area);

    let busy = app.is_busy();
    let key_style = Style::default().fg(Color::Yellow).bold();
    let label_style = if busy {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    let item = |key: &'static str, label: &'static str| {
        Line::from(vec![
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(label, label_style),
        ])
    };

    let menu = Paragraph::new(vec![
        item("p", "오늘의 사진 업로드"),
        item("s", "일기 쓰기 시작"),
        item("f", "일기 마무리하기"),
        item("r", "오늘의 트로트 추천받기"),
        if busy {
            Line::from(Span::styled(
                " …",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ))
        } else {
            Line::default()
        },
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta))
            .title(" 메뉴 "),
    );
    frame.render_widget(menu, menu_area);

    let photo_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" 사진 ");
    let inner = photo_block.inner(photo_area);
    frame.render_widget(photo_block, photo_area);

    let Some(photo) = app.session.photo() else {
        let empty = Paragraph::new("No photo yet")
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true });
        frame.render_widget(empty, inner);
        return;
    };

    let [caption_area, image_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(inner);

    let caption = Paragraph::new(Line::from(vec![
        Span::raw(photo.file_name.clone()),
        Span::styled(
            format!(" {}×{}", photo.width, photo.height),
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    frame.render_widget(caption, caption_area);

    let lines = photo_lines(&photo.thumbnail, image_area.width, image_area.height);
    frame.render_widget(Paragraph::new(lines), image_area);
}

/// Rows the wrapped notice needs at `width`, between one and `max_rows`.
fn notice_height(notice: &str, width: u16, max_rows: u16) -> u16 {
    let width = width as usize;
    let rows = notice
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                wrapped_height(&format!("{} {}", NOTICE_BADGE, line), width)
            } else {
                wrapped_height(line, width)
            }
        })
        .fold(0u16, u16::saturating_add);
    rows.clamp(1, max_rows.max(1))
}

fn render_notice(app: &App, frame: &mut Frame, area: Rect) {
    let Some(notice) = &app.notice else {
        return;
    };

    // Backend bodies can be long; wrap them rather than cut them off
    let red = Style::default().fg(Color::Red);
    let lines: Vec<Line> = notice
        .as_str()
        .lines()
        .enumerate()
        .map(|(i, text)| {
            if i == 0 {
                Line::from(vec![
                    Span::styled(NOTICE_BADGE, Style::default().bg(Color::Red).fg(Color::White).bold()),
                    Span::styled(format!(" {}", text), red),
                ])
            } else {
                Line::from(Span::styled(text.to_string(), red))
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" DIARY ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" ANSWER ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        InputMode::PhotoPath => (" PHOTO ", Style::default().bg(Color::Magenta).fg(Color::White)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let keys: &[(&str, &str)] = match app.input_mode {
        InputMode::Normal => &[
            ("i", "answer"),
            ("p", "photo"),
            ("s", "start"),
            ("f", "finish"),
            ("r", "song"),
            ("j/k", "scroll"),
            ("Esc", "dismiss"),
            ("q", "quit"),
        ],
        InputMode::Editing => &[("Enter", "send"), ("Esc", "back")],
        InputMode::PhotoPath => &[("Enter", "upload"), ("Esc", "cancel")],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in keys {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_photo_prompt(app: &App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 64.min(area.width.saturating_sub(4));
    let popup_height = 6;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" 오늘의 사진을 업로드해주세요 ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Path to a .jpg, .jpeg or .png file. Enter to upload, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 2));

    let input_area = Rect::new(inner.x, inner.y + 3, inner.width, 1);
    let (visible_text, cursor_x) = visible_input(&app.photo_path_input, input_area.width as usize);

    frame.render_widget(
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan)),
        input_area,
    );
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}
