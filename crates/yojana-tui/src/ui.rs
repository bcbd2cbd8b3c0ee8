use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use yojana_core::markup::{self, Block as MarkupBlock, Fragment, Inline};
use yojana_core::{Category, ChatRole, NoticeLevel, SourceKind, View};

use crate::app::{App, AuthMode, ChatMode, InputMode, Pane, CATEGORY_FIELD, PROFILE_FIELDS};

/// Turn a parsed reply into styled terminal lines
pub fn fragment_lines(fragment: &Fragment) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (i, block) in fragment.blocks.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        match block {
            MarkupBlock::Heading { level, content } => {
                let mut style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
                if *level == 1 {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                lines.extend(inline_lines(content, style));
            }
            MarkupBlock::Paragraph(content) => {
                lines.extend(inline_lines(content, Style::default()));
            }
            MarkupBlock::List(items) => {
                for item in items {
                    for (j, line) in inline_lines(item, Style::default()).into_iter().enumerate() {
                        let marker = if j == 0 { "  • " } else { "    " };
                        let mut spans = vec![Span::styled(marker, Style::default().fg(Color::Cyan))];
                        spans.extend(line.spans);
                        lines.push(Line::from(spans));
                    }
                }
            }
            MarkupBlock::Code { lang, text } => {
                if let Some(lang) = lang {
                    lines.push(Line::from(Span::styled(
                        format!("  [{}]", lang),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                for code_line in text.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("  {}", code_line),
                        Style::default().fg(Color::Green),
                    )));
                }
            }
        }
    }
    lines
}

fn inline_lines(inlines: &[Inline], style: Style) -> Vec<Line<'static>> {
    let mut lines = vec![Vec::new()];
    push_inlines(inlines, style, &mut lines);
    lines.into_iter().map(Line::from).collect()
}

fn push_inlines(inlines: &[Inline], style: Style, lines: &mut Vec<Vec<Span<'static>>>) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => push_span(lines, Span::styled(text.clone(), style)),
            Inline::Code(code) => push_span(lines, Span::styled(code.clone(), style.fg(Color::Yellow))),
            Inline::Strong(children) => {
                push_inlines(children, style.add_modifier(Modifier::BOLD), lines)
            }
            Inline::Emphasis(children) => {
                push_inlines(children, style.add_modifier(Modifier::ITALIC), lines)
            }
            Inline::LineBreak => lines.push(Vec::new()),
        }
    }
}

fn push_span(lines: &mut Vec<Vec<Span<'static>>>, span: Span<'static>) {
    if let Some(last) = lines.last_mut() {
        last.push(span);
    }
}

/// Rows the lines occupy once wrapped to `width`
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum();
    rows.min(u16::MAX as usize) as u16
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.view() {
        View::Unauthenticated => render_auth(app, frame, body_area),
        View::ProfileIncomplete => render_profile(app, frame, body_area),
        View::Main => render_main(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    if app.view() == View::Main {
        render_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let who = app
        .session
        .as_ref()
        .map(|s| format!(" {} ", s.email))
        .unwrap_or_default();

    let title = Line::from(vec![
        Span::styled(" Yojana ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(who, Style::default().fg(Color::White)),
        Span::styled(
            format!(" {} ", app.config.api_base_url()),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match (app.view(), app.input_mode) {
        (View::Unauthenticated, _) => (" SIGN IN ", Style::default().bg(Color::Magenta).fg(Color::White)),
        (View::ProfileIncomplete, _) => (" PROFILE ", Style::default().bg(Color::Magenta).fg(Color::White)),
        (View::Main, InputMode::Editing) => (" ASK ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        (View::Main, InputMode::Normal) => (" MAIN ", Style::default().bg(Color::Blue).fg(Color::White)),
    };

    let message = match &app.notice {
        Some(notice) => {
            let color = match notice.level {
                NoticeLevel::Info => Color::Green,
                NoticeLevel::Error => Color::Red,
            };
            Span::styled(format!(" {}", notice.text), Style::default().fg(color))
        }
        None => Span::styled(footer_hints(app), Style::default().fg(Color::DarkGray)),
    };

    let footer = Paragraph::new(Line::from(vec![Span::styled(mode_text, mode_style), message]));
    frame.render_widget(footer, area);
}

fn footer_hints(app: &App) -> &'static str {
    match app.view() {
        View::Unauthenticated => " Enter submit | Tab field | F2 login/register | Esc quit",
        View::ProfileIncomplete => " Tab next field | Left/Right category | Enter save | Ctrl+L logout",
        View::Main if app.input_mode == InputMode::Editing => " Enter send | Esc stop typing",
        View::Main => {
            " i ask | e eligibility/documents | u upload | t text | w url | r refresh | h history | c clear | p profile | Ctrl+L logout | q quit"
        }
    }
}

fn auth_action(mode: AuthMode) -> &'static str {
    match mode {
        AuthMode::Login => "Sign in",
        AuthMode::Register => "Create account",
    }
}

fn render_auth(app: &App, frame: &mut Frame, area: Rect) {
    let form = &app.auth_form;
    let popup = centered_rect(56, 12, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", auth_action(form.mode)));

    let field = |label: &str, value: String, focused: bool| {
        let marker = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::styled(format!("{}{:<10}", marker, label), style),
            Span::raw(value),
        ])
    };

    let mut lines = vec![
        Line::default(),
        field("Email", form.email.clone(), !form.on_password),
        field("Password", "*".repeat(form.password.chars().count()), form.on_password),
        Line::default(),
    ];

    if app.is_auth_busy() {
        let dots = ".".repeat(app.animation_frame as usize + 1);
        lines.push(Line::from(Span::styled(
            format!("  Contacting server{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    } else if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            format!("  {}", error),
            Style::default().fg(Color::Red),
        )));
    }

    lines.push(Line::default());
    let switch = match form.mode {
        AuthMode::Login => "  No account yet? Press F2 to register.",
        AuthMode::Register => "  Already registered? Press F2 to sign in.",
    };
    lines.push(Line::from(Span::styled(switch, Style::default().fg(Color::DarkGray))));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn render_profile(app: &App, frame: &mut Frame, area: Rect) {
    let form = &app.profile_form;
    let popup = centered_rect(70, 16, area);
    let title = if app.editing_profile {
        " Edit profile (Esc to cancel) "
    } else {
        " Complete your profile "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    let mut lines = vec![Line::from(Span::styled(
        "  Used to match you with schemes and scholarships.",
        Style::default().fg(Color::DarkGray),
    ))];
    lines.push(Line::default());

    for (i, label) in PROFILE_FIELDS.iter().enumerate() {
        let focused = form.focus == i;
        let marker = if focused { "> " } else { "  " };
        let label_style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let value = if i == CATEGORY_FIELD {
            let category: Category = form.category();
            format!("< {} >", category.display_name())
        } else {
            form.values[i].clone()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{}{:<30}", marker, label), label_style),
            Span::raw(value),
        ]));
    }

    lines.push(Line::default());
    if app.is_profile_busy() {
        lines.push(Line::from(Span::styled(
            "  Saving...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    } else if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            format!("  {}", error),
            Style::default().fg(Color::Red),
        )));
    }

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn render_main(app: &mut App, frame: &mut Frame, area: Rect) {
    let [sources_area, chat_column] =
        Layout::horizontal([Constraint::Percentage(30), Constraint::Percentage(70)]).areas(area);

    render_sources(app, frame, sources_area);
    render_chat(app, frame, chat_column);
}

fn render_sources(app: &mut App, frame: &mut Frame, area: Rect) {
    app.sources_area = Some(area);
    let focused = app.focus == Pane::Sources;
    let border = if focused { Color::Cyan } else { Color::DarkGray };

    let mut title = format!(" Sources ({}) ", app.sources.sources().len());
    if app.sources.is_uploading() {
        title.push_str(&format!("uploading{} ", ".".repeat(app.animation_frame as usize + 1)));
    } else if app.is_refreshing() {
        title.push_str("refreshing ");
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title);

    let sources = app.sources.sources();
    if sources.is_empty() {
        let hint = Paragraph::new(Text::from(vec![
            Line::from(Span::styled("No sources yet.", Style::default().fg(Color::DarkGray))),
            Line::from(Span::styled(
                format!("u: upload a marksheet ({})", app.sources.accepted_type()),
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled("t: paste text, w: add a URL", Style::default().fg(Color::DarkGray))),
        ]))
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(hint, area);
        return;
    }

    let items: Vec<ListItem> = sources
        .iter()
        .map(|source| {
            let icon = match source.kind {
                SourceKind::Document => "[doc]",
                SourceKind::Text => "[txt]",
                SourceKind::Url => "[url]",
            };
            ListItem::new(Text::from(vec![
                Line::from(vec![
                    Span::styled(format!("{} ", icon), Style::default().fg(Color::Magenta)),
                    Span::raw(source.title.clone()),
                ]),
                Line::from(Span::styled(
                    format!("      {}", source.created_at.format("%d %b %Y")),
                    Style::default().fg(Color::DarkGray),
                )),
            ]))
        })
        .collect();

    let selected = app
        .sources
        .selected_id()
        .and_then(|id| sources.iter().position(|s| &s.id == id));
    let highlight = if app.chat_mode == ChatMode::Documents {
        Style::default().bg(Color::Magenta).fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Magenta)
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(highlight)
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let context = app.active_context();
    let citations: Vec<String> = context
        .as_ref()
        .and_then(|c| app.conversations.conversation(c))
        .map(|c| c.citations().to_vec())
        .unwrap_or_default();
    let refs_height = if citations.is_empty() {
        0
    } else {
        (citations.len().min(4) + 2) as u16
    };

    let [chat_area, refs_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(refs_height),
        Constraint::Length(3),
    ])
    .areas(area);
    app.chat_area = Some(chat_area);

    let focused = app.focus == Pane::Chat;
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    let title = match app.chat_mode {
        ChatMode::Eligibility => " Eligibility check ".to_string(),
        ChatMode::Documents => app
            .sources
            .selected()
            .map(|s| format!(" {} ", s.title))
            .unwrap_or_else(|| " No source selected ".to_string()),
    };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title);

    let pending = app.is_active_pending();
    let messages = app.conversations.active_messages();
    let lines: Vec<Line> = if messages.is_empty() && !pending {
        vec![Line::from(Span::styled(
            empty_chat_hint(app),
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        let mut lines = Vec::new();
        for msg in messages {
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    lines.extend(msg.content.lines().map(|l| Line::from(l.to_string())));
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "Yojana:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    lines.extend(fragment_lines(&markup::parse(&msg.content)));
                }
            }
            lines.push(Line::default());
        }
        if pending {
            lines.push(Line::from(Span::styled(
                "Yojana:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat(app.animation_frame as usize + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
        lines
    };

    let inner_height = chat_area.height.saturating_sub(2);
    let inner_width = chat_area.width.saturating_sub(2);
    let max_scroll = wrapped_height(&lines, inner_width).saturating_sub(inner_height);
    app.chat_height = inner_height;
    app.chat_scroll = if app.follow_chat {
        max_scroll
    } else {
        app.chat_scroll.min(max_scroll)
    };
    if app.chat_scroll == max_scroll {
        app.follow_chat = true;
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    if refs_height > 0 {
        let items: Vec<ListItem> = citations
            .iter()
            .take(4)
            .map(|c| ListItem::new(format!(" {}", c)))
            .collect();
        let refs = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Magenta))
                .title(" Cited "),
        );
        frame.render_widget(refs, refs_area);
    }

    render_chat_input(app, frame, input_area);
}

fn empty_chat_hint(app: &App) -> &'static str {
    match app.chat_mode {
        ChatMode::Eligibility if app.conversations.profile().is_none() => {
            "Press p to fill in your profile, then ask which schemes you qualify for."
        }
        ChatMode::Eligibility => "Ask which schemes and scholarships you qualify for...",
        ChatMode::Documents if app.sources.selected().is_none() => {
            "Upload a marksheet (u) or add a text (t) or URL (w) source to start."
        }
        ChatMode::Documents => "Ask a question about this source...",
    }
}

fn render_chat_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border = if editing { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(" Question ");

    let input = Paragraph::new(app.chat_input.as_str()).block(block);
    frame.render_widget(input, area);

    if editing {
        let inner_width = area.width.saturating_sub(2);
        let col = (app.chat_cursor as u16).min(inner_width.saturating_sub(1));
        frame.set_cursor_position((area.x + 1 + col, area.y + 1));
    }
}

fn render_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let Some(prompt) = app.prompt else {
        return;
    };
    let popup = centered_rect(64, 3, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(prompt.title());
    let input = Paragraph::new(app.prompt_input.as_str()).block(block);

    frame.render_widget(Clear, popup);
    frame.render_widget(input, popup);

    let col = (app.prompt_input.chars().count() as u16).min(popup.width.saturating_sub(3));
    frame.set_cursor_position((popup.x + 1 + col, popup.y + 1));
}
