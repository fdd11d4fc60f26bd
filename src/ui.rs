use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, DeployDialog, FormFocus, InputMode};
use crate::model::SubmissionStatus;
use crate::submission::MissingField;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const SELECTED_BG: Color = Color::Rgb(24, 36, 58);
const MAX_SUGGESTIONS: usize = 6;

pub fn render(frame: &mut Frame, app: &App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_body(frame, root[1], app);
    render_footer(frame, root[2], app);

    if let Some(dialog) = app.dialog() {
        render_deploy_dialog(frame, dialog);
    }
    if app.show_help() {
        render_help_modal(frame, app);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let left = Line::from(vec![
        Span::styled(
            " deckhand ",
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" hub {} ", compact_text(app.hub_url(), 48)),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!(" {} kube contexts", app.clusters().len()),
            Style::default().fg(MUTED),
        ),
    ]);

    let right_text = if app.catalog_loading() {
        "loading catalog ".to_string()
    } else {
        app.catalog_refreshed_at()
            .map(|at| format!("refreshed {} ", at.format("%H:%M:%S")))
            .unwrap_or_default()
    };
    let right_width = right_text.chars().count() as u16;
    if right_width == 0 || right_width >= area.width {
        frame.render_widget(Paragraph::new(left).style(Style::default().bg(BG)), area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(Paragraph::new(left).style(Style::default().bg(BG)), chunks[0]);
    frame.render_widget(
        Paragraph::new(right_text)
            .style(Style::default().bg(BG).fg(MUTED))
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn render_body(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);
    let focused = app.mode() == InputMode::Normal;

    render_templates(frame, chunks[0], app, focused);
    render_applications(frame, chunks[1], app);
}

fn render_templates(frame: &mut Frame, area: Rect, app: &App, focused: bool) {
    let header_row = Row::new(["NAME", "INPUTS", "DESCRIPTION"].map(|header| {
        Cell::from(header).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let rows = app.templates().iter().map(|template| {
        Row::new(vec![
            Cell::from(template.name.clone()),
            Cell::from(template.inputs.len().to_string()),
            Cell::from(compact_text(&template.description, 60)).style(Style::default().fg(MUTED)),
        ])
        .style(Style::default().fg(Color::White))
    });

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Length(6),
            Constraint::Min(10),
        ],
    )
    .header(header_row)
    .block(panel_block(
        format!("Templates ({})", app.templates().len()),
        focused,
    ))
    .column_spacing(1)
    .row_highlight_style(
        Style::default()
            .bg(SELECTED_BG)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

    let mut state = TableState::default();
    if !app.templates().is_empty() {
        state.select(Some(app.selected_index()));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_applications(frame: &mut Frame, area: Rect, app: &App) {
    let title = match app.selected_template() {
        Some(template) => format!(
            "Applications of {} ({}) / all {}",
            template.name,
            app.page_applications().len(),
            app.all_applications().len()
        ),
        None => format!("Applications / all {}", app.all_applications().len()),
    };

    let applications = app.page_applications();
    if applications.is_empty() {
        let message = if app.catalog_loading() && app.all_applications().is_empty() {
            "Loading..."
        } else {
            "No applications deployed from this template yet. Press i to deploy one."
        };
        frame.render_widget(
            Paragraph::new(message)
                .wrap(Wrap { trim: false })
                .style(Style::default().fg(MUTED))
                .block(panel_block(title, false)),
            area,
        );
        return;
    }

    let header_row = Row::new(["NAME", "CLUSTER", "NAMESPACE", "STATUS"].map(|header| {
        Cell::from(header).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let rows = applications.into_iter().map(|application| {
        let status_color = match application.status.to_ascii_lowercase().as_str() {
            "failed" | "error" => ERROR,
            "pending" | "installing" => WARN,
            _ => Color::White,
        };
        Row::new(vec![
            Cell::from(application.name),
            Cell::from(application.context_name),
            Cell::from(application.namespace),
            Cell::from(application.status).style(Style::default().fg(status_color)),
        ])
        .style(Style::default().fg(Color::White))
    });

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(20),
        ],
    )
    .header(header_row)
    .block(panel_block(title, false))
    .column_spacing(1);
    frame.render_widget(table, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let (label, label_bg) = match app.mode() {
        InputMode::Normal => (" nrm ", PL_A),
        InputMode::Dialog => (" dlg ", WARN),
    };
    let label_fg = if app.mode() == InputMode::Dialog {
        Color::Black
    } else {
        Color::White
    };

    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, label, label_fg, label_bg, PL_B);
    let status_width = area.width.saturating_sub(24).max(24) as usize;
    push_powerline_segment(
        &mut spans,
        format!(" {} ", compact_text(app.status(), status_width)),
        Color::White,
        PL_B,
        BG,
    );

    let hint = match app.mode() {
        InputMode::Normal => "i deploy  r refresh  ? help ",
        InputMode::Dialog => "tab next  ctrl+s deploy  esc close ",
    };
    let hint_width = hint.chars().count() as u16;
    if spans_width(&spans) as u16 + hint_width >= area.width {
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(hint_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(hint)
            .style(Style::default().bg(BG).fg(MUTED))
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn render_deploy_dialog(frame: &mut Frame, dialog: &DeployDialog) {
    let area = centered_rect(70, 80, frame.area());
    frame.render_widget(Clear, area);

    let controller = dialog.controller();
    let status = controller.status();
    let validation = controller.validation_error();
    let focus = dialog.focus();
    let mut lines = Vec::new();

    let cluster_missing = validation
        .is_some_and(|error| error.missing.contains(&MissingField::Cluster));
    let cluster_text = match controller.cluster_label().or(controller.cluster()) {
        Some(label) if controller.clusters().len() > 1 => format!("< {label} >"),
        Some(label) => label.to_string(),
        None => "no kube contexts found".to_string(),
    };
    lines.push(field_line(
        "Cluster",
        cluster_text,
        focus == FormFocus::Cluster,
        cluster_missing,
    ));

    let resolver = controller.resolver();
    let mut namespace_text = controller.namespace().unwrap_or("(none)").to_string();
    if let Some(current) = resolver.current()
        && current.is_free_text()
    {
        namespace_text = current.to_string();
    }
    if resolver.is_loading() {
        namespace_text.push_str("  loading namespaces...");
    }
    lines.push(field_line(
        "Namespace",
        namespace_text,
        focus == FormFocus::Namespace,
        false,
    ));
    if focus == FormFocus::Namespace {
        lines.push(Line::from(vec![
            Span::styled("    search: ", Style::default().fg(MUTED)),
            Span::styled(
                format!("{}_", resolver.query()),
                Style::default().fg(Color::White),
            ),
        ]));
        let suggestions = resolver.suggestions();
        for (index, namespace) in suggestions.iter().take(MAX_SUGGESTIONS).enumerate() {
            let style = if resolver.highlighted() == Some(index) {
                Style::default()
                    .fg(Color::Black)
                    .bg(ACCENT)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(MUTED)
            };
            lines.push(Line::from(Span::styled(format!("      {namespace}"), style)));
        }
        if suggestions.len() > MAX_SUGGESTIONS {
            lines.push(Line::from(Span::styled(
                format!("      ... {} more", suggestions.len() - MAX_SUGGESTIONS),
                Style::default().fg(MUTED),
            )));
        }
        let query = resolver.query().trim();
        if !query.is_empty() && !resolver.options().iter().any(|option| option.name == query) {
            lines.push(Line::from(Span::styled(
                format!("    enter uses '{query}' as a new namespace"),
                Style::default().fg(MUTED),
            )));
        }
    }

    lines.push(Line::from(""));
    let template = controller.template();
    if template.inputs.is_empty() {
        lines.push(Line::from(Span::styled(
            "This template takes no inputs.",
            Style::default().fg(MUTED),
        )));
    }
    for (index, input) in template.inputs.iter().enumerate() {
        let label = if input.required {
            format!("{} *", input.display_label())
        } else {
            input.display_label().to_string()
        };
        let missing = validation.is_some_and(|error| error.is_missing_input(&input.name));
        let focused = focus == FormFocus::Input(index);
        let mut value = controller.form_value(&input.name).to_string();
        if focused {
            value.push('_');
        }
        lines.push(field_line(&label, value, focused, missing));
        if focused && !input.description.trim().is_empty() {
            lines.push(Line::from(Span::styled(
                format!("    {}", input.description.trim()),
                Style::default().fg(MUTED),
            )));
        }
    }

    lines.push(Line::from(""));
    let button = match status {
        SubmissionStatus::Submitting => "[ Deploying... ]",
        SubmissionStatus::Succeeded => "[ Deployed ]",
        _ => "[ Deploy ]",
    };
    let button_style = if focus == FormFocus::Submit {
        Style::default()
            .fg(Color::Black)
            .bg(ACCENT)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
    };
    lines.push(Line::from(Span::styled(button, button_style)));

    if let Some(error) = validation {
        lines.push(Line::from(Span::styled(
            capitalize(&error.to_string()),
            Style::default().fg(ERROR),
        )));
    }
    let state = controller.state();
    if let Some(message) = &state.error_message {
        lines.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(ERROR).add_modifier(Modifier::BOLD),
        )));
    }
    if let Some(message) = &state.success_message {
        lines.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )));
    }

    let border = match status {
        SubmissionStatus::Failed => ERROR,
        SubmissionStatus::Submitting => WARN,
        _ => ACCENT,
    };
    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(format!("Deploy {}  [{}]", template.name, status.label()))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn field_line(label: &str, value: String, focused: bool, missing: bool) -> Line<'static> {
    let marker = if focused { "> " } else { "  " };
    let label_style = if missing {
        Style::default().fg(ERROR).add_modifier(Modifier::BOLD)
    } else if focused {
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(MUTED)
    };
    let value_style = if focused {
        Style::default().fg(Color::White).bg(SELECTED_BG)
    } else {
        Style::default().fg(Color::White)
    };
    let mut spans = vec![
        Span::styled(marker, label_style),
        Span::styled(format!("{label:<14}"), label_style),
        Span::styled(value, value_style),
    ];
    if missing {
        spans.push(Span::styled("  required", Style::default().fg(ERROR)));
    }
    Line::from(spans)
}

fn render_help_modal(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 60, frame.area());
    frame.render_widget(Clear, area);

    let mode = match app.mode() {
        InputMode::Normal => "normal",
        InputMode::Dialog => "dialog",
    };
    let mut lines = vec![
        Line::from(format!("deckhand help  mode:{mode}")),
        Line::from(""),
    ];
    for line in [
        "j/k, arrows    move between templates",
        "g/G            first/last template",
        "i, d, Enter    deploy the selected template",
        "r, F5          reload templates and applications",
        "R              reload kube contexts",
        "?              toggle this help",
        "q, Ctrl+C      quit",
        "",
        "deploy dialog",
        "Tab/Shift+Tab  next/previous field",
        "Left/Right     switch cluster",
        "Up/Down        pick a namespace suggestion",
        "Enter          confirm namespace or move on",
        "Ctrl+S         deploy",
        "Esc            close",
    ] {
        lines.push(Line::from(line));
    }

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(modal, area);
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(ACCENT)
        } else {
            Style::default().fg(MUTED)
        })
        .style(Style::default().bg(PANEL))
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("\u{e0b0}", Style::default().fg(bg).bg(next_bg)));
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.chars().count()).sum()
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
