use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap},
};

use crate::fetch::LoadState;
use crate::model::{Level, Model, Status};
use crate::pages::Screen;
use crate::pages::form::FormView;
use crate::view::{PaginationBar, TableBody, TableFrame};

const SKELETON_CELL: &str = "░░░░░░░░";
const KEY_HINTS: &str = " ? help  m menu  / search  Enter actions  x export  q quit ";

pub fn draw(model: &Model, frame: &mut Frame) {
    match model.status {
        Status::Login => draw_login(model, frame),
        _ => draw_desk(model, frame),
    }
}

fn popup_area(area: Rect, width: Constraint, height: Constraint) -> Rect {
    let [area] = Layout::vertical([height]).flex(Flex::Center).areas(area);
    let [area] = Layout::horizontal([width]).flex(Flex::Center).areas(area);
    area
}

fn text_width(s: &str) -> u16 {
    s.chars().count().min(u16::MAX as usize) as u16
}

fn draw_login(model: &Model, frame: &mut Frame) {
    let area = frame.area();
    let Some(view) = model.form_view() else {
        return;
    };
    let height = view.fields.len() as u16 + 8;
    let popup = popup_area(area, Constraint::Length(56), Constraint::Length(height));
    let footer = if model.login_pending() {
        "Logging in…".to_string()
    } else {
        format!("Server: {}", model.api_url())
    };
    draw_form(frame, popup, &view, Some(footer));
    draw_footer(model, frame, Rect { y: area.bottom().saturating_sub(1), height: 1, ..area });
}

fn draw_desk(model: &Model, frame: &mut Frame) {
    let area = frame.area();
    let Some(screen) = model.screen() else {
        draw_footer(model, frame, area);
        return;
    };
    let table = screen.frame();
    let has_tabs = screen.tabs().len() > 1;

    let [header, tabs, search, body, pager, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(if has_tabs { 1 } else { 0 }),
        Constraint::Length(if table.search.is_some() { 1 } else { 0 }),
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    draw_header(model, screen, frame, header);
    if has_tabs {
        let titles: Vec<Line> = screen.tabs().into_iter().map(Line::from).collect();
        frame.render_widget(
            Tabs::new(titles)
                .select(screen.active_tab())
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            tabs,
        );
    }
    if let Some(query) = &table.search {
        draw_search(model, query, frame, search);
    }
    draw_table(&table, frame, body);
    if let Some(bar) = &table.pagination {
        frame.render_widget(Paragraph::new(pagination_line(bar)), pager);
    }
    draw_footer(model, frame, footer);

    if let Some(cursor) = model.menu_cursor() {
        draw_menu(model, cursor, frame);
    }
    if let Some((actions, cursor)) = model.action_picker() {
        draw_actions(&actions, cursor, frame);
    }
    if let Some(view) = model.form_view() {
        let height = view.fields.len() as u16 + 6;
        let popup = popup_area(area, Constraint::Percentage(70), Constraint::Length(height));
        draw_form(frame, popup, &view, None);
    }
    if let Some(message) = model.popup() {
        let popup = popup_area(area, Constraint::Length(50), Constraint::Length(22));
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(message).block(Block::bordered().title(" Help ".bold())),
            popup,
        );
    }
}

fn draw_header(model: &Model, screen: &dyn Screen, frame: &mut Frame, area: Rect) {
    let route = screen.route();
    let mut left = vec![
        Span::from(format!(" {} › ", route.section().title())).dim(),
        Span::from(route.title()).bold(),
    ];
    if *screen.load_state() == LoadState::Loading {
        left.push(Span::from("  Loading…").yellow());
    }
    let user = model
        .user()
        .map(|u| format!("{} ({}) ", u.user_name, u.role))
        .unwrap_or_default();
    let [left_area, right_area] =
        Layout::horizontal([Constraint::Fill(1), Constraint::Length(text_width(&user))]).areas(area);
    frame.render_widget(Paragraph::new(Line::from(left)), left_area);
    frame.render_widget(Paragraph::new(user).right_aligned().cyan(), right_area);
}

fn draw_search(model: &Model, query: &str, frame: &mut Frame, area: Rect) {
    const PROMPT: &str = " Search: ";
    let editing = model.search_input();
    let line = Line::from(vec![Span::from(PROMPT).dim(), Span::from(query.to_string())]);
    frame.render_widget(Paragraph::new(line), area);
    if let Some(input) = editing {
        let x = area.x + text_width(PROMPT) + input.cursor as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
    }
}

fn widths(table: &TableFrame) -> Vec<Constraint> {
    table
        .widths
        .iter()
        .map(|w| match w {
            Some(w) => Constraint::Length(*w),
            None => Constraint::Fill(1),
        })
        .collect()
}

fn draw_table(table: &TableFrame, frame: &mut Frame, area: Rect) {
    let block = Block::bordered();
    let header = Row::new(table.headers.iter().map(|h| Cell::from(h.as_str())))
        .style(Style::default().add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    match &table.body {
        TableBody::Empty(message) => {
            let inner = block.inner(area);
            frame.render_widget(block, area);
            let [head, rest] = Layout::vertical([Constraint::Length(2), Constraint::Fill(1)]).areas(inner);
            frame.render_widget(Table::new(Vec::<Row>::new(), widths(table)).header(header), head);
            frame.render_widget(Paragraph::new(message.as_str()).centered().dim(), rest);
        }
        TableBody::Skeleton { rows, columns } => {
            let skeleton = (0..*rows).map(|_| Row::new(vec![SKELETON_CELL; *columns]).dark_gray());
            frame.render_widget(
                Table::new(skeleton, widths(table)).header(header).block(block),
                area,
            );
        }
        TableBody::Rows(rows) => {
            let rows = rows
                .iter()
                .map(|row| Row::new(row.iter().map(|cell| Cell::from(cell.as_str()))));
            let widget = Table::new(rows, widths(table))
                .header(header)
                .block(block)
                .row_highlight_style(Style::default().bg(Color::Blue).fg(Color::White));
            let mut state = TableState::default().with_selected(table.selected);
            frame.render_stateful_widget(widget, area, &mut state);
        }
    }
}

fn pagination_line(bar: &PaginationBar) -> Line<'static> {
    let mut spans = vec![Span::from(" ")];
    let prev = Span::from("‹ Prev ");
    spans.push(if bar.has_prev { prev } else { prev.dim() });
    for page in &bar.buttons {
        let button = Span::from(format!(" {page} "));
        spans.push(if *page == bar.current { button.reversed().bold() } else { button });
    }
    let next = Span::from(" Next ›");
    spans.push(if bar.has_next { next } else { next.dim() });
    spans.push(Span::from(format!("   {}", bar.caption)).dim());
    Line::from(spans)
}

fn draw_footer(model: &Model, frame: &mut Frame, area: Rect) {
    let line = match model.toast() {
        Some(toast) => {
            let style = match toast.level {
                Level::Info => Style::default().fg(Color::Cyan),
                Level::Success => Style::default().fg(Color::Green),
                Level::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            };
            Line::from(Span::styled(format!(" {} ", toast.message), style))
        }
        None if model.busy() => Line::from(" Working…").yellow(),
        None => Line::from(KEY_HINTS).dim(),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_menu(model: &Model, cursor: usize, frame: &mut Frame) {
    let mut lines = Vec::new();
    let mut section = None;
    for (idx, route) in model.menu().iter().enumerate() {
        if section != Some(route.section()) {
            section = Some(route.section());
            lines.push(Line::from(route.section().title()).bold().cyan());
        }
        let entry = Line::from(format!("  {}", route.title()));
        lines.push(if idx == cursor { entry.reversed() } else { entry });
    }
    let height = lines.len() as u16 + 2;
    let popup = popup_area(frame.area(), Constraint::Length(36), Constraint::Length(height));
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(Block::bordered().title(" Menu ".bold())), popup);
}

fn draw_actions(actions: &[&'static str], cursor: usize, frame: &mut Frame) {
    let lines: Vec<Line> = actions
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            let line = Line::from(format!(" {}. {label}", idx + 1));
            if idx == cursor { line.reversed() } else { line }
        })
        .collect();
    let height = lines.len() as u16 + 2;
    let popup = popup_area(frame.area(), Constraint::Length(40), Constraint::Length(height));
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(Block::bordered().title(" Actions ".bold())), popup);
}

fn draw_form(frame: &mut Frame, area: Rect, view: &FormView, footer: Option<String>) {
    let block = Block::bordered().title(format!(" {} ", view.title).bold());
    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let label_width = view
        .fields
        .iter()
        .map(|f| text_width(&f.label) + 2)
        .max()
        .unwrap_or(0);
    let mut lines = Vec::new();
    let mut cursor_at = None;
    for (row, field) in view.fields.iter().enumerate() {
        let marker = if field.required { "*" } else { " " };
        let label = format!("{:>width$}{marker} ", field.label, width = label_width as usize - 1);
        let mut spans = vec![Span::from(label).dim()];
        let value = Span::from(field.value.clone());
        spans.push(if field.focused { value.underlined() } else { value });
        if let Some(hint) = &field.hint {
            spans.push(Span::from(format!("  {hint}")).dark_gray());
        }
        if field.focused {
            cursor_at = Some((inner.x + label_width + 1 + view.cursor as u16, inner.y + row as u16));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::default());
    if let Some(error) = &view.error {
        lines.push(Line::from(error.as_str()).red().bold());
    } else {
        lines.push(Line::from(" Tab next field  ←/→ change choice  Enter save  Esc cancel").dim());
    }
    if let Some(footer) = footer {
        lines.push(Line::from(footer).dim());
    }
    frame.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false }), inner);

    if let Some((x, y)) = cursor_at {
        frame.set_cursor_position((x.min(inner.right().saturating_sub(1)), y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ratatui::{Terminal, backend::TestBackend};
    use serde_json::json;

    use crate::api::ApiClient;
    use crate::config::DeskConfig;
    use crate::domain::Message;
    use crate::session::{Session, make_token, now_epoch_seconds};

    fn render(model: &Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(110, 32)).unwrap();
        terminal.draw(|f| draw(model, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn model(session: Session) -> Model {
        let api = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1), session).unwrap();
        Model::init(&DeskConfig::new("http://127.0.0.1:9"), api)
    }

    fn repair_user() -> Session {
        let session = Session::in_memory();
        let token = make_token(&json!({
            "exp": now_epoch_seconds() + 600,
            "role": "repair",
            "user_name": "Ravi",
        }));
        session.login(token, None).unwrap();
        session
    }

    #[tokio::test]
    async fn login_screen_shows_form() {
        let screen = render(&model(Session::in_memory()));
        assert!(screen.contains("Log in"));
        assert!(screen.contains("Username"));
        assert!(screen.contains("Server: http://127.0.0.1:9"));
    }

    #[tokio::test]
    async fn desk_shows_header_and_loading_skeleton() {
        let screen = render(&model(repair_user()));
        assert!(screen.contains("Repair › Repair Indent"));
        assert!(screen.contains("Loading…"));
        assert!(screen.contains("Ravi (repair)"));
        assert!(screen.contains(SKELETON_CELL));
    }

    #[tokio::test]
    async fn menu_and_help_overlays_render() {
        let mut m = model(repair_user());
        m.update(Some(Message::Menu)).unwrap();
        assert!(render(&m).contains("Vendor Dispatch"));
        m.update(Some(Message::Exit)).unwrap();
        m.update(Some(Message::Help)).unwrap();
        assert!(render(&m).contains("Help"));
    }

    #[test]
    fn pagination_marks_current_page() {
        let bar = PaginationBar {
            caption: "Showing 26–50 of 60".into(),
            buttons: vec![1, 2, 3],
            current: 2,
            total_pages: 3,
            has_prev: true,
            has_next: true,
        };
        let line = pagination_line(&bar);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(text.contains("‹ Prev"));
        assert!(text.contains(" 2 "));
        assert!(text.contains("Showing 26–50 of 60"));
        let current = line.spans.iter().find(|s| s.content == " 2 ").unwrap();
        assert!(current.style.add_modifier.contains(Modifier::REVERSED));
    }
}
