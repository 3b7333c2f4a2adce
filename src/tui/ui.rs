use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Map, MapResolution, Points},
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Clear, Dataset, GraphType,
        Paragraph, Row, Table, Wrap,
    },
    Frame,
};

use super::app::{Action, App, ChartData, Focus, Screen, SidebarControl, Status, VizControl};
use crate::form::WidgetKind;
use crate::viz::ChartKind;

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(10),   // Body
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);
    match app.screen {
        Screen::Login | Screen::SignUp => draw_auth(frame, app, chunks[1]),
        Screen::Main => draw_main(frame, app, chunks[1]),
    }
    draw_status_bar(frame, app, chunks[2]);
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled("  ", Style::default()),
        Span::styled(
            "Inspecta",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            "Restaurant inspections",
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if let Some(user) = app.console.session().username() {
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(
            format!("Logged in as {}", user),
            Style::default().fg(Color::Green),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_auth(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.screen {
        Screen::SignUp => " Sign Up (F2: log in instead) ",
        _ => " Log In (F2: sign up instead) ",
    };
    let popup = centered(area, 50, 8);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3)])
        .split(inner);

    let masked = "*".repeat(app.password.chars().count());
    let inputs = [
        ("Username", app.username.as_str()),
        ("Password", masked.as_str()),
    ];
    for (i, (label, text)) in inputs.iter().enumerate() {
        let focused = app.auth_field == i;
        let color = if focused { Color::Yellow } else { Color::DarkGray };
        let input = Paragraph::new(*text).block(
            Block::default()
                .title(*label)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        );
        frame.render_widget(input, rows[i]);
        if focused {
            frame.set_cursor_position((
                rows[i].x + 1 + text.chars().count() as u16,
                rows[i].y + 1,
            ));
        }
    }
}

fn draw_main(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(20)])
        .split(area);

    draw_sidebar(frame, app, chunks[0]);

    let focused = app.focus == Focus::Content;
    let table_name = app.table_name().unwrap_or("");
    let title = match app.action {
        Action::Read => format!(" All records in {} ", table_name),
        Action::Create => format!(" Create a new record in {} ", table_name),
        Action::Update => format!(" Update a record in {} ", table_name),
        Action::Delete => format!(" Delete a record from {} ", table_name),
        Action::Visualize => format!(" Visualize {} ", table_name),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)));
    let inner = block.inner(chunks[1]);
    frame.render_widget(block, chunks[1]);

    match app.action {
        Action::Read => draw_results(frame, app, inner),
        Action::Create | Action::Update => draw_form(frame, app, inner),
        Action::Delete => draw_delete(frame, app, inner),
        Action::Visualize => draw_visualize(frame, app, inner),
    }
}

fn border_color(focused: bool) -> Color {
    if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    }
}

fn selector_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let value_style = if focused {
        Style::default().fg(Color::Black).bg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };
    Line::from(vec![
        Span::styled(
            format!("{:<10}", label),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(format!("< {} >", value), value_style),
    ])
}

fn draw_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Sidebar;
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)));

    let lines = vec![
        selector_line(
            "Table",
            app.table_name().unwrap_or("-"),
            focused && app.sidebar_control == SidebarControl::Table,
        ),
        selector_line(
            "Action",
            app.action.label(),
            focused && app.sidebar_control == SidebarControl::Action,
        ),
        Line::from(""),
        Line::from(Span::styled(
            "L: log out  r: reload",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_results(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref table) = app.table else {
        let empty = Paragraph::new("No table loaded")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    };
    if table.row_count() == 0 {
        frame.render_widget(Paragraph::new("No records"), area);
        return;
    }

    let header_cells: Vec<Cell> = table
        .schema
        .columns
        .iter()
        .enumerate()
        .skip(app.result_horizontal_scroll)
        .map(|(i, col)| {
            let width = app.column_widths.get(i).copied().unwrap_or(10);
            let style = if table.schema.is_key(&col.name) {
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            };
            Cell::from(truncate_string(&col.name, width)).style(style)
        })
        .collect();
    let header = Row::new(header_cells).height(1);

    let visible_height = area.height.saturating_sub(2) as usize;
    let rows: Vec<Row> = table
        .rows
        .iter()
        .skip(app.result_scroll)
        .take(visible_height)
        .map(|row| {
            let cells: Vec<Cell> = row
                .values
                .iter()
                .enumerate()
                .skip(app.result_horizontal_scroll)
                .map(|(i, val)| {
                    let width = app.column_widths.get(i).copied().unwrap_or(10);
                    Cell::from(truncate_string(&val.to_string(), width))
                })
                .collect();
            Row::new(cells)
        })
        .collect();

    let widths: Vec<Constraint> = app
        .column_widths
        .iter()
        .skip(app.result_horizontal_scroll)
        .map(|&w| Constraint::Length(w as u16 + 2))
        .collect();

    let table_widget = Table::new(rows, &widths).header(header);
    frame.render_widget(table_widget, area);
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    } else {
        s.chars().take(max_len).collect()
    }
}

fn draw_form(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Content;
    let mut lines = Vec::new();

    if app.action == Action::Update {
        let key = app
            .selected_key()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "(no records)".to_string());
        let key_name = app
            .table
            .as_ref()
            .map(|t| t.schema.key.join(", "))
            .unwrap_or_default();
        lines.push(selector_line(
            &format!("Select {}", key_name),
            &key,
            focused && app.key_selector_focused,
        ));
        lines.push(Line::from(""));
    }

    let Some(form) = app.form.as_ref() else {
        lines.push(Line::from(Span::styled(
            "Nothing to edit",
            Style::default().fg(Color::DarkGray),
        )));
        frame.render_widget(Paragraph::new(lines), area);
        return;
    };

    let label_width = form
        .fields
        .iter()
        .map(|f| f.name.len())
        .max()
        .unwrap_or(0)
        + 2;
    for (i, field) in form.fields.iter().enumerate() {
        let active = focused
            && i == app.form_field
            && !(app.action == Action::Update && app.key_selector_focused);
        let hint = match field.widget {
            WidgetKind::Integer => "int, </> steps",
            WidgetKind::Float => "number, </> steps",
            WidgetKind::Text => "text",
        };
        let value_style = if field.read_only {
            Style::default().fg(Color::DarkGray)
        } else if active {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };
        let hint = if field.read_only { "read-only" } else { hint };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<width$}", field.name, width = label_width),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled(format!("[{}]", field.text), value_style),
            Span::styled(
                format!("  {}", hint),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
    }

    lines.push(Line::from(""));
    let submit = match app.action {
        Action::Create => "Enter: Insert",
        _ => "Enter: Save changes",
    };
    lines.push(Line::from(Span::styled(
        submit,
        Style::default().fg(Color::Green),
    )));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

fn draw_delete(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Content;
    let key_name = app
        .table
        .as_ref()
        .map(|t| t.schema.key.join(", "))
        .unwrap_or_default();
    let key = app
        .selected_key()
        .map(|k| k.to_string())
        .unwrap_or_else(|| "(no records)".to_string());

    let lines = vec![
        selector_line(&format!("Select {}", key_name), &key, focused),
        Line::from(""),
        Line::from(Span::styled(
            "Enter: Delete",
            Style::default().fg(Color::Red),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_visualize(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Content;
    let viz = &app.viz;
    let is_focused = |control: VizControl| focused && viz.control == Some(control);

    let mut lines = vec![selector_line(
        "Chart",
        &viz.chart.to_string(),
        is_focused(VizControl::Chart),
    )];
    if viz.chart != ChartKind::Map {
        let x = viz
            .categories
            .get(viz.x_index)
            .map(String::as_str)
            .unwrap_or("-");
        let y = viz
            .numerics
            .get(viz.y_index)
            .map(String::as_str)
            .unwrap_or("-");
        lines.push(selector_line("X", x, is_focused(VizControl::X)));
        lines.push(selector_line("Y", y, is_focused(VizControl::Y)));
        lines.push(selector_line(
            "Aggregate",
            &viz.aggregation.to_string(),
            is_focused(VizControl::Aggregation),
        ));
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(lines.len() as u16 + 1),
            Constraint::Min(5),
        ])
        .split(area);
    frame.render_widget(Paragraph::new(lines), chunks[0]);

    match (&viz.data, viz.chart) {
        (Some(ChartData::Series(series)), ChartKind::Bar) => {
            draw_bar_chart(frame, series, chunks[1])
        }
        (Some(ChartData::Series(series)), ChartKind::Line) => {
            draw_line_chart(frame, series, chunks[1])
        }
        (Some(ChartData::Points(points)), ChartKind::Map) => draw_map(frame, points, chunks[1]),
        _ => {
            let empty = Paragraph::new("Nothing to plot")
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(empty, chunks[1]);
        }
    }
}

fn draw_bar_chart(frame: &mut Frame, series: &[(String, f64)], area: Rect) {
    let bars: Vec<Bar> = series
        .iter()
        .map(|(label, value)| {
            Bar::default()
                .label(Line::from(truncate_string(label, 12)))
                .value(value.max(0.0).round() as u64)
                .text_value(format_number(*value))
        })
        .collect();

    let chart = BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .bar_width(12)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    frame.render_widget(chart, area);
}

fn draw_line_chart(frame: &mut Frame, series: &[(String, f64)], area: Rect) {
    let points: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, (_, value))| (i as f64, *value))
        .collect();
    let (min, max) = series
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| {
            (lo.min(*v), hi.max(*v))
        });
    let (min, max) = if min.is_finite() {
        (min.min(0.0), max)
    } else {
        (0.0, 1.0)
    };

    let first = series.first().map(|(l, _)| l.clone()).unwrap_or_default();
    let last = series.last().map(|(l, _)| l.clone()).unwrap_or_default();
    let datasets = vec![Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points)];

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .bounds([0.0, series.len().saturating_sub(1).max(1) as f64])
                .labels(vec![Span::raw(first), Span::raw(last)]),
        )
        .y_axis(
            Axis::default()
                .bounds([min, max.max(min + 1.0)])
                .labels(vec![
                    Span::raw(format_number(min)),
                    Span::raw(format_number(max)),
                ]),
        );
    frame.render_widget(chart, area);
}

fn draw_map(frame: &mut Frame, points: &[(f64, f64)], area: Rect) {
    // Canvas coordinates are (x, y) = (longitude, latitude).
    let coords: Vec<(f64, f64)> = points
        .iter()
        .map(|(lat, lon)| (*lon, *lat))
        .collect();
    let (x_bounds, y_bounds) = map_bounds(&coords);

    let canvas = Canvas::default()
        .marker(symbols::Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            ctx.draw(&Map {
                resolution: MapResolution::High,
                color: Color::DarkGray,
            });
            ctx.layer();
            ctx.draw(&Points {
                coords: &coords,
                color: Color::Red,
            });
        });
    frame.render_widget(canvas, area);
}

fn map_bounds(coords: &[(f64, f64)]) -> ([f64; 2], [f64; 2]) {
    if coords.is_empty() {
        return ([-180.0, 180.0], [-90.0, 90.0]);
    }
    let (mut min_x, mut max_x, mut min_y, mut max_y) =
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
    for (x, y) in coords {
        min_x = min_x.min(*x);
        max_x = max_x.max(*x);
        min_y = min_y.min(*y);
        max_y = max_y.max(*y);
    }
    let pad = 1.0;
    (
        [(min_x - pad).max(-180.0), (max_x + pad).min(180.0)],
        [(min_y - pad).max(-90.0), (max_y + pad).min(90.0)],
    )
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let help = match (app.screen, app.focus, app.action) {
        (Screen::Login | Screen::SignUp, _, _) => {
            "Tab:switch field  Enter:submit  F2:toggle sign up  Esc:quit"
        }
        (Screen::Main, Focus::Sidebar, _) => {
            "j/k:control  h/l:change  Tab:content  L:logout  q:quit"
        }
        (Screen::Main, Focus::Content, Action::Read) => {
            "j/k:scroll  h/l:columns  g/G:top/bottom  Esc:back"
        }
        (Screen::Main, Focus::Content, Action::Create | Action::Update) => {
            "Up/Down:field  Left/Right:step  Enter:submit  Esc:back"
        }
        (Screen::Main, Focus::Content, Action::Delete) => {
            "Left/Right:record  Enter:delete  Esc:back"
        }
        (Screen::Main, Focus::Content, Action::Visualize) => {
            "Up/Down:control  Left/Right:change  Esc:back"
        }
    };

    let mut spans = Vec::new();
    match &app.status {
        Some(Status::Success(msg)) => {
            spans.push(Span::styled(
                format!(" {} ", msg),
                Style::default().fg(Color::Black).bg(Color::Green),
            ));
            spans.push(Span::raw(" "));
        }
        Some(Status::Error(msg)) => {
            spans.push(Span::styled(
                format!(" {} ", msg),
                Style::default().fg(Color::White).bg(Color::Red),
            ));
            spans.push(Span::raw(" "));
        }
        None => {}
    }
    spans.push(Span::styled(help, Style::default().fg(Color::DarkGray)));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
