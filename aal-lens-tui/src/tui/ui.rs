use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
};
use aal_lens_core::legend::abbreviate;
use crate::tui::app::{App, Classified, Focus, View};
use crate::tui::theme::{class_color, Theme};

pub fn render(frame: &mut Frame, app: &App) {
    let theme = &app.theme;
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(3), Constraint::Length(1)])
        .split(area);
    render_topbar(frame, app, chunks[0], theme);
    let mid = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);
    match &app.result {
        Some(res) if !res.scale.breaks.is_empty() => {
            render_chart(frame, app, res, mid[0], theme);
            render_legend(frame, app, res, mid[1], theme);
        }
        Some(_) => render_placeholder(frame, chunks[1], "No observations to classify.", theme),
        None if app.is_busy() => render_placeholder(frame, chunks[1], "Classifying...", theme),
        None => render_placeholder(frame, chunks[1], "No result. Adjust settings to retry.", theme),
    }
    render_breaks(frame, app, chunks[2], theme);
    render_bottombar(frame, app, chunks[3], theme);
    if app.view == View::Help { render_help(frame, area); }
}

fn render_topbar(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    let badge = if app.is_busy() {
        Span::styled("[BUSY]", Style::default().fg(theme.warning))
    } else {
        Span::styled("[OK]", Style::default().fg(theme.success))
    };
    let k = match app.opts.classes {
        Some(k) => format!("k={k}"),
        None => format!("k=auto({})", app.requested_classes()),
    };
    let info = format!(
        " {} | {} obs | {} no data | {} | {k} | palette {}",
        app.title(),
        app.observation_count(),
        app.no_data_count(),
        app.opts.method,
        app.opts.palette.name,
    );
    let line = Line::from(vec![badge, Span::raw(info)]);
    frame.render_widget(Paragraph::new(line).style(Style::default().bg(theme.bg).fg(theme.fg)), area);
}

fn render_placeholder(frame: &mut Frame, area: Rect, msg: &str, theme: &Theme) {
    frame.render_widget(
        Paragraph::new(msg).style(Style::default().fg(theme.muted)).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn focus_style(focused: bool, theme: &Theme) -> Style {
    if focused { Style::default().fg(theme.highlight) } else { Style::default() }
}

fn render_chart(frame: &mut Frame, app: &App, res: &Classified, area: Rect, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Members per class")
        .border_style(focus_style(app.focus == Focus::Chart, theme));
    let k = res.summaries.len().max(1) as u16;
    let inner_width = area.width.saturating_sub(2);
    let bar_width = (inner_width / k).saturating_sub(1).clamp(1, 12);
    let bars: Vec<Bar> = res
        .summaries
        .iter()
        .map(|s| {
            let color = class_color(res.scale.colors[s.index]);
            Bar::default()
                .value(s.count)
                .label(Line::from(format!("{}", s.index + 1)))
                .text_value(s.count.to_string())
                .style(Style::default().fg(color))
                .value_style(Style::default().fg(theme.bg).bg(color))
        })
        .collect();
    let chart = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1);
    frame.render_widget(chart, area);
}

fn render_legend(frame: &mut Frame, app: &App, res: &Classified, area: Rect, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(res.legend.title.clone())
        .border_style(focus_style(app.focus == Focus::Legend, theme));
    let header = Row::new(["", "Class", "Count", "Mean"].map(|h| Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD))));
    let locale = app.opts.legend.locale;
    let rows: Vec<Row> = res
        .legend
        .entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let summary = res.summaries.get(i).filter(|_| e.lower.is_some());
            let count = summary.map_or_else(|| app.no_data_count().to_string(), |s| s.count.to_string());
            let mean = summary.and_then(|s| s.mean).map_or_else(|| "-".into(), |m| abbreviate(m, locale));
            Row::new([
                Cell::from("██").style(Style::default().fg(class_color(e.color))),
                Cell::from(e.label.clone()),
                Cell::from(count),
                Cell::from(mean),
            ])
        })
        .collect();
    let table = Table::new(rows, [Constraint::Length(2), Constraint::Min(20), Constraint::Length(7), Constraint::Length(10)])
        .header(header)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = TableState::default();
    if app.focus == Focus::Legend { state.select(Some(app.legend_selected)); }
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_breaks(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    let text = match &app.result {
        Some(res) if !res.scale.breaks.is_empty() => {
            let locale = app.opts.legend.locale;
            let b: Vec<String> = res.scale.breaks.as_slice().iter().map(|v| abbreviate(*v, locale)).collect();
            Line::from(vec![
                Span::styled("breaks ", Style::default().fg(theme.muted)),
                Span::raw(b.join(" | ")),
                Span::styled(format!("   GVF {:.3}", res.gvf), Style::default().fg(theme.highlight)),
            ])
        }
        _ => Line::from(""),
    };
    frame.render_widget(Paragraph::new(text).block(Block::default().borders(Borders::ALL)).wrap(Wrap { trim: true }), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(Span::styled("Keybindings", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  q        Quit"),
        Line::from("  ?        Toggle help"),
        Line::from("  Tab      Cycle focus"),
        Line::from("  + / -    More / fewer classes"),
        Line::from("  a        Automatic class count"),
        Line::from("  m        Cycle method"),
        Line::from("  p        Cycle palette"),
        Line::from("  s        Toggle legend style"),
        Line::from("  e        Export JSON report"),
        Line::from("  j/k      Navigate legend"),
        Line::from("  Esc      Close help"),
    ];
    let popup = centered_rect(50, 60, area);
    frame.render_widget(ratatui::widgets::Clear, popup);
    frame.render_widget(Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help (?)")), popup);
}

fn render_bottombar(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    let bar_text = format!(" {} | q:quit ?:help Tab:focus +/- a m p s e", app.status_msg);
    frame.render_widget(Paragraph::new(bar_text).style(Style::default().bg(theme.bg).fg(theme.fg)), area);
}

fn centered_rect(px: u16, py: u16, r: Rect) -> Rect {
    let v = Layout::default().direction(Direction::Vertical).constraints([Constraint::Percentage((100-py)/2), Constraint::Percentage(py), Constraint::Percentage((100-py)/2)]).split(r);
    Layout::default().direction(Direction::Horizontal).constraints([Constraint::Percentage((100-px)/2), Constraint::Percentage(px), Constraint::Percentage((100-px)/2)]).split(v[1])[1]
}
