/// Pulse dashboard screen

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use crate::core::view_model::{Level, ViewModel};

fn level_color(level: Level) -> Color {
    match level {
        Level::Normal => Color::Green,
        Level::Warning => Color::Yellow,
        Level::Critical => Color::Red,
    }
}

/// Draw one frame from the view model
pub fn render(frame: &mut Frame, vm: &ViewModel) {
    let mut constraints = vec![Constraint::Length(3), Constraint::Length(6)];
    if vm.filter_bar.is_some() {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Min(0));
    constraints.push(Constraint::Length(3));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.size());
    let last = chunks.len() - 1;

    render_header(frame, chunks[0], vm);
    render_metrics(frame, chunks[1], vm);
    if let Some(filter) = &vm.filter_bar {
        render_filter_bar(frame, chunks[2], filter, vm.filter_editing);
    }
    render_processes(frame, chunks[last - 1], vm);
    render_footer(frame, chunks[last], vm);

    if let Some(entries) = &vm.help {
        render_help(frame, entries);
    }
}

fn render_header(frame: &mut Frame, area: Rect, vm: &ViewModel) {
    let title = Paragraph::new(Line::from(Span::styled(
        vm.header.as_str(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));

    frame.render_widget(title, area);
}

fn render_metrics(frame: &mut Frame, area: Rect, vm: &ViewModel) {
    let block = Block::default().borders(Borders::ALL).title("System");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(inner);

    let gauge_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vm.gauges.iter().map(|_| Constraint::Length(1)))
        .split(columns[0]);

    for (gauge, slot) in vm.gauges.iter().zip(gauge_rows.iter()) {
        let widget = Gauge::default()
            .gauge_style(
                Style::default()
                    .fg(level_color(gauge.level))
                    .bg(Color::Black),
            )
            .ratio(gauge.percent / 100.0)
            .label(format!("{:<4} {}", gauge.label, gauge.text));
        frame.render_widget(widget, *slot);
    }

    let label = Style::default().fg(Color::Gray);
    let mut lines = vec![Line::from(vec![
        Span::styled("RX ", label),
        Span::styled(vm.net_rx.as_str(), Style::default().fg(Color::Cyan)),
        Span::raw("  "),
        Span::styled("TX ", label),
        Span::styled(vm.net_tx.as_str(), Style::default().fg(Color::Cyan)),
    ])];

    let cores: Vec<Span> = vm
        .cores
        .iter()
        .flat_map(|core| {
            vec![
                Span::styled(format!("{} ", core.label), label),
                Span::styled(
                    format!("{:>6}  ", core.text),
                    Style::default().fg(level_color(core.level)),
                ),
            ]
        })
        .collect();
    if !cores.is_empty() {
        lines.push(Line::from(cores));
    }

    let details = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(details, columns[1]);
}

fn render_filter_bar(frame: &mut Frame, area: Rect, text: &str, editing: bool) {
    let (content, style) = if editing {
        (
            format!("{}_", text),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )
    } else {
        (text.to_string(), Style::default().fg(Color::Cyan))
    };

    let bar = Paragraph::new(content)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Filter"));
    frame.render_widget(bar, area);
}

fn render_processes(frame: &mut Frame, area: Rect, vm: &ViewModel) {
    let header = Row::new(vec!["PID", "USER", "NAME", "CPU%", "MEM%"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = vm
        .rows
        .iter()
        .map(|process| {
            let cpu_cell = if process.hot {
                Cell::from(Span::styled(
                    process.cpu.as_str(),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ))
            } else {
                Cell::from(process.cpu.as_str())
            };

            let row = Row::new(vec![
                Cell::from(process.pid.as_str()),
                Cell::from(process.user.as_str()),
                Cell::from(process.name.as_str()),
                cpu_cell,
                Cell::from(process.mem.as_str()),
            ]);

            if process.selected {
                row.style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            } else {
                row
            }
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),  // PID
            Constraint::Length(12), // USER
            Constraint::Min(16),    // NAME
            Constraint::Length(7),  // CPU
            Constraint::Length(7),  // MEM
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(vm.table_title.as_str()),
    );

    let mut table_state = TableState::default().with_selected(vm.selected);
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn render_footer(frame: &mut Frame, area: Rect, vm: &ViewModel) {
    let hints = Span::styled(vm.footer.as_str(), Style::default().fg(Color::DarkGray));

    let line = match &vm.message {
        Some(message) => {
            let color = if message.is_error { Color::Red } else { Color::Cyan };
            Line::from(vec![
                Span::styled(
                    message.text.as_str(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                hints,
            ])
        }
        None => Line::from(hints),
    };

    let footer = Paragraph::new(line)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(footer, area);
}

fn render_help(frame: &mut Frame, entries: &[(String, &'static str)]) {
    // Create centered overlay
    let area = frame.size();
    let popup_width = area.width.min(60);
    let popup_height = area.height.min(entries.len() as u16 + 6);
    let popup_area = Rect {
        x: area.width.saturating_sub(popup_width) / 2,
        y: area.height.saturating_sub(popup_height) / 2,
        width: popup_width,
        height: popup_height,
    };

    let mut help_text = vec![
        Line::from(Span::styled(
            "Key Bindings",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for (keys, description) in entries {
        help_text.push(Line::from(vec![
            Span::styled(format!("  {:<16}", keys), Style::default().fg(Color::Cyan)),
            Span::raw(*description),
        ]));
    }
    help_text.push(Line::from(""));
    help_text.push(Line::from(Span::styled(
        "Filter: type to narrow, [Enter] apply, [Esc] cancel",
        Style::default().fg(Color::DarkGray),
    )));

    frame.render_widget(Clear, popup_area);

    let help_widget = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(Span::styled(
                    " Help ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(help_widget, popup_area);
}
