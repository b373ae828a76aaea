use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("      Quit"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("tab", Style::default().fg(Color::Magenta)),
            Span::raw("         Switch tabs"),
        ]),
        Line::from(""),
        Line::from("Configuration tab:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw("         Select field"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("←/→", Style::default().fg(Color::Magenta)),
            Span::raw("         Adjust database count"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("enter", Style::default().fg(Color::Magenta)),
            Span::raw("       Start server"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Ctrl-S", Style::default().fg(Color::Magenta)),
            Span::raw("      Save parameters as profile"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Ctrl-L", Style::default().fg(Color::Magenta)),
            Span::raw("      Load saved profile"),
        ]),
        Line::from(""),
        Line::from("Terminal tab:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("s", Style::default().fg(Color::Magenta)),
            Span::raw("           Start server"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("k", Style::default().fg(Color::Magenta)),
            Span::raw("           Stop server (SIGINT)"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw(" or "),
            Span::styled("PgUp/PgDn", Style::default().fg(Color::Magenta)),
            Span::raw("  Scroll output"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("end", Style::default().fg(Color::Magenta)),
            Span::raw("         Follow output"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw("           Quit"),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
