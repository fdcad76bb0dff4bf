use anyhow::Result;
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::io;
use textwrap::wrap;
use tui_input::{backend::crossterm::EventHandler, Input};

use telechat::chat::reconcile::{ContactView, Direction as MessageDirection, ThreadEntry};
use telechat::chat::ViewState;
use telechat::models::Actor;

// Export types needed by main module
pub use ratatui::backend::CrosstermBackend;
pub use ratatui::Terminal;

/// What the key handler asks the session layer to do.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    None,
    Quit,
    Logout,
    Refresh,
    SelectContact {
        id: String,
        name: String,
        photo_url: Option<String>,
    },
    SendMessage(String),
}

enum Focus {
    Contacts,
    Compose,
}

pub struct ChatUI {
    me: Option<Actor>,
    input: Input,
    search: Input,
    focus: Focus,
    contact_index: usize,
    error_banner: Option<String>,
}

impl ChatUI {
    pub fn new() -> Self {
        ChatUI {
            me: None,
            input: Input::default(),
            search: Input::default(),
            focus: Focus::Contacts,
            contact_index: 0,
            error_banner: None,
        }
    }

    pub fn set_identity(&mut self, actor: Actor) {
        self.me = Some(actor);
    }

    pub fn set_error(&mut self, message: Option<String>) {
        self.error_banner = message;
    }

    /// Clear the compose line after a successful send. On a failed send the
    /// caller skips this so the text stays for a manual retry.
    pub fn clear_compose(&mut self) {
        self.input = Input::default();
    }

    /// Sidebar entries after the search filter, in snapshot order.
    fn visible_contacts<'a>(&self, state: &'a ViewState) -> Vec<&'a ContactView> {
        let needle = self.search.value().to_lowercase();
        state
            .contacts
            .entries
            .iter()
            .filter(|c| needle.is_empty() || c.display_name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn handle_key(&mut self, key: KeyEvent, state: &ViewState) -> UiAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => return UiAction::Quit,
                KeyCode::Char('r') => return UiAction::Refresh,
                KeyCode::Char('l') => return UiAction::Logout,
                _ => {}
            }
        }

        match key.code {
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Contacts => Focus::Compose,
                    Focus::Compose => Focus::Contacts,
                };
                UiAction::None
            }
            KeyCode::Up if matches!(self.focus, Focus::Contacts) => {
                self.contact_index = self.contact_index.saturating_sub(1);
                UiAction::None
            }
            KeyCode::Down if matches!(self.focus, Focus::Contacts) => {
                let count = self.visible_contacts(state).len();
                if count > 0 && self.contact_index + 1 < count {
                    self.contact_index += 1;
                }
                UiAction::None
            }
            KeyCode::Enter => match self.focus {
                Focus::Contacts => {
                    let visible = self.visible_contacts(state);
                    match visible.get(self.contact_index) {
                        Some(contact) => UiAction::SelectContact {
                            id: contact.id.clone(),
                            name: contact.display_name.clone(),
                            photo_url: contact.photo_url.clone(),
                        },
                        None => UiAction::None,
                    }
                }
                Focus::Compose => {
                    let text = self.input.value().to_string();
                    if text.trim().is_empty() {
                        UiAction::None
                    } else {
                        UiAction::SendMessage(text)
                    }
                }
            },
            KeyCode::Esc => UiAction::Quit,
            _ => {
                match self.focus {
                    Focus::Contacts => {
                        self.search
                            .handle_event(&crossterm::event::Event::Key(key));
                        // The filtered list may have shrunk under the cursor.
                        self.contact_index = 0;
                    }
                    Focus::Compose => {
                        self.input.handle_event(&crossterm::event::Event::Key(key));
                    }
                }
                UiAction::None
            }
        }
    }

    pub fn draw<B: Backend>(&mut self, f: &mut Frame<B>, state: &ViewState) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(f.size());

        self.draw_header(f, rows[0]);

        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
            .split(rows[1]);

        self.draw_contacts(f, panes[0], state);
        self.draw_thread(f, panes[1], state);
        self.draw_status(f, rows[2]);
    }

    fn draw_header<B: Backend>(&self, f: &mut Frame<B>, area: Rect) {
        let title = match &self.me {
            Some(actor) => format!(" TeleChat | {} ({}) ", actor.display_name, actor.id),
            None => " TeleChat ".to_string(),
        };
        let header = Paragraph::new(Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )]))
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(header, area);
    }

    fn draw_contacts<B: Backend>(&mut self, f: &mut Frame<B>, area: Rect, state: &ViewState) {
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);

        let search_style = if matches!(self.focus, Focus::Contacts) {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let search = Paragraph::new(self.search.value())
            .style(search_style)
            .block(Block::default().borders(Borders::ALL).title("Search"));
        f.render_widget(search, sections[0]);

        let block = Block::default().borders(Borders::ALL).title("Contacts");

        if let Some(placeholder) = &state.contacts.placeholder {
            let msg = Paragraph::new(placeholder.as_str())
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            f.render_widget(msg, sections[1]);
            return;
        }

        let visible = self.visible_contacts(state);
        if self.contact_index >= visible.len() && !visible.is_empty() {
            self.contact_index = visible.len() - 1;
        }

        let items: Vec<ListItem> = visible
            .iter()
            .map(|c| {
                let status_style = if c.is_online {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                ListItem::new(vec![
                    Line::from(Span::styled(
                        format!("{} {}", c.initial, c.display_name),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(format!("  {}", c.status_label), status_style)),
                ])
            })
            .collect();

        let mut list_state = ListState::default();
        list_state.select(Some(self.contact_index));

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::Blue).fg(Color::White));
        f.render_stateful_widget(list, sections[1], &mut list_state);
    }

    fn draw_thread<B: Backend>(&self, f: &mut Frame<B>, area: Rect, state: &ViewState) {
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(3)])
            .split(area);

        let block = Block::default().borders(Borders::ALL).title("Messages");

        if let Some(placeholder) = &state.thread.placeholder {
            let msg = Paragraph::new(placeholder.as_str())
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            f.render_widget(msg, sections[0]);
        } else {
            let width = sections[0].width.saturating_sub(4).max(10) as usize;
            let mut lines: Vec<Line> = Vec::new();

            for entry in &state.thread.entries {
                match entry {
                    ThreadEntry::DateSeparator(label) => {
                        lines.push(Line::from(Span::styled(
                            format!("── {} ──", label),
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                    ThreadEntry::Message(m) => {
                        let (name_style, text_style) = match m.direction {
                            MessageDirection::Sent => (
                                Style::default().fg(Color::Cyan),
                                Style::default().fg(Color::White),
                            ),
                            MessageDirection::Received => (
                                Style::default().fg(Color::Green),
                                Style::default(),
                            ),
                        };
                        // Sender name is shown for received messages only.
                        if m.direction == MessageDirection::Received {
                            lines.push(Line::from(Span::styled(
                                format!("{} [{}]", m.sender_name, m.time_label),
                                name_style,
                            )));
                        } else {
                            lines.push(Line::from(Span::styled(
                                format!("you [{}]", m.time_label),
                                name_style,
                            )));
                        }
                        for wrapped in wrap(&m.text, width) {
                            let prefix = match m.direction {
                                MessageDirection::Sent => "  > ",
                                MessageDirection::Received => "  ",
                            };
                            lines.push(Line::from(Span::styled(
                                format!("{}{}", prefix, wrapped),
                                text_style,
                            )));
                        }
                    }
                }
            }

            // Keep the newest messages in view.
            let visible = sections[0].height.saturating_sub(2) as usize;
            let scroll = lines.len().saturating_sub(visible) as u16;
            let messages = Paragraph::new(lines).block(block).scroll((scroll, 0));
            f.render_widget(messages, sections[0]);
        }

        let compose_style = if matches!(self.focus, Focus::Compose) {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let compose = Paragraph::new(self.input.value())
            .style(compose_style)
            .block(Block::default().borders(Borders::ALL).title("Message"));
        f.render_widget(compose, sections[1]);
    }

    fn draw_status<B: Backend>(&self, f: &mut Frame<B>, area: Rect) {
        let line = match &self.error_banner {
            Some(error) => Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            None => Line::from(Span::styled(
                " Tab: switch pane | Enter: open chat / send | Ctrl+R: refresh | Ctrl+L: log out | Esc: quit",
                Style::default().fg(Color::DarkGray),
            )),
        };
        f.render_widget(Paragraph::new(line), area);
    }
}

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

pub fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
