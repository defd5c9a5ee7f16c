use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState, Tabs,
    Wrap,
};
use ratatui::Frame;
use rusqlite::Connection;

use crate::controller::books::{add_book, edit_book, find_all_books, remove_book_by_id};
use crate::controller::borrows::{add_borrow, edit_borrow, find_all_borrows, remove_borrow_by_id};
use crate::controller::members::{
    add_member, edit_member, find_all_members, find_members_by_family, remove_member_by_id,
};
use crate::controller::reports::{report, today};
use crate::db::ReportKind;
use crate::models::{Book, Borrow, Member};

use super::forms::{BookForm, BorrowForm, ConfirmDelete, MemberForm, RecordKind};
use super::helpers::{centered_rect, even_widths, surface_error};
use super::screens::{RecordList, ReportView, ReportsScreen, Tab};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Height of the tab bar, borders included.
const HEADER_HEIGHT: u16 = 3;
/// Suggestions shown under an autocomplete field at once.
const MAX_SUGGESTIONS: usize = 6;

const MEMBER_HEADINGS: &[&str] = &["ID", "Name", "Family"];
const BOOK_HEADINGS: &[&str] = &["ID", "Title", "Author", "Pages"];
const BORROW_HEADINGS: &[&str] = &["ID", "Member ID", "Book ID", "Borrow Date", "Return Date"];

/// What the keyboard is currently driving. Forms live inside the mode so a
/// cancelled edit simply drops its state.
enum Mode {
    Normal,
    EditingMember(MemberForm),
    EditingBook(BookForm),
    EditingBorrow(BorrowForm),
    ConfirmDelete(ConfirmDelete),
    SearchingFamily(String),
    ViewingReport(ReportView),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    conn: Connection,
    tab: Tab,
    members: RecordList<Member>,
    books: RecordList<Book>,
    borrows: RecordList<Borrow>,
    reports: ReportsScreen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    /// Build the app and load every table from `conn`.
    pub fn new(conn: Connection) -> Result<Self> {
        let members = RecordList::new(find_all_members(&conn)?);
        let books = RecordList::new(find_all_books(&conn)?);
        let borrows = RecordList::new(find_all_borrows(&conn)?);
        Ok(Self {
            conn,
            tab: Tab::Members,
            members,
            books,
            borrows,
            reports: ReportsScreen::default(),
            mode: Mode::Normal,
            status: None,
        })
    }

    /// Route a key press to the active mode. Returns `true` when the user asked
    /// to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::EditingMember(form) => self.handle_member_form(code, form)?,
            Mode::EditingBook(form) => self.handle_book_form(code, form)?,
            Mode::EditingBorrow(form) => self.handle_borrow_form(code, form)?,
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm)?,
            Mode::SearchingFamily(query) => self.handle_family_search(code, query)?,
            Mode::ViewingReport(view) => self.handle_report_view(code, view),
        };

        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => *exit = true,
            KeyCode::Tab => self.switch_tab(self.tab.cycle(1)),
            KeyCode::BackTab => self.switch_tab(self.tab.cycle(-1)),
            KeyCode::Char(ch @ '1'..='4') => {
                if let Some(tab) = Tab::from_digit(ch) {
                    self.switch_tab(tab);
                }
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-10),
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::Home => self.select_edge(true),
            KeyCode::End => self.select_edge(false),
            KeyCode::Char('r') => match self.reload_all() {
                Ok(()) => self.set_status("Tables reloaded.", StatusKind::Info),
                Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
            },
            KeyCode::Char('+') => return Ok(self.open_new_form()),
            KeyCode::Enter => return self.open_selected(),
            KeyCode::Char('-') => return Ok(self.confirm_delete_selected()),
            KeyCode::Char('/') if self.tab == Tab::Members => {
                self.clear_status();
                return Ok(Mode::SearchingFamily(String::new()));
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_member_form(&mut self, code: KeyCode, mut form: MemberForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Member form cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_member(&form) {
                Ok(_) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::EditingMember(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_book_form(&mut self, code: KeyCode, mut form: BookForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Book form cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_book(&form) {
                Ok(_) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::EditingBook(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    /// Borrow form keys. While a picker has suggestions open, Up/Down move the
    /// highlight, Tab accepts it and Esc only closes the list.
    fn handle_borrow_form(&mut self, code: KeyCode, mut form: BorrowForm) -> Result<Mode> {
        let suggesting = form
            .active_autocomplete()
            .map(|field| field.is_open())
            .unwrap_or(false);

        match code {
            KeyCode::Esc if suggesting => {
                if let Some(field) = form.active_autocomplete() {
                    field.dismiss();
                }
                return Ok(Mode::EditingBorrow(form));
            }
            KeyCode::Esc => {
                self.set_status("Borrow form cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Up | KeyCode::Down if suggesting => {
                if let Some(field) = form.active_autocomplete() {
                    field.move_highlight(if code == KeyCode::Up { -1 } else { 1 });
                }
                return Ok(Mode::EditingBorrow(form));
            }
            KeyCode::Tab if suggesting => {
                if let Some(field) = form.active_autocomplete() {
                    field.accept();
                }
                form.error = None;
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_borrow(&form) {
                Ok(_) => return Ok(Mode::Normal),
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        let (members, books) = self.choices();
        form.refresh_suggestions(&members, &books);
        Ok(Mode::EditingBorrow(form))
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmDelete) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let Err(err) = self.perform_delete(&confirm) {
                    self.set_status(surface_error(&err), StatusKind::Error);
                }
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmDelete(confirm)),
        }
    }

    fn handle_family_search(&mut self, code: KeyCode, mut query: String) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.clear_status();
                Ok(Mode::Normal)
            }
            KeyCode::Enter => {
                let family = query.trim();
                if family.is_empty() {
                    if let Err(err) = self.reload_members(None) {
                        self.set_status(surface_error(&err), StatusKind::Error);
                    }
                    return Ok(Mode::Normal);
                }
                match find_members_by_family(&self.conn, family) {
                    Ok(found) => {
                        let count = found.len();
                        self.members.set_rows(found);
                        self.members.select_first();
                        self.set_status(
                            format!("{count} member(s) in family {family}. Press r to show all."),
                            StatusKind::Info,
                        );
                    }
                    Err(err) => self.set_status(err.to_string(), StatusKind::Error),
                }
                Ok(Mode::Normal)
            }
            KeyCode::Backspace => {
                query.pop();
                Ok(Mode::SearchingFamily(query))
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                query.push(ch);
                Ok(Mode::SearchingFamily(query))
            }
            _ => Ok(Mode::SearchingFamily(query)),
        }
    }

    /// Report popup keys. While the filter line is focused, typing edits it;
    /// Enter keeps the filter and Esc clears it.
    fn handle_report_view(&mut self, code: KeyCode, mut view: ReportView) -> Mode {
        if view.editing_filter {
            match code {
                KeyCode::Enter => view.editing_filter = false,
                KeyCode::Esc => {
                    view.clear_filter();
                    view.editing_filter = false;
                }
                KeyCode::Backspace => view.pop_filter_char(),
                KeyCode::Up => view.move_selection(-1),
                KeyCode::Down => view.move_selection(1),
                KeyCode::Char(ch) => view.push_filter_char(ch),
                _ => {}
            }
            return Mode::ViewingReport(view);
        }

        match code {
            KeyCode::Esc | KeyCode::Char('q') => return Mode::Normal,
            KeyCode::Char('/') => view.editing_filter = true,
            KeyCode::Left => view.cycle_sort_column(-1),
            KeyCode::Right => view.cycle_sort_column(1),
            KeyCode::Char('s') => view.sort_by(view.sort_column),
            KeyCode::Up => view.move_selection(-1),
            KeyCode::Down => view.move_selection(1),
            KeyCode::PageUp => view.move_selection(-10),
            KeyCode::PageDown => view.move_selection(10),
            KeyCode::Home => view.selected = 0,
            KeyCode::End => view.select_last(),
            _ => {}
        }
        Mode::ViewingReport(view)
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_tabs(frame, chunks[0]);
        match self.tab {
            Tab::Members => self.draw_members(frame, chunks[1]),
            Tab::Books => self.draw_books(frame, chunks[1]),
            Tab::Borrows => self.draw_borrows(frame, chunks[1]),
            Tab::Reports => self.draw_report_menu(frame, chunks[1]),
        }
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::SearchingFamily(query) => self.draw_search_bar(frame, chunks[1], query),
            Mode::ViewingReport(view) => self.draw_report_view(frame, area, view),
            _ => {}
        }
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles = Tab::ALL.iter().enumerate().map(|(idx, tab)| {
            Line::from(vec![
                Span::styled(format!("{} ", idx + 1), Style::default().fg(Color::DarkGray)),
                Span::raw(tab.title()),
            ])
        });
        let tabs = Tabs::new(titles)
            .select(self.tab.index())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Library Manager"),
            )
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    /// Split an entity tab into its table and form pane.
    fn split_table_and_form(area: Rect) -> (Rect, Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);
        (chunks[0], chunks[1])
    }

    fn draw_members(&self, frame: &mut Frame, area: Rect) {
        let (table_area, form_area) = Self::split_table_and_form(area);
        let rows = self.members.rows.iter().map(Member::to_row).collect();
        draw_record_table(
            frame,
            table_area,
            "Members",
            MEMBER_HEADINGS,
            rows,
            self.members.selected,
        );

        match &self.mode {
            Mode::EditingMember(form) => {
                let title = if form.id.is_some() { "Edit Member" } else { "New Member" };
                draw_form_pane(
                    frame,
                    form_area,
                    title,
                    form.lines(),
                    form.error.as_deref(),
                    form.cursor(),
                    Vec::new(),
                );
            }
            _ => draw_idle_pane(frame, form_area, "Member"),
        }
    }

    fn draw_books(&self, frame: &mut Frame, area: Rect) {
        let (table_area, form_area) = Self::split_table_and_form(area);
        let rows = self.books.rows.iter().map(Book::to_row).collect();
        draw_record_table(
            frame,
            table_area,
            "Books",
            BOOK_HEADINGS,
            rows,
            self.books.selected,
        );

        match &self.mode {
            Mode::EditingBook(form) => {
                let title = if form.id.is_some() { "Edit Book" } else { "New Book" };
                draw_form_pane(
                    frame,
                    form_area,
                    title,
                    form.lines(),
                    form.error.as_deref(),
                    form.cursor(),
                    Vec::new(),
                );
            }
            _ => draw_idle_pane(frame, form_area, "Book"),
        }
    }

    fn draw_borrows(&self, frame: &mut Frame, area: Rect) {
        let (table_area, form_area) = Self::split_table_and_form(area);
        let rows = self.borrows.rows.iter().map(Borrow::to_row).collect();
        draw_record_table(
            frame,
            table_area,
            "Borrows",
            BORROW_HEADINGS,
            rows,
            self.borrows.selected,
        );

        let Mode::EditingBorrow(form) = &self.mode else {
            draw_idle_pane(frame, form_area, "Borrow");
            return;
        };

        let title = if form.id.is_some() { "Edit Borrow" } else { "New Borrow" };
        let mut suggestions = Vec::new();
        let open = [&form.member, &form.book]
            .into_iter()
            .find(|field| field.is_open());
        if let Some(field) = open {
            suggestions.push(Line::from(""));
            let start = field
                .highlighted
                .saturating_sub(MAX_SUGGESTIONS.saturating_sub(1));
            for (idx, suggestion) in field
                .suggestions
                .iter()
                .enumerate()
                .skip(start)
                .take(MAX_SUGGESTIONS)
            {
                let line = if idx == field.highlighted {
                    Line::from(Span::styled(
                        format!("> {suggestion}"),
                        Style::default().fg(Color::Black).bg(Color::Cyan),
                    ))
                } else {
                    Line::from(format!("  {suggestion}"))
                };
                suggestions.push(line);
            }
        }

        draw_form_pane(
            frame,
            form_area,
            title,
            form.lines(),
            form.error.as_deref(),
            form.cursor(),
            suggestions,
        );
    }

    fn draw_report_menu(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = ReportKind::ALL
            .iter()
            .map(|kind| ListItem::new(kind.title()))
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Reports"))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(self.reports.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_report_view(&self, frame: &mut Frame, area: Rect, view: &ReportView) {
        let popup_area = centered_rect(90, 80, area);
        frame.render_widget(Clear, popup_area);

        let title = format!(
            "{} ({} of {} rows) - Esc to close",
            view.table.kind.title(),
            view.visible.len(),
            view.table.rows.len()
        );
        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(0)])
            .split(inner);

        let filter_line = if view.filter.is_empty() && !view.editing_filter {
            Line::from(Span::styled(
                "Fast filter (press /)",
                Style::default().fg(Color::DarkGray),
            ))
        } else {
            let style = if view.editing_filter {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::raw("Filter: "),
                Span::styled(view.filter.clone(), style),
            ])
        };
        frame.render_widget(Paragraph::new(filter_line), chunks[0]);
        if view.editing_filter {
            let cursor_x =
                chunks[0].x + "Filter: ".len() as u16 + view.filter.chars().count() as u16;
            frame.set_cursor_position((cursor_x, chunks[0].y));
        }

        if view.visible.is_empty() {
            let paragraph = Paragraph::new("No rows.").alignment(Alignment::Center);
            frame.render_widget(paragraph, chunks[1]);
            return;
        }

        let headings = view.table.headings();
        let header = headings.iter().enumerate().map(|(idx, heading)| {
            if idx == view.sort_column {
                let arrow = if view.descending { "v" } else { "^" };
                format!("{heading} {arrow}")
            } else {
                heading.to_string()
            }
        });
        let rows = view.rows().map(|row| Row::new(row.clone()));
        let table = Table::new(rows, even_widths(headings.len()))
            .header(Row::new(header).style(Style::default().add_modifier(Modifier::BOLD)))
            .row_highlight_style(Style::default().bg(Color::DarkGray));
        let mut state = TableState::default().with_selected(Some(view.selected));
        frame.render_stateful_widget(table, chunks[1], &mut state);
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Removal")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!(
                "Remove {} {} ({})?",
                confirm.kind.noun(),
                confirm.id,
                confirm.description
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, query: &str) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Search by family");
        let paragraph = Paragraph::new(Span::raw(format!("Family: {query}")))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x + "Family: ".len() as u16 + query.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let hints: &[(&str, &str)] = match (&self.mode, self.tab) {
            (Mode::EditingBorrow(_), _) => &[
                ("[Tab]", " Accept/Next   "),
                ("[Up/Down]", " Suggestions   "),
                ("[Enter]", " Save   "),
                ("[Esc]", " Cancel"),
            ],
            (Mode::EditingMember(_) | Mode::EditingBook(_), _) => &[
                ("[Tab]", " Next field   "),
                ("[Enter]", " Save   "),
                ("[Esc]", " Cancel"),
            ],
            (Mode::ConfirmDelete(_), _) => &[("[Y]", " Confirm   "), ("[N/Esc]", " Cancel")],
            (Mode::SearchingFamily(_), _) => &[("[Enter]", " Search   "), ("[Esc]", " Cancel")],
            (Mode::ViewingReport(view), _) if view.editing_filter => &[
                ("[Enter]", " Keep filter   "),
                ("[Esc]", " Clear filter"),
            ],
            (Mode::ViewingReport(_), _) => &[
                ("[Up/Down]", " Scroll   "),
                ("[/]", " Filter   "),
                ("[Left/Right]", " Sort column   "),
                ("[s]", " Reverse   "),
                ("[Esc]", " Close"),
            ],
            (Mode::Normal, Tab::Reports) => &[
                ("[Tab/1-4]", " Switch tab   "),
                ("[Up/Down]", " Select   "),
                ("[Enter]", " Open report   "),
                ("[q]", " Quit"),
            ],
            (Mode::Normal, Tab::Members) => &[
                ("[Tab/1-4]", " Switch tab   "),
                ("[Enter]", " Edit   "),
                ("[+]", " New   "),
                ("[-]", " Delete   "),
                ("[/]", " Family   "),
                ("[r]", " Refresh   "),
                ("[q]", " Quit"),
            ],
            (Mode::Normal, _) => &[
                ("[Tab/1-4]", " Switch tab   "),
                ("[Enter]", " Edit   "),
                ("[+]", " New   "),
                ("[-]", " Delete   "),
                ("[r]", " Refresh   "),
                ("[q]", " Quit"),
            ],
        };

        Line::from(
            hints
                .iter()
                .flat_map(|(key, label)| {
                    [
                        Span::styled(key.to_string(), key_style),
                        Span::raw(label.to_string()),
                    ]
                })
                .collect::<Vec<_>>(),
        )
    }

    fn switch_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.clear_status();
    }

    fn move_selection(&mut self, offset: isize) {
        match self.tab {
            Tab::Members => self.members.move_selection(offset),
            Tab::Books => self.books.move_selection(offset),
            Tab::Borrows => self.borrows.move_selection(offset),
            Tab::Reports => self.reports.move_selection(offset),
        }
    }

    fn select_edge(&mut self, first: bool) {
        match (self.tab, first) {
            (Tab::Members, true) => self.members.select_first(),
            (Tab::Members, false) => self.members.select_last(),
            (Tab::Books, true) => self.books.select_first(),
            (Tab::Books, false) => self.books.select_last(),
            (Tab::Borrows, true) => self.borrows.select_first(),
            (Tab::Borrows, false) => self.borrows.select_last(),
            (Tab::Reports, true) => self.reports.selected = 0,
            (Tab::Reports, false) => self.reports.select_last(),
        }
    }

    fn open_new_form(&mut self) -> Mode {
        self.clear_status();
        match self.tab {
            Tab::Members => Mode::EditingMember(MemberForm::default()),
            Tab::Books => Mode::EditingBook(BookForm::default()),
            Tab::Borrows => {
                let mut form = BorrowForm::default();
                let (members, books) = self.choices();
                form.refresh_suggestions(&members, &books);
                Mode::EditingBorrow(form)
            }
            Tab::Reports => Mode::Normal,
        }
    }

    /// Enter in normal mode: load the highlighted row into its form, or run the
    /// highlighted report.
    fn open_selected(&mut self) -> Result<Mode> {
        self.clear_status();
        let mode = match self.tab {
            Tab::Members => self
                .members
                .current()
                .map(|member| Mode::EditingMember(MemberForm::from_member(member))),
            Tab::Books => self
                .books
                .current()
                .map(|book| Mode::EditingBook(BookForm::from_book(book))),
            Tab::Borrows => self.borrows.current().map(|borrow| {
                Mode::EditingBorrow(BorrowForm::from_borrow(
                    borrow,
                    &self.members.rows,
                    &self.books.rows,
                ))
            }),
            Tab::Reports => {
                let kind = self.reports.current();
                return match report(&self.conn, kind) {
                    Ok(table) => Ok(Mode::ViewingReport(ReportView::new(table))),
                    Err(err) => {
                        self.set_status(err.to_string(), StatusKind::Error);
                        Ok(Mode::Normal)
                    }
                };
            }
        };

        match mode {
            Some(mode) => Ok(mode),
            None => {
                self.set_status(
                    format!("No {} selected.", self.tab.title().to_lowercase()),
                    StatusKind::Error,
                );
                Ok(Mode::Normal)
            }
        }
    }

    fn confirm_delete_selected(&mut self) -> Mode {
        let confirm = match self.tab {
            Tab::Members => self.members.current().map(|member| ConfirmDelete {
                kind: RecordKind::Member,
                id: member.id,
                description: member.to_string(),
            }),
            Tab::Books => self.books.current().map(|book| ConfirmDelete {
                kind: RecordKind::Book,
                id: book.id,
                description: book.to_string(),
            }),
            Tab::Borrows => self.borrows.current().map(|borrow| ConfirmDelete {
                kind: RecordKind::Borrow,
                id: borrow.id,
                description: format!(
                    "book {} to member {}",
                    borrow.book_id, borrow.member_id
                ),
            }),
            Tab::Reports => return Mode::Normal,
        };

        match confirm {
            Some(confirm) => Mode::ConfirmDelete(confirm),
            None => {
                self.set_status(
                    format!("No {} selected.", self.tab.title().to_lowercase()),
                    StatusKind::Error,
                );
                Mode::Normal
            }
        }
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    /// Autocomplete labels for the borrow form's pickers.
    fn choices(&self) -> (Vec<String>, Vec<String>) {
        (
            self.members.rows.iter().map(Member::choice_label).collect(),
            self.books.rows.iter().map(Book::choice_label).collect(),
        )
    }

    fn save_member(&mut self, form: &MemberForm) -> Result<()> {
        let (name, family) = form.parse_inputs()?;
        let member = match form.id {
            Some(id) => edit_member(&self.conn, id, &name, &family)?,
            None => add_member(&self.conn, &name, &family)?,
        };
        self.reload_members(Some(member.id))?;
        let verb = if form.id.is_some() { "Updated" } else { "Added" };
        self.set_status(format!("{verb} member {member}."), StatusKind::Info);
        Ok(())
    }

    fn save_book(&mut self, form: &BookForm) -> Result<()> {
        let (title, author, pages) = form.parse_inputs()?;
        let book = match form.id {
            Some(id) => edit_book(&self.conn, id, &title, &author, pages)?,
            None => add_book(&self.conn, &title, &author, pages)?,
        };
        self.reload_books(Some(book.id))?;
        let verb = if form.id.is_some() { "Updated" } else { "Added" };
        self.set_status(format!("{verb} book {book}."), StatusKind::Info);
        Ok(())
    }

    fn save_borrow(&mut self, form: &BorrowForm) -> Result<()> {
        let inputs = form.parse_inputs(today())?;
        let borrow = match form.id {
            Some(id) => edit_borrow(
                &self.conn,
                id,
                inputs.member_id,
                inputs.book_id,
                inputs.borrow_date,
                inputs.return_date,
            )?,
            None => add_borrow(
                &self.conn,
                inputs.member_id,
                inputs.book_id,
                inputs.borrow_date,
                inputs.return_date,
            )?,
        };
        self.reload_borrows(Some(borrow.id))?;
        let verb = if form.id.is_some() { "Updated" } else { "Added" };
        self.set_status(format!("{verb} borrow {}.", borrow.id), StatusKind::Info);
        Ok(())
    }

    fn perform_delete(&mut self, confirm: &ConfirmDelete) -> Result<()> {
        match confirm.kind {
            RecordKind::Member => {
                remove_member_by_id(&self.conn, confirm.id)?;
                self.reload_members(None)?;
            }
            RecordKind::Book => {
                remove_book_by_id(&self.conn, confirm.id)?;
                self.reload_books(None)?;
            }
            RecordKind::Borrow => {
                remove_borrow_by_id(&self.conn, confirm.id)?;
                self.reload_borrows(None)?;
            }
        }
        self.set_status(
            format!("Removed {} {}.", confirm.kind.noun(), confirm.id),
            StatusKind::Info,
        );
        Ok(())
    }

    fn reload_members(&mut self, focus_id: Option<i64>) -> Result<()> {
        self.members.set_rows(find_all_members(&self.conn)?);
        if let Some(id) = focus_id {
            self.members.focus(|m| m.id == id);
        }
        Ok(())
    }

    fn reload_books(&mut self, focus_id: Option<i64>) -> Result<()> {
        self.books.set_rows(find_all_books(&self.conn)?);
        if let Some(id) = focus_id {
            self.books.focus(|b| b.id == id);
        }
        Ok(())
    }

    fn reload_borrows(&mut self, focus_id: Option<i64>) -> Result<()> {
        self.borrows.set_rows(find_all_borrows(&self.conn)?);
        if let Some(id) = focus_id {
            self.borrows.focus(|b| b.id == id);
        }
        Ok(())
    }

    fn reload_all(&mut self) -> Result<()> {
        self.reload_members(None)?;
        self.reload_books(None)?;
        self.reload_borrows(None)
    }
}

fn draw_record_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    headings: &[&str],
    rows: Vec<Vec<String>>,
    selected: usize,
) {
    let block = Block::default()
        .title(format!("{title} ({})", rows.len()))
        .borders(Borders::ALL);

    if rows.is_empty() {
        let message = Paragraph::new("Nothing here yet. Press '+' to add one.")
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(message, area);
        return;
    }

    let table = Table::new(rows.into_iter().map(Row::new), even_widths(headings.len()))
        .header(
            Row::new(headings.iter().copied())
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(block)
        .row_highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    let mut state = TableState::default().with_selected(Some(selected));
    frame.render_stateful_widget(table, area, &mut state);
}

/// Render a form in the side pane: the field lines, then the error or help
/// line, then `extra`. `cursor` is the active field's row and column.
fn draw_form_pane(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    mut lines: Vec<Line<'static>>,
    error: Option<&str>,
    cursor: (u16, usize),
    extra: Vec<Line<'static>>,
) {
    frame.render_widget(Clear, area);
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    frame.render_widget(block.clone(), area);
    let inner = block.inner(area);

    lines.push(Line::from(""));
    match error {
        Some(error) => lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        ))),
        None => lines.push(Line::from(Span::styled(
            "Enter to save, Tab to switch, Esc to cancel",
            Style::default().fg(Color::Gray),
        ))),
    }
    lines.extend(extra);

    frame.render_widget(Paragraph::new(lines), inner);

    let (row, col) = cursor;
    let x = inner.x + (col as u16).min(inner.width.saturating_sub(1));
    frame.set_cursor_position((x, inner.y + row));
}

fn draw_idle_pane(frame: &mut Frame, area: Rect, noun: &str) {
    let lines = vec![
        Line::from(format!("Press '+' to add a {}.", noun.to_lowercase())),
        Line::from("Press Enter to edit the selected row."),
    ];
    let paragraph = Paragraph::new(lines)
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true })
        .block(Block::default().title(noun.to_string()).borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::books::add_book;
    use crate::controller::borrows::add_borrow;
    use crate::controller::members::add_member;
    use crate::db::open_in_memory;
    use crate::ui::forms::BorrowField;
    use chrono::NaiveDate;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn seeded_app() -> App {
        let conn = open_in_memory().unwrap();
        add_member(&conn, "Ada", "Lovelace").unwrap();
        add_book(&conn, "Dune", "Frank Herbert", 412).unwrap();
        App::new(conn).unwrap()
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(code).unwrap()
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn status_is_error(app: &App) -> bool {
        matches!(
            app.status,
            Some(StatusMessage {
                kind: StatusKind::Error,
                ..
            })
        )
    }

    #[test]
    fn tabs_switch_by_key_and_digit() {
        let mut app = seeded_app();
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.tab, Tab::Reports);
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.tab, Tab::Books);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.tab, Tab::Borrows);
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn adding_a_member_through_the_form() {
        let mut app = App::new(open_in_memory().unwrap()).unwrap();
        press(&mut app, KeyCode::Char('+'));
        type_text(&mut app, "Grace");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Hopper");
        press(&mut app, KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.members.rows.len(), 1);
        assert_eq!(app.members.rows[0].family, "Hopper");
    }

    #[test]
    fn invalid_member_keeps_the_form_open() {
        let mut app = App::new(open_in_memory().unwrap()).unwrap();
        press(&mut app, KeyCode::Char('+'));
        type_text(&mut app, "G");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Hopper");
        press(&mut app, KeyCode::Enter);

        match &app.mode {
            Mode::EditingMember(form) => assert_eq!(form.error.as_deref(), Some("Invalid name!")),
            _ => panic!("form should stay open"),
        }
        assert!(status_is_error(&app));
        assert!(app.members.rows.is_empty());
    }

    #[test]
    fn editing_a_book_keeps_its_id() {
        let mut app = seeded_app();
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "500");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.books.rows.len(), 1);
        assert_eq!(app.books.rows[0].pages, 500);
    }

    #[test]
    fn borrow_form_picks_through_autocomplete() {
        let mut app = seeded_app();
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Char('+'));
        match &app.mode {
            Mode::EditingBorrow(form) => assert!(form.member.is_open()),
            _ => panic!("borrow form should be open"),
        }

        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.borrows.rows.len(), 1);
        let borrow = &app.borrows.rows[0];
        assert_eq!((borrow.member_id, borrow.book_id), (1, 1));
        assert_eq!(borrow.borrow_date, today());
        assert_eq!(borrow.return_date, None);
    }

    #[test]
    fn tab_moves_on_after_accepting_a_shared_title() {
        let conn = open_in_memory().unwrap();
        add_member(&conn, "Ada", "Lovelace").unwrap();
        for _ in 0..11 {
            add_book(&conn, "Dune", "Frank Herbert", 412).unwrap();
        }
        let mut app = App::new(conn).unwrap();

        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Char('+'));
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);

        match &app.mode {
            Mode::EditingBorrow(form) => {
                assert!(form.active == BorrowField::BorrowDate);
                assert_eq!(form.book.text, "1-Dune by Frank Herbert");
                assert!(!form.book.is_open());
            }
            _ => panic!("borrow form should be open"),
        }
    }

    #[test]
    fn removing_a_member_with_history_is_refused() {
        let conn = open_in_memory().unwrap();
        let member = add_member(&conn, "Ada", "Lovelace").unwrap();
        let book = add_book(&conn, "Dune", "Frank Herbert", 412).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        add_borrow(&conn, member.id, book.id, date, None).unwrap();
        let mut app = App::new(conn).unwrap();

        press(&mut app, KeyCode::Char('-'));
        assert!(matches!(app.mode, Mode::ConfirmDelete(_)));
        press(&mut app, KeyCode::Char('y'));

        assert!(matches!(app.mode, Mode::Normal));
        assert!(status_is_error(&app));
        assert_eq!(app.members.rows.len(), 1);
    }

    #[test]
    fn deleting_a_book_after_confirmation() {
        let mut app = seeded_app();
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('-'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.books.rows.len(), 1);

        press(&mut app, KeyCode::Char('-'));
        press(&mut app, KeyCode::Enter);
        assert!(app.books.rows.is_empty());
    }

    #[test]
    fn family_search_filters_members() {
        let conn = open_in_memory().unwrap();
        add_member(&conn, "Ada", "Lovelace").unwrap();
        add_member(&conn, "Alan", "Turing").unwrap();
        let mut app = App::new(conn).unwrap();

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "Turing");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.members.rows.len(), 1);
        assert_eq!(app.members.rows[0].name, "Alan");

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "Nobody");
        press(&mut app, KeyCode::Enter);
        assert!(status_is_error(&app));
        assert_eq!(app.members.rows.len(), 1);

        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.members.rows.len(), 2);
    }

    #[test]
    fn reload_failures_stay_in_the_status_bar() {
        let mut app = seeded_app();
        app.conn.execute("DROP TABLE borrows", []).unwrap();

        assert!(!press(&mut app, KeyCode::Char('r')));
        assert!(status_is_error(&app));
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.members.rows.len(), 1);
    }

    #[test]
    fn reports_open_and_close() {
        let mut app = seeded_app();
        press(&mut app, KeyCode::Char('4'));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        match &app.mode {
            Mode::ViewingReport(view) => {
                assert_eq!(view.table.kind.title(), "Books Never Borrowed");
                assert_eq!(view.table.rows.len(), 1);
            }
            _ => panic!("report should be open"),
        }
        press(&mut app, KeyCode::Esc);
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn report_popup_filters_and_sorts_from_the_keyboard() {
        let conn = open_in_memory().unwrap();
        add_book(&conn, "Dune", "Frank Herbert", 412).unwrap();
        add_book(&conn, "Emma", "Jane Austen", 474).unwrap();
        add_book(&conn, "Persuasion", "Jane Austen", 249).unwrap();
        let mut app = App::new(conn).unwrap();

        press(&mut app, KeyCode::Char('4'));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "austen");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('s'));

        match &app.mode {
            Mode::ViewingReport(view) => {
                assert!(!view.editing_filter);
                assert_eq!(view.filter, "austen");
                assert!(view.descending);
                let ids: Vec<_> = view.rows().map(|row| row[0].as_str()).collect();
                assert_eq!(ids, vec!["3", "2"]);
            }
            _ => panic!("report should be open"),
        }

        // Typing `q` in the filter must not close the popup.
        press(&mut app, KeyCode::Char('/'));
        press(&mut app, KeyCode::Char('q'));
        assert!(matches!(app.mode, Mode::ViewingReport(_)));
        press(&mut app, KeyCode::Esc);
        match &app.mode {
            Mode::ViewingReport(view) => assert_eq!(view.rows().count(), 3),
            _ => panic!("report should stay open"),
        }
    }

    #[test]
    fn every_screen_renders() {
        let mut app = seeded_app();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        for key in [
            KeyCode::Char('1'),
            KeyCode::Char('+'),
            KeyCode::Esc,
            KeyCode::Char('2'),
            KeyCode::Enter,
            KeyCode::Esc,
            KeyCode::Char('3'),
            KeyCode::Char('+'),
            KeyCode::Esc,
            KeyCode::Esc,
            KeyCode::Char('4'),
            KeyCode::Enter,
            KeyCode::Char('/'),
            KeyCode::Char('a'),
            KeyCode::Right,
        ] {
            press(&mut app, key);
            terminal.draw(|frame| app.draw(frame)).unwrap();
        }
    }
}
