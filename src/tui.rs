//! Interactive job browser: a filterable table of postings with a detail pane.
//!
//! The whole catalog is listed until a filter is touched. From then on the
//! full criteria apply, salary band included, until `x` clears them.
//! Owners can close a posting with `c`.

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Row, Table, TableState},
};
use std::io::stdout;

use crate::board::Board;
use crate::filters::FilterCriteria;
use crate::models::{ApplicationStatus, Job, JobCategory};
use crate::wallet::short_address;

const HELP: &str =
    " j/k move  J/K scroll  / search  t category  o open only  x clear  c close  q quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Browser {
    criteria: FilterCriteria,
    /// Whether `criteria` applies; off until a filter is first changed.
    active: bool,
    open_only: bool,
    /// Ids of the jobs passing the current filter, in catalog order.
    visible: Vec<i64>,
    table: TableState,
    detail_scroll: u16,
    mode: Mode,
    message: Option<String>,
}

impl Browser {
    fn new(criteria: Option<FilterCriteria>, board: &Board) -> Self {
        let mut browser = Self {
            active: criteria.is_some(),
            criteria: criteria.unwrap_or_default(),
            open_only: false,
            visible: Vec::new(),
            table: TableState::default(),
            detail_scroll: 0,
            mode: Mode::Browse,
            message: None,
        };
        browser.refresh(board);
        browser
    }

    /// Re-applies the filter, keeping the selected job selected when it is still visible.
    fn refresh(&mut self, board: &Board) {
        let keep = self.selected_id();
        self.visible = board
            .jobs
            .jobs()
            .iter()
            .filter(|job| !self.active || self.criteria.matches(job))
            .filter(|job| !self.open_only || job.is_open)
            .map(|job| job.id)
            .collect();
        let index = keep
            .and_then(|id| self.visible.iter().position(|v| *v == id))
            .or(if self.visible.is_empty() { None } else { Some(0) });
        if index != self.table.selected() {
            self.detail_scroll = 0;
        }
        self.table.select(index);
    }

    fn selected_id(&self) -> Option<i64> {
        self.table
            .selected()
            .and_then(|i| self.visible.get(i).copied())
    }

    fn move_by(&mut self, delta: isize) {
        let Some(last) = self.visible.len().checked_sub(1) else {
            return;
        };
        let current = self.table.selected().unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(last);
        if Some(next) != self.table.selected() {
            self.table.select(Some(next));
            self.detail_scroll = 0;
            self.message = None;
        }
    }

    /// No category, then each category in turn, then back to none.
    fn cycle_category(&mut self) {
        let next = match self.criteria.categories.as_slice() {
            [] => Some(JobCategory::ALL[0]),
            [current] => JobCategory::ALL
                .iter()
                .position(|c| c == current)
                .and_then(|i| JobCategory::ALL.get(i + 1))
                .copied(),
            _ => None,
        };
        self.criteria.categories = next.into_iter().collect();
    }

    fn close_selected(&mut self, board: &mut Board) {
        let Some(id) = self.selected_id() else {
            return;
        };
        let message = match board.close_job(id) {
            Ok(()) => {
                self.refresh(board);
                format!("Closed job #{}", id)
            }
            Err(e) => e.to_string(),
        };
        self.message = Some(message);
    }

    fn handle_key(&mut self, key: KeyEvent, board: &mut Board) -> Flow {
        match self.mode {
            Mode::Search => match key.code {
                KeyCode::Enter | KeyCode::Esc => self.mode = Mode::Browse,
                KeyCode::Backspace => {
                    self.criteria.search_term.pop();
                    self.active = true;
                    self.refresh(board);
                }
                KeyCode::Char(c) => {
                    self.criteria.search_term.push(c);
                    self.active = true;
                    self.refresh(board);
                }
                _ => {}
            },
            Mode::Browse => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Flow::Quit,
                KeyCode::Down | KeyCode::Char('j') => self.move_by(1),
                KeyCode::Up | KeyCode::Char('k') => self.move_by(-1),
                KeyCode::PageDown | KeyCode::Char('J') => {
                    self.detail_scroll = self.detail_scroll.saturating_add(3)
                }
                KeyCode::PageUp | KeyCode::Char('K') => {
                    self.detail_scroll = self.detail_scroll.saturating_sub(3)
                }
                KeyCode::Char('/') => {
                    self.mode = Mode::Search;
                    self.message = None;
                }
                KeyCode::Char('t') => {
                    self.cycle_category();
                    self.active = true;
                    self.refresh(board);
                }
                KeyCode::Char('x') => {
                    self.criteria = FilterCriteria::default();
                    self.active = false;
                    self.refresh(board);
                }
                KeyCode::Char('o') => {
                    self.open_only = !self.open_only;
                    self.refresh(board);
                }
                KeyCode::Char('c') => self.close_selected(board),
                _ => {}
            },
        }
        Flow::Continue
    }

    fn filter_summary(&self) -> String {
        if !self.active {
            return format!("all jobs{}", if self.open_only { "  open only" } else { "" });
        }
        let category = match self.criteria.categories.as_slice() {
            [] => "any".to_string(),
            cats => cats
                .iter()
                .map(|c| c.label())
                .collect::<Vec<_>>()
                .join(", "),
        };
        let (lo, hi) = self.criteria.salary_range;
        format!(
            "category: {}  salary: {}k-{}k{}",
            category,
            lo,
            hi,
            if self.open_only { "  open only" } else { "" }
        )
    }
}

pub fn run_browse(board: &mut Board, criteria: Option<&FilterCriteria>) -> Result<()> {
    if board.jobs.jobs().is_empty() {
        println!("No jobs found.");
        return Ok(());
    }
    let mut browser = Browser::new(criteria.cloned(), board);

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = event_loop(&mut terminal, &mut browser, board);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    browser: &mut Browser,
    board: &mut Board,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, browser, board))?;
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind == KeyEventKind::Press && browser.handle_key(key, board) == Flow::Quit {
            return Ok(());
        }
    }
}

fn render(frame: &mut Frame, browser: &mut Browser, board: &Board) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[1]);

    let cursor = if browser.mode == Mode::Search { "_" } else { "" };
    let search = Paragraph::new(vec![
        Line::from(format!("Search: {}{}", browser.criteria.search_term, cursor)),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", browser.filter_summary())),
    );
    frame.render_widget(search, rows[0]);

    let table_rows: Vec<Row> = browser
        .visible
        .iter()
        .filter_map(|id| board.jobs.job(*id))
        .map(|job| {
            let row = Row::new(vec![
                job.id.to_string(),
                job.title.clone(),
                job.company.clone(),
                board.jobs.job_applications(job.id).len().to_string(),
            ]);
            if job.is_open {
                row
            } else {
                row.style(Style::default().fg(Color::DarkGray))
            }
        })
        .collect();
    let table = Table::new(
        table_rows,
        [
            Constraint::Length(4),
            Constraint::Fill(2),
            Constraint::Fill(1),
            Constraint::Length(4),
        ],
    )
    .header(Row::new(vec!["#", "Title", "Company", "Apps"]).style(Style::default().bold()))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Jobs ({}) ", browser.visible.len())),
    )
    .row_highlight_style(Style::default().bg(Color::DarkGray).bold())
    .highlight_symbol("> ");
    frame.render_stateful_widget(table, panes[0], &mut browser.table);

    let width = panes[1].width.saturating_sub(2).max(20) as usize;
    let detail = match browser.selected_id().and_then(|id| board.jobs.job(id)) {
        Some(job) => job_detail(job, board, width),
        None => vec![Line::from("No job matches the filter")],
    };
    let detail = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .scroll((browser.detail_scroll, 0));
    frame.render_widget(detail, panes[1]);

    let footer = match (&browser.message, browser.mode) {
        (Some(message), _) => format!(" {}", message),
        (None, Mode::Search) => " type to search, Enter to finish".to_string(),
        (None, Mode::Browse) => HELP.to_string(),
    };
    frame.render_widget(
        Paragraph::new(footer).style(Style::default().fg(Color::DarkGray)),
        rows[2],
    );
}

fn field(name: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<10}", name), Style::default().fg(Color::DarkGray)),
        Span::raw(value),
    ])
}

fn job_detail(job: &Job, board: &Board, width: usize) -> Vec<Line<'static>> {
    let status = if job.is_open {
        Span::styled("open", Style::default().fg(Color::Green))
    } else {
        Span::styled("closed", Style::default().fg(Color::Red))
    };

    let mut lines = vec![
        Line::styled(job.title.clone(), Style::default().bold()),
        Line::from(format!("{} · {}", job.company, job.location)),
        Line::default(),
        Line::from(vec![
            Span::styled(format!("{:<10}", "Status"), Style::default().fg(Color::DarkGray)),
            status,
        ]),
        field("Category", job.category.to_string()),
        field("Salary", job.salary.clone()),
        field("Employer", short_address(&job.employer)),
    ];
    if let Some(posted) = job.posted_at {
        lines.push(field("Posted", posted.to_string()));
    }
    lines.push(Line::default());
    lines.extend(
        textwrap::wrap(&job.description, width)
            .into_iter()
            .map(|line| Line::from(line.into_owned())),
    );
    lines.push(Line::default());

    // Applicants are only listed to the job's owner.
    match board.applications_for(job.id) {
        Ok(applications) => {
            lines.push(Line::styled(
                format!("Applications ({})", applications.len()),
                Style::default().bold(),
            ));
            for app in applications {
                let color = match app.status {
                    ApplicationStatus::Pending => Color::Yellow,
                    ApplicationStatus::Accepted => Color::Green,
                    ApplicationStatus::Rejected => Color::Red,
                };
                lines.push(Line::from(vec![
                    Span::raw(format!("  #{:<4} {:<20} ", app.id, app.applicant_name)),
                    Span::styled(app.status.to_string(), Style::default().fg(color)),
                ]));
            }
        }
        Err(_) if board.session.current_user().is_none() => lines.push(Line::styled(
            "Sign in to apply for this job",
            Style::default().fg(Color::DarkGray),
        )),
        Err(_) => lines.push(field(
            "Applied",
            board.jobs.job_applications(job.id).len().to_string(),
        )),
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Capabilities;
    use crate::capabilities::{LoggingLedger, MockArtifactStore, MockWallet};
    use crate::repository::{KeyValueStore, MemoryStore};
    use crossterm::event::KeyModifiers;
    use std::rc::Rc;

    fn board() -> Board {
        let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::default());
        Board::open(
            store.clone(),
            Capabilities {
                wallet: Some(Box::new(MockWallet::new(store))),
                artifacts: Box::new(MockArtifactStore),
                ledger: Box::new(LoggingLedger),
            },
        )
        .unwrap()
    }

    fn press(browser: &mut Browser, board: &mut Board, code: KeyCode) -> Flow {
        browser.handle_key(KeyEvent::new(code, KeyModifiers::NONE), board)
    }

    #[test]
    fn test_starts_on_first_visible_job() {
        let board = board();
        let browser = Browser::new(None, &board);
        assert_eq!(browser.visible.len(), 6);
        assert_eq!(browser.selected_id(), Some(browser.visible[0]));
    }

    #[test]
    fn test_navigation_stays_in_bounds() {
        let mut board = board();
        let mut browser = Browser::new(None, &board);
        press(&mut browser, &mut board, KeyCode::Char('k'));
        assert_eq!(browser.table.selected(), Some(0));
        for _ in 0..10 {
            press(&mut browser, &mut board, KeyCode::Char('j'));
        }
        assert_eq!(browser.table.selected(), Some(5));
    }

    #[test]
    fn test_search_mode_filters_live() {
        let mut board = board();
        let mut browser = Browser::new(None, &board);
        press(&mut browser, &mut board, KeyCode::Char('/'));
        for c in "nft".chars() {
            press(&mut browser, &mut board, KeyCode::Char(c));
        }
        assert_eq!(browser.mode, Mode::Search);
        assert_eq!(browser.visible, vec![2]);

        // q is text while searching
        assert_eq!(press(&mut browser, &mut board, KeyCode::Char('q')), Flow::Continue);
        press(&mut browser, &mut board, KeyCode::Backspace);
        press(&mut browser, &mut board, KeyCode::Enter);
        assert_eq!(browser.mode, Mode::Browse);
        assert_eq!(press(&mut browser, &mut board, KeyCode::Char('q')), Flow::Quit);
    }

    #[test]
    fn test_filters_inactive_until_touched_and_cleared_with_x() {
        let mut board = board();
        let band = FilterCriteria {
            salary_range: (0, 10),
            ..Default::default()
        };
        let mut browser = Browser::new(Some(band), &board);
        assert!(browser.visible.is_empty());

        press(&mut browser, &mut board, KeyCode::Char('x'));
        assert_eq!(browser.visible.len(), 6);
        assert!(browser.filter_summary().starts_with("all jobs"));

        // cycling the category switches filtering on with the default band
        press(&mut browser, &mut board, KeyCode::Char('t'));
        assert_eq!(browser.visible, vec![1, 6]);
    }

    #[test]
    fn test_category_cycle_wraps_to_none() {
        let board = board();
        let mut browser = Browser::new(None, &board);
        browser.cycle_category();
        assert_eq!(browser.criteria.categories, vec![JobCategory::Development]);
        for _ in 1..JobCategory::ALL.len() {
            browser.cycle_category();
        }
        assert_eq!(browser.criteria.categories, vec![JobCategory::Community]);
        browser.cycle_category();
        assert!(browser.criteria.categories.is_empty());
    }

    #[test]
    fn test_closing_someone_elses_job_reports_error() {
        let mut board = board();
        let mut browser = Browser::new(None, &board);
        press(&mut browser, &mut board, KeyCode::Char('c'));
        assert_eq!(
            browser.message.as_deref(),
            Some("Please sign in to close a job")
        );
        assert!(board.jobs.jobs().iter().all(|j| j.is_open));
    }

    #[test]
    fn test_open_only_hides_closed_jobs() {
        let mut board = board();
        board
            .sign_up(&crate::forms::SignUpForm {
                email: "emp@example.com".to_string(),
                password: "pw".to_string(),
                name: "Emp".to_string(),
            })
            .unwrap();
        board.connect_wallet().unwrap();
        let job = board
            .post_job(crate::forms::JobForm {
                title: "Indexer".to_string(),
                company: "Graph".to_string(),
                location: "Remote".to_string(),
                salary: "100,000".to_string(),
                description: "Index".to_string(),
                ..Default::default()
            })
            .unwrap();

        let mut browser = Browser::new(None, &board);
        assert_eq!(browser.selected_id(), Some(job.id));
        press(&mut browser, &mut board, KeyCode::Char('c'));
        assert_eq!(browser.message.as_deref(), Some("Closed job #7"));

        press(&mut browser, &mut board, KeyCode::Char('o'));
        assert!(!browser.visible.contains(&job.id));
        assert_eq!(browser.visible.len(), 6);
    }
}
