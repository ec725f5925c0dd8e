use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::db::Database;
use crate::models::{Candidate, CandidateFilter, Reference, TrackingUpdate, WorkExperience};

struct AppState {
    candidates: Vec<Candidate>,
    selected: usize,
    scroll_offset: u16,
    school: Option<String>,
    experiences: Vec<WorkExperience>,
    references: Vec<Reference>,
    status: Option<String>,
}

impl AppState {
    fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            selected: 0,
            scroll_offset: 0,
            school: None,
            experiences: Vec::new(),
            references: Vec::new(),
            status: None,
        }
    }

    fn current(&self) -> Option<&Candidate> {
        self.candidates.get(self.selected)
    }

    fn load_related(&mut self, db: &Database) {
        let Some(candidate) = self.current() else { return };
        let id = candidate.id;
        let school_id = candidate.details.school_id;

        self.school = school_id
            .and_then(|sid| db.get_school(sid).ok().flatten())
            .map(|s| s.name);

        let mut experiences = db.list_work_experiences_for(id).unwrap_or_default();
        for linked in db.linked_work_experiences(id).unwrap_or_default() {
            if !experiences.iter().any(|e| e.id == linked.id) {
                experiences.push(linked);
            }
        }
        self.experiences = experiences;

        let mut references = db.list_references_for(id).unwrap_or_default();
        for linked in db.linked_references(id).unwrap_or_default() {
            if !references.iter().any(|r| r.id == linked.id) {
                references.push(linked);
            }
        }
        self.references = references;
    }

    fn next(&mut self) {
        if !self.candidates.is_empty() && self.selected < self.candidates.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    /// Flip one tracking flag in storage and reload the row.
    fn toggle(&mut self, db: &Database, flag: impl Fn(&Candidate) -> TrackingUpdate) {
        let Some(candidate) = self.current() else { return };
        let id = candidate.id;
        let update = flag(candidate);
        if let Err(e) = db.set_tracking(id, &update) {
            tracing::warn!(candidate_id = id, error = %e, "tracking update failed");
            self.status = Some(format!("Update failed: {}", e));
            return;
        }
        match db.get_candidate(id) {
            Ok(Some(fresh)) => self.candidates[self.selected] = fresh,
            Ok(None) => self.status = Some(format!("Candidate #{} no longer exists", id)),
            Err(e) => self.status = Some(format!("Reload failed: {}", e)),
        }
    }
}

pub fn run_browse(db: &Database, filter: &CandidateFilter) -> Result<()> {
    let candidates = db.list_candidates(filter)?;
    if candidates.is_empty() {
        println!("No candidates found.");
        return Ok(());
    }

    let mut state = AppState::new(candidates);
    state.load_related(db);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, db);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    db: &Database,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let prev_selected = state.selected;
            state.status = None;
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('r') => state.toggle(db, |c| TrackingUpdate {
                    resume_received: Some(!c.details.resume_received),
                    ..Default::default()
                }),
                KeyCode::Char('c') => state.toggle(db, |c| TrackingUpdate {
                    references_checked: Some(!c.details.references_checked),
                    ..Default::default()
                }),
                KeyCode::Char('b') => state.toggle(db, |c| TrackingUpdate {
                    background_check_completed: Some(!c.details.background_check_completed),
                    ..Default::default()
                }),
                KeyCode::Char('p') => state.toggle(db, |c| TrackingUpdate {
                    data_processing_consent: Some(!c.details.data_processing_consent),
                    ..Default::default()
                }),
                KeyCode::Char('l') => state.toggle(db, |c| TrackingUpdate {
                    relocation_willingness: Some(!c.details.relocation_willingness),
                    ..Default::default()
                }),
                _ => {}
            }
            if state.selected != prev_selected {
                list_state.select(Some(state.selected));
                state.load_related(db);
            }
        }
    }
    Ok(())
}

fn progress_icon(candidate: &Candidate) -> &'static str {
    let d = &candidate.details;
    match (d.resume_received, d.references_checked, d.background_check_completed) {
        (true, true, true) => "+",
        (false, false, false) => " ",
        _ => "*",
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(frame.area());

    // Left panel: candidate list
    let items: Vec<ListItem> = state
        .candidates
        .iter()
        .map(|c| {
            ListItem::new(format!(
                "{} #{:<4} {} | {}",
                progress_icon(c),
                c.id,
                c,
                c.details.job_type
            ))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Candidates ({}) ",
            state.candidates.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: candidate detail
    let detail = build_detail(state);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer help
    let help_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let help = match &state.status {
        Some(status) => Paragraph::new(format!(" {}", status)).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(
            " j/k:navigate  J/K:scroll  r:resume c:refs checked b:background p:consent l:relocate  q:quit",
        )
        .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(help, help_area[1]);
}

fn flag_line(label: &str, value: bool) -> Line<'static> {
    let (mark, style) = if value {
        ("[x]", Style::default().fg(Color::Green))
    } else {
        ("[ ]", Style::default().fg(Color::DarkGray))
    };
    Line::from(vec![
        Span::styled(format!("  {} ", mark), style),
        Span::raw(label.to_string()),
    ])
}

fn heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
}

fn build_detail(state: &AppState) -> Text<'static> {
    let Some(candidate) = state.current() else {
        return Text::raw("No candidate selected");
    };
    let d = &candidate.details;

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        candidate.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("{} ({} preferred)", d.email, d.preferred_contact_method)));
    if let Some(phone) = &d.phone_number {
        lines.push(Line::from(format!("Phone: {}", phone)));
    }
    lines.push(Line::from(format!(
        "{}, {}, {} {}, {}",
        d.address, d.city, d.state, d.zip_code, d.country
    )));
    lines.push(Line::from(""));

    lines.push(heading("Education"));
    let school = state.school.as_deref().unwrap_or("(no accredited school)");
    lines.push(Line::from(format!(
        "  {} in {}, {} ({})",
        d.education_level, d.degree, school, d.graduation_year
    )));
    lines.push(Line::from(""));

    lines.push(heading("Preferences"));
    lines.push(Line::from(format!(
        "  {} | {} | {}",
        d.job_type, d.area_preference, d.industry_preference
    )));
    if let Some(salary) = &d.salary_expectation {
        lines.push(Line::from(format!("  Salary expectation: {}", salary)));
    }
    let until = d
        .available_end_date
        .map(|end| format!(" until {}", end))
        .unwrap_or_default();
    lines.push(Line::from(format!("  Available from {}{}", d.available_start_date, until)));
    lines.push(Line::from(""));

    lines.push(heading("Tracking"));
    lines.push(flag_line("Resume received", d.resume_received));
    lines.push(flag_line("References checked", d.references_checked));
    lines.push(flag_line("Background check completed", d.background_check_completed));
    lines.push(flag_line("Data processing consent", d.data_processing_consent));
    lines.push(flag_line("Willing to relocate", d.relocation_willingness));
    lines.push(Line::from(""));

    lines.push(heading("Skills"));
    for line in textwrap::fill(&d.skills, 70).lines() {
        lines.push(Line::from(format!("  {}", line)));
    }
    lines.push(Line::from(""));

    if !state.experiences.is_empty() {
        lines.push(heading("Work Experiences"));
        for we in &state.experiences {
            let end = we
                .end_date
                .map(|e| e.to_string())
                .unwrap_or_else(|| "present".to_string());
            let shared = if we.candidate_id == candidate.id { "" } else { " (linked)" };
            lines.push(Line::from(format!("  {} ({} - {}){}", we, we.start_date, end, shared)));
        }
        lines.push(Line::from(""));
    }

    if !state.references.is_empty() {
        lines.push(heading("References"));
        for r in &state.references {
            lines.push(Line::from(format!("  {} <{}> {}", r, r.email, r.phone_number)));
        }
        lines.push(Line::from(""));
    }

    if d.offer_salary.is_some() || d.offer_start_date.is_some() {
        lines.push(heading("Offer"));
        if let Some(salary) = &d.offer_salary {
            lines.push(Line::from(format!("  Salary: {}", salary)));
        }
        if let Some(start) = &d.offer_start_date {
            lines.push(Line::from(format!("  Start: {}", start)));
        }
        lines.push(Line::from(""));
    }

    if let Some(rating) = &d.performance_review_rating {
        lines.push(heading("Performance"));
        lines.push(Line::from(format!("  Rating: {}", rating)));
        lines.push(Line::from(""));
    }

    if let Some(notes) = &d.interview_notes {
        lines.push(heading("Interview Notes"));
        for line in textwrap::fill(notes, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        format!("Created {}  Updated {}", candidate.created_at.format("%Y-%m-%d %H:%M"), candidate.updated_at.format("%Y-%m-%d %H:%M")),
        Style::default().fg(Color::DarkGray),
    )));

    Text::from(lines)
}
