use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::warn;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use tokio::runtime::Runtime;

use crate::admin::{can_submit, AdminController, DELETE_PROMPT};
use crate::api::TaskApi;
use crate::form::{Form, FormField};
use crate::gateway::Transport;
use crate::guard::{self, GuardOutcome, ADMIN_PAGE, USER_PAGE};
use crate::models::{
    ActionOutcome, PopupMode, Priority, Role, Route, Session, Task, TaskStatus,
};
use crate::notify::{NoticeLevel, NoticeLog, Notifier, Preset};
use crate::user::UserController;

const PRIORITY_CHOICES: &[&str] = &["low", "medium", "high"];
// Offered when editing a task whose stored priority is none of the above.
const OTHER_PRIORITY_CHOICES: &[&str] = &["other", "low", "medium", "high"];
const STATUS_CHOICES: &[&str] = &["todo", "in_progress", "done"];
const ROLE_CHOICES: &[&str] = &["user", "admin"];

/// What the caller should do with stored credentials after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    SignedIn,
    SignedOut,
}

pub struct App<'a, T: Transport> {
    api: &'a TaskApi<T>,
    runtime: &'a Runtime,
    pub route: Route,
    pub session: Option<Session>,
    pub admin: AdminController,
    pub user: UserController,
    pub notices: NoticeLog,
    pub task_list_state: ListState,
    pub popup_mode: PopupMode,
    pub form: Option<Form>,
    pub should_quit: bool,
    session_change: Option<SessionChange>,
}

impl<'a, T: Transport> App<'a, T> {
    pub fn new(api: &'a TaskApi<T>, runtime: &'a Runtime) -> Self {
        App {
            api,
            runtime,
            route: Route::Landing,
            session: None,
            admin: AdminController::default(),
            user: UserController::default(),
            notices: NoticeLog::new(),
            task_list_state: ListState::default(),
            popup_mode: PopupMode::None,
            form: None,
            should_quit: false,
            session_change: None,
        }
    }

    /// Reported once after a login or logout.
    pub fn take_session_change(&mut self) -> Option<SessionChange> {
        self.session_change.take()
    }

    pub fn navigate(&mut self, route: Route) {
        self.route = route;
        self.close_popup();
        match route {
            Route::Admin => self.enter_admin(),
            Route::User => self.enter_user(),
            Route::Landing | Route::Login => {
                self.session = None;
                self.admin = AdminController::default();
                self.user = UserController::default();
            }
        }
    }

    fn enter_admin(&mut self) {
        let outcome = self
            .runtime
            .block_on(guard::load_tasks(self.api, &ADMIN_PAGE, &mut self.notices));
        if let GuardOutcome::Ready { session, data } = outcome {
            self.session = Some(session);
            self.admin = AdminController::new(data);
            self.reset_selection();
        } else if let Some(route) = outcome.redirect() {
            self.navigate(route);
        }
    }

    fn enter_user(&mut self) {
        let outcome = self
            .runtime
            .block_on(guard::load_tasks(self.api, &USER_PAGE, &mut self.notices));
        if let GuardOutcome::Ready { session, data } = outcome {
            self.session = Some(session);
            self.user = UserController::new(data);
            self.reset_selection();
        } else if let Some(route) = outcome.redirect() {
            self.navigate(route);
        }
    }

    pub fn tasks(&self) -> &[Task] {
        match self.route {
            Route::Admin => self.admin.tasks(),
            Route::User => self.user.tasks(),
            Route::Landing | Route::Login => &[],
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.task_list_state
            .selected()
            .and_then(|i| self.tasks().get(i))
    }

    fn reset_selection(&mut self) {
        let len = self.tasks().len();
        if len == 0 {
            self.task_list_state.select(None);
        } else {
            let current = self.task_list_state.selected().unwrap_or(0);
            self.task_list_state.select(Some(current.min(len - 1)));
        }
    }

    pub fn next_item(&mut self) {
        let len = self.tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.task_list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.task_list_state.select(Some(i));
    }

    pub fn previous_item(&mut self) {
        let len = self.tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.task_list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.task_list_state.select(Some(i));
    }

    pub fn close_popup(&mut self) {
        self.popup_mode = PopupMode::None;
        self.form = None;
        self.admin.cancel_edit();
    }

    fn open_form(&mut self, mode: PopupMode, form: Form) {
        self.popup_mode = mode;
        self.form = Some(form);
    }

    pub fn show_login_popup(&mut self) {
        let form = Form::new(
            "Login",
            vec![FormField::text("Email", ""), FormField::secret("Password")],
        );
        self.open_form(PopupMode::Login, form);
    }

    pub fn show_signup_popup(&mut self) {
        let form = Form::new(
            "Sign Up",
            vec![
                FormField::text("Email", ""),
                FormField::secret("Password"),
                FormField::choice("Role", ROLE_CHOICES, "user"),
            ],
        );
        self.open_form(PopupMode::Signup, form);
    }

    pub fn show_create_popup(&mut self) {
        let draft = &self.admin.draft;
        let form = Form::new(
            "Create New Task",
            vec![
                FormField::text("Title", draft.title.clone()),
                FormField::text("Description", draft.description.clone()),
                FormField::choice("Priority", PRIORITY_CHOICES, draft.priority.as_str()),
                FormField::text("Assigned To", draft.assigned_to.clone()),
            ],
        );
        self.open_form(PopupMode::CreateTask, form);
    }

    pub fn show_edit_popup(&mut self) {
        let Some(id) = self.selected_task().map(|t| t.id.clone()) else {
            return;
        };
        if !self.admin.begin_edit(&id) {
            return;
        }
        if let Some(task) = &self.admin.editing {
            let priorities = match task.priority {
                Priority::Other => OTHER_PRIORITY_CHOICES,
                _ => PRIORITY_CHOICES,
            };
            let form = Form::new(
                "Edit Task",
                vec![
                    FormField::text("Title", task.title.clone()),
                    FormField::text("Description", task.description.clone().unwrap_or_default()),
                    FormField::choice("Priority", priorities, task.priority.as_str()),
                    FormField::choice("Status", STATUS_CHOICES, task.status.as_str()),
                    FormField::text("Assigned To", task.assigned_to.clone()),
                ],
            );
            self.popup_mode = PopupMode::EditTask;
            self.form = Some(form);
        }
    }

    pub fn show_delete_popup(&mut self) {
        if let Some(id) = self.selected_task().map(|t| t.id.clone()) {
            self.popup_mode = PopupMode::ConfirmDelete(id);
        }
    }

    pub fn show_status_popup(&mut self) {
        if self.selected_task().is_some() {
            self.popup_mode = PopupMode::StatusPicker;
        }
    }

    /// Whether the open form's submit action is currently enabled.
    pub fn can_submit_form(&self) -> bool {
        let Some(form) = &self.form else {
            return false;
        };
        match self.popup_mode {
            PopupMode::CreateTask | PopupMode::EditTask => {
                can_submit(form.value("Title"), form.value("Assigned To"))
            }
            _ => true,
        }
    }

    pub fn submit_form(&mut self) {
        let Some(form) = self.form.clone() else {
            return;
        };
        match self.popup_mode {
            PopupMode::Login => self.submit_login(&form),
            PopupMode::Signup => self.submit_signup(&form),
            PopupMode::CreateTask => self.submit_create(&form),
            PopupMode::EditTask => self.submit_edit(&form),
            _ => {}
        }
    }

    fn submit_login(&mut self, form: &Form) {
        let result = self
            .runtime
            .block_on(self.api.sign_in(form.value("Email"), form.value("Password")));
        match result {
            Ok((_, route)) => {
                self.session_change = Some(SessionChange::SignedIn);
                self.navigate(route);
            }
            Err(e) => self.notices.inline(&e.to_string()),
        }
    }

    fn submit_signup(&mut self, form: &Form) {
        let role = Role::parse(form.value("Role")).unwrap_or(Role::User);
        let result = self.runtime.block_on(self.api.register(
            form.value("Email"),
            form.value("Password"),
            role,
        ));
        match result {
            Ok(message) => {
                self.notices.info(&message);
                self.close_popup();
            }
            Err(e) => self.notices.inline(&e.to_string()),
        }
    }

    fn submit_create(&mut self, form: &Form) {
        self.admin.draft.title = form.value("Title").to_string();
        self.admin.draft.description = form.value("Description").to_string();
        self.admin.draft.priority = Priority::parse(form.value("Priority")).unwrap_or_default();
        self.admin.draft.assigned_to = form.value("Assigned To").to_string();

        let outcome = self
            .runtime
            .block_on(self.admin.create(self.api, &mut self.notices));
        if outcome == ActionOutcome::Applied {
            self.close_popup();
            self.reset_selection();
        }
    }

    fn submit_edit(&mut self, form: &Form) {
        if let Some(editing) = self.admin.editing.as_mut() {
            editing.title = form.value("Title").to_string();
            let description = form.value("Description");
            if !(description.is_empty() && editing.description.is_none()) {
                editing.description = Some(description.to_string());
            }
            if let Some(priority) = Priority::parse(form.value("Priority")) {
                editing.priority = priority;
            }
            if let Some(status) = TaskStatus::parse(form.value("Status")) {
                editing.status = status;
            }
            editing.assigned_to = form.value("Assigned To").to_string();
        }

        let outcome = self
            .runtime
            .block_on(self.admin.submit_edit(self.api, &mut self.notices));
        if outcome == ActionOutcome::Applied {
            self.close_popup();
        }
    }

    pub fn answer_delete(&mut self, confirmed: bool) {
        let PopupMode::ConfirmDelete(id) = self.popup_mode.clone() else {
            return;
        };
        self.runtime.block_on(self.admin.delete(
            self.api,
            &id,
            &mut Preset(confirmed),
            &mut self.notices,
        ));
        self.close_popup();
        self.reset_selection();
    }

    pub fn pick_status(&mut self, status: TaskStatus) {
        let Some(id) = self.selected_task().map(|t| t.id.clone()) else {
            self.close_popup();
            return;
        };
        self.runtime.block_on(self.user.update_status(
            self.api,
            &id,
            status,
            &mut self.notices,
        ));
        self.close_popup();
    }

    pub fn logout(&mut self) {
        if let Err(e) = self.runtime.block_on(self.api.logout()) {
            warn!("Logout failed: {e}");
        }
        self.session_change = Some(SessionChange::SignedOut);
        self.navigate(Route::Landing);
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        match self.popup_mode.clone() {
            PopupMode::None => self.handle_screen_key(key),
            PopupMode::ConfirmDelete(_) => match key {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.answer_delete(true),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.answer_delete(false),
                _ => {}
            },
            PopupMode::StatusPicker => match key {
                KeyCode::Char(c @ '1'..='3') => {
                    let index = c as usize - '1' as usize;
                    self.pick_status(TaskStatus::ALL[index]);
                }
                KeyCode::Esc => self.close_popup(),
                _ => {}
            },
            PopupMode::Login | PopupMode::Signup | PopupMode::CreateTask | PopupMode::EditTask => {
                self.handle_form_key(key)
            }
        }
    }

    fn handle_form_key(&mut self, key: KeyCode) {
        if key == KeyCode::Enter {
            if self.can_submit_form() {
                self.submit_form();
            }
            return;
        }
        if key == KeyCode::Esc {
            self.close_popup();
            return;
        }
        if let Some(form) = self.form.as_mut() {
            match key {
                KeyCode::Tab | KeyCode::Down => form.next_field(),
                KeyCode::BackTab | KeyCode::Up => form.previous_field(),
                KeyCode::Left => form.move_cursor_left(),
                KeyCode::Right => form.move_cursor_right(),
                KeyCode::Home => form.move_to_start_of_line(),
                KeyCode::End => form.move_to_end_of_line(),
                KeyCode::Backspace => form.delete_char(),
                KeyCode::Char(c) => form.insert_char(c),
                _ => {}
            }
        }
    }

    fn handle_screen_key(&mut self, key: KeyCode) {
        if key == KeyCode::Char('q') {
            self.should_quit = true;
            return;
        }
        match self.route {
            Route::Landing => match key {
                KeyCode::Char('l') | KeyCode::Enter => self.show_login_popup(),
                KeyCode::Char('s') => self.show_signup_popup(),
                _ => {}
            },
            Route::Admin => match key {
                KeyCode::Down => self.next_item(),
                KeyCode::Up => self.previous_item(),
                KeyCode::Char('n') => self.show_create_popup(),
                KeyCode::Char('e') | KeyCode::Enter => self.show_edit_popup(),
                KeyCode::Char('d') => self.show_delete_popup(),
                KeyCode::Char('r') => self.navigate(Route::Admin),
                KeyCode::Char('o') => self.logout(),
                _ => {}
            },
            Route::User => match key {
                KeyCode::Down => self.next_item(),
                KeyCode::Up => self.previous_item(),
                KeyCode::Char('s') | KeyCode::Enter => self.show_status_popup(),
                KeyCode::Char('r') => self.navigate(Route::User),
                KeyCode::Char('o') => self.logout(),
                _ => {}
            },
            Route::Login => {}
        }
    }
}

/// Runs the TUI until the user quits; `persist` runs after every login or logout.
pub fn run_tui<T: Transport>(
    api: &TaskApi<T>,
    mut persist: impl FnMut(SessionChange) -> Result<()>,
) -> Result<()> {
    let runtime = Runtime::new()?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(api, &runtime);
    let res = run_app(&mut terminal, &mut app, &mut persist);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend, T: Transport>(
    terminal: &mut Terminal<B>,
    app: &mut App<'_, T>,
    persist: &mut impl FnMut(SessionChange) -> Result<()>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                app.handle_key(key.code);
            }
        }

        if let Some(change) = app.take_session_change() {
            if let Err(e) = persist(change) {
                warn!("could not update stored session: {e}");
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn ui<T: Transport>(f: &mut Frame, app: &mut App<'_, T>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(f.area());

    match app.route {
        Route::Landing => render_landing(f, chunks[0]),
        Route::Admin => render_admin(f, app, chunks[0]),
        Route::User => render_user(f, app, chunks[0]),
        Route::Login => render_unmatched(f, app.route, chunks[0]),
    }
    render_status_line(f, app, chunks[1]);

    match app.popup_mode.clone() {
        PopupMode::None => {}
        PopupMode::ConfirmDelete(_) => render_confirm(f, DELETE_PROMPT),
        PopupMode::StatusPicker => render_status_picker(f),
        PopupMode::Login | PopupMode::Signup | PopupMode::CreateTask | PopupMode::EditTask => {
            let enabled = app.can_submit_form();
            if let Some(form) = &app.form {
                render_form(f, form, enabled);
            }
        }
    }
}

// Helper function to create centered rectangles for popups
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Todo => Color::Gray,
        TaskStatus::InProgress => Color::Blue,
        TaskStatus::Done => Color::Green,
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
        Priority::Other => Color::White,
    }
}

fn render_landing(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Task Manager",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("JWT Auth • Role-Based Access • Full CRUD"),
        Line::from(""),
        Line::from("Admins create, edit, assign and delete tasks."),
        Line::from("Users track the tasks assigned to them and update their status."),
        Line::from(""),
        Line::from(""),
        Line::from("Controls: l: Login • s: Sign up • q: Quit"),
    ];
    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Welcome"))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn stat_block(f: &mut Frame, area: Rect, label: &str, value: usize, color: Color) {
    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
            value.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(label.to_string()),
    ])
    .block(Block::default().borders(Borders::ALL))
    .alignment(Alignment::Center);
    f.render_widget(paragraph, area);
}

fn task_items(tasks: &[Task]) -> Vec<ListItem<'static>> {
    tasks
        .iter()
        .map(|task| {
            ListItem::new(vec![Line::from(vec![
                Span::styled(format!("{} ", task.title), Style::default().fg(Color::White)),
                Span::styled(
                    format!("[{}] ", task.priority.label()),
                    Style::default().fg(priority_color(task.priority)),
                ),
                Span::styled(
                    format!("[{}]", task.status.label()),
                    Style::default().fg(status_color(task.status)),
                ),
            ])])
        })
        .collect()
}

fn task_details(task: &Task) -> String {
    format!(
        "Title: {}\n\n{}\n\nStatus: {}\nPriority: {}\nAssigned To: {}\nCreated By: {}",
        task.title,
        task.description_or_placeholder(),
        task.status.label(),
        task.priority.label(),
        task.assigned_to,
        task.created_by_or_default()
    )
}

fn render_task_panes<T: Transport>(
    f: &mut Frame,
    app: &mut App<'_, T>,
    area: Rect,
    title: &str,
    empty_text: &str,
    controls: &str,
) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    let tasks_list = List::new(task_items(app.tasks()))
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .highlight_style(
            Style::default()
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");
    f.render_stateful_widget(tasks_list, chunks[0], &mut app.task_list_state);

    let info_text = match app.selected_task() {
        Some(task) => format!("{}\n\nControls:\n{}", task_details(task), controls),
        None if app.tasks().is_empty() => format!("{empty_text}\n\nControls:\n{controls}"),
        None => format!("No task selected\n\nControls:\n{controls}"),
    };
    let info_paragraph = Paragraph::new(info_text)
        .block(Block::default().borders(Borders::ALL).title("Task Info"))
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White));
    f.render_widget(info_paragraph, chunks[1]);
}

fn header(f: &mut Frame, area: Rect, title: &str, subtitle: &str) {
    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
            title.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(subtitle.to_string(), Style::default().fg(Color::Gray))),
    ])
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn render_admin<T: Transport>(f: &mut Frame, app: &mut App<'_, T>, area: Rect) {
    if app.session.is_none() {
        return;
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Length(4), Constraint::Min(0)].as_ref())
        .split(area);

    header(f, chunks[0], "Admin Dashboard", "Full Access Control");

    let stats = app.admin.stats();
    let stat_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4].as_ref())
        .split(chunks[1]);
    stat_block(f, stat_chunks[0], "Total Tasks", stats.total, Color::White);
    stat_block(f, stat_chunks[1], "In Progress", stats.in_progress, Color::Blue);
    stat_block(f, stat_chunks[2], "Completed", stats.done, Color::Green);
    stat_block(f, stat_chunks[3], "To Do", stats.todo, Color::Gray);

    render_task_panes(
        f,
        app,
        chunks[2],
        "All Tasks",
        "No tasks yet. Press n to create the first one.",
        "• ↑/↓: Navigate\n• n: New task\n• e/Enter: Edit task\n• d: Delete task\n• r: Refresh\n• o: Logout\n• q: Quit",
    );
}

fn render_user<T: Transport>(f: &mut Frame, app: &mut App<'_, T>, area: Rect) {
    let Some(email) = app.session.as_ref().map(|s| s.email.clone()) else {
        return;
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Length(4), Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    header(f, chunks[0], "My Tasks", &email);

    let stats = app.user.stats();
    let stat_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3].as_ref())
        .split(chunks[1]);
    stat_block(f, stat_chunks[0], "To Do", stats.todo, Color::Gray);
    stat_block(f, stat_chunks[1], "In Progress", stats.in_progress, Color::Blue);
    stat_block(f, stat_chunks[2], "Completed", stats.done, Color::Green);

    let banner = Paragraph::new(
        "You can view your assigned tasks and update their status. Contact your admin for task modifications.",
    )
    .block(Block::default().borders(Borders::ALL).title("User Access"))
    .style(Style::default().fg(Color::Cyan))
    .wrap(Wrap { trim: true });
    f.render_widget(banner, chunks[2]);

    render_task_panes(
        f,
        app,
        chunks[3],
        "My Assigned Tasks",
        "No Tasks Assigned. You don't have any tasks assigned yet. Check back later!",
        "• ↑/↓: Navigate\n• s/Enter: Update status\n• r: Refresh\n• o: Logout\n• q: Quit",
    );
}

fn render_unmatched(f: &mut Frame, route: Route, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(route.path());
    f.render_widget(block, area);
}

fn render_status_line<T: Transport>(f: &mut Frame, app: &App<'_, T>, area: Rect) {
    let (text, color) = match app.notices.latest() {
        Some(notice) => {
            let color = match notice.level {
                NoticeLevel::Blocking => Color::Red,
                NoticeLevel::Inline => Color::Yellow,
                NoticeLevel::Info => Color::Green,
            };
            (format!("[{}] {}", notice.at.format("%H:%M:%S"), notice.message), color)
        }
        None => (String::new(), Color::White),
    };
    let title = match &app.session {
        Some(session) => format!("{} ({})", session.email, session.role),
        None => "Not signed in".to_string(),
    };
    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(Style::default().fg(color));
    f.render_widget(paragraph, area);
}

fn render_form(f: &mut Frame, form: &Form, enabled: bool) {
    let popup_area = centered_rect(60, 50, f.area());
    f.render_widget(Clear, popup_area);

    let mut lines = Vec::new();
    for (i, field) in form.fields.iter().enumerate() {
        let focused = i == form.focused;
        let label_style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        lines.push(Line::from(Span::styled(field.label, label_style)));

        let mut value = field.display_value();
        if focused && !matches!(field.kind, crate::form::FieldKind::Choice(_)) {
            let at = value
                .char_indices()
                .nth(field.cursor())
                .map(|(i, _)| i)
                .unwrap_or(value.len());
            value.insert(at, '|');
        }
        lines.push(Line::from(Span::styled(value, Style::default().fg(Color::White))));
        lines.push(Line::from(""));
    }

    let submit_style = if enabled {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    lines.push(Line::from(Span::styled("[ Enter: Submit ]", submit_style)));
    lines.push(Line::from("Tab: Next field • ←/→: Change choice • Esc: Cancel"));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(form.title.clone())
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, popup_area);
}

fn render_confirm(f: &mut Frame, prompt: &str) {
    let popup_area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, popup_area);
    let content = Paragraph::new(format!("{prompt}\n\ny: Delete • n/ESC: Cancel"))
        .block(
            Block::default()
                .title("Delete Task")
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::DarkGray)),
        )
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White));
    f.render_widget(content, popup_area);
}

fn render_status_picker(f: &mut Frame) {
    let popup_area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, popup_area);
    let content = Paragraph::new("Select new status:\n\n1. To Do\n2. In Progress\n3. Done\n\nPress ESC to cancel")
        .block(
            Block::default()
                .title("Update Status")
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::DarkGray)),
        )
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White));
    f.render_widget(content, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::gateway::MockTransport;
    use reqwest::Method;
    use serde_json::{json, Value};

    fn tasks_json() -> Value {
        json!([
            { "id": "t1", "title": "Write report", "priority": "high", "status": "todo",
              "description": "Q3 numbers", "assigned_to": "u@x.com", "created_by": "a@x.com" },
            { "id": "t2", "title": "Fix login bug", "priority": "low", "status": "todo",
              "description": null, "assigned_to": "u@x.com", "created_by": "a@x.com" }
        ])
    }

    fn me(transport: &mut MockTransport, role: &'static str) {
        transport
            .expect_request()
            .withf(|path, _| path == "/auth/me")
            .returning(move |_, _| Ok(json!({ "id": "1", "email": "a@x.com", "role": role })));
    }

    fn type_text<T: Transport>(app: &mut App<'_, T>, text: &str) {
        for c in text.chars() {
            app.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn test_login_popup_routes_admin_to_dashboard() {
        let runtime = Runtime::new().unwrap();
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .withf(|path, opts| {
                path == "/auth/login"
                    && opts.body == Some(json!({ "email": "a@x.com", "password": "p" }))
            })
            .times(1)
            .returning(|_, _| Ok(json!({ "message": "Login successful" })));
        me(&mut transport, "admin");
        transport
            .expect_request()
            .withf(|path, _| path == "/tasks")
            .returning(|_, _| Ok(tasks_json()));

        let api = TaskApi::new(transport);
        let mut app = App::new(&api, &runtime);
        app.handle_key(KeyCode::Char('l'));
        type_text(&mut app, "a@x.com");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "p");
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.route, Route::Admin);
        assert_eq!(app.popup_mode, PopupMode::None);
        assert_eq!(app.admin.tasks().len(), 2);
        assert_eq!(app.selected_task().unwrap().id, "t1");
        assert_eq!(app.take_session_change(), Some(SessionChange::SignedIn));
        assert_eq!(app.take_session_change(), None);
    }

    #[test]
    fn test_failed_login_keeps_popup_and_reports() {
        let runtime = Runtime::new().unwrap();
        let mut transport = MockTransport::new();
        transport.expect_request().returning(|_, _| {
            Err(ClientError::Request {
                status: 401,
                message: "User not found With this email".to_string(),
            })
        });

        let api = TaskApi::new(transport);
        let mut app = App::new(&api, &runtime);
        app.show_login_popup();
        type_text(&mut app, "x@x.com");
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.route, Route::Landing);
        assert_eq!(app.popup_mode, PopupMode::Login);
        let notice = app.notices.latest().unwrap();
        assert_eq!(notice.message, "User not found With this email");
        assert_eq!(notice.level, NoticeLevel::Inline);
    }

    #[test]
    fn test_admin_mount_failure_returns_to_landing() {
        let runtime = Runtime::new().unwrap();
        let mut transport = MockTransport::new();
        me(&mut transport, "admin");
        transport.expect_request().withf(|path, _| path == "/tasks").returning(|_, _| {
            Err(ClientError::Request {
                status: 500,
                message: "Request failed".to_string(),
            })
        });

        let api = TaskApi::new(transport);
        let mut app = App::new(&api, &runtime);
        app.navigate(Route::Admin);

        assert_eq!(app.route, Route::Landing);
        assert!(app.session.is_none());
        assert!(app.admin.tasks().is_empty());
        assert_eq!(app.notices.latest().unwrap().level, NoticeLevel::Blocking);
    }

    #[test]
    fn test_user_mount_failure_goes_to_unregistered_login_route() {
        let runtime = Runtime::new().unwrap();
        let mut transport = MockTransport::new();
        transport.expect_request().returning(|_, _| {
            Err(ClientError::Request {
                status: 401,
                message: "Not authenticated".to_string(),
            })
        });

        let api = TaskApi::new(transport);
        let mut app = App::new(&api, &runtime);
        app.navigate(Route::User);

        assert_eq!(app.route, Route::Login);
        assert!(app.tasks().is_empty());
    }

    #[test]
    fn test_declined_delete_keeps_task_and_sends_nothing() {
        let runtime = Runtime::new().unwrap();
        let mut transport = MockTransport::new();
        me(&mut transport, "admin");
        transport
            .expect_request()
            .withf(|path, opts| path == "/tasks" && opts.method == Method::GET)
            .returning(|_, _| Ok(tasks_json()));
        transport
            .expect_request()
            .withf(|_, opts| opts.method == Method::DELETE)
            .never();

        let api = TaskApi::new(transport);
        let mut app = App::new(&api, &runtime);
        app.navigate(Route::Admin);
        app.handle_key(KeyCode::Char('d'));
        assert_eq!(app.popup_mode, PopupMode::ConfirmDelete("t1".to_string()));
        app.handle_key(KeyCode::Char('n'));

        assert_eq!(app.popup_mode, PopupMode::None);
        assert_eq!(app.admin.tasks().len(), 2);
    }

    #[test]
    fn test_create_submit_disabled_until_required_fields_filled() {
        let runtime = Runtime::new().unwrap();
        let mut transport = MockTransport::new();
        me(&mut transport, "admin");
        transport
            .expect_request()
            .withf(|path, opts| path == "/tasks" && opts.method == Method::GET)
            .returning(|_, _| Ok(json!([])));
        transport
            .expect_request()
            .withf(|path, opts| path == "/tasks" && opts.method == Method::POST)
            .times(1)
            .returning(|_, _| {
                Ok(json!({
                    "id": "t9", "created_by": "a@x.com", "title": "Write report",
                    "priority": "medium", "status": "todo", "description": "",
                    "assigned_to": "b@x.com"
                }))
            });

        let api = TaskApi::new(transport);
        let mut app = App::new(&api, &runtime);
        app.navigate(Route::Admin);
        app.handle_key(KeyCode::Char('n'));
        type_text(&mut app, "Write report");
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.popup_mode, PopupMode::CreateTask);

        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "b@x.com");
        assert!(app.can_submit_form());
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.popup_mode, PopupMode::None);
        assert_eq!(app.admin.tasks().len(), 1);
        assert_eq!(app.admin.tasks()[0].status.label(), "To Do");
    }

    #[test]
    fn test_user_status_pick_updates_selected_task_only() {
        let runtime = Runtime::new().unwrap();
        let mut transport = MockTransport::new();
        me(&mut transport, "user");
        transport
            .expect_request()
            .withf(|path, _| path == "/tasks/")
            .returning(|_, _| Ok(tasks_json()));
        transport
            .expect_request()
            .withf(|path, opts| {
                path == "/tasks/t2" && opts.body == Some(json!({ "status": "in_progress" }))
            })
            .times(1)
            .returning(|_, _| Ok(json!({ "message": "Task updated successfully" })));

        let api = TaskApi::new(transport);
        let mut app = App::new(&api, &runtime);
        app.navigate(Route::User);
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Char('s'));
        app.handle_key(KeyCode::Char('2'));

        let statuses: Vec<TaskStatus> = app.user.tasks().iter().map(|t| t.status).collect();
        assert_eq!(statuses, vec![TaskStatus::Todo, TaskStatus::InProgress]);
        assert_eq!(app.popup_mode, PopupMode::None);
    }

    #[test]
    fn test_logout_returns_to_landing_even_when_call_fails() {
        let runtime = Runtime::new().unwrap();
        let mut transport = MockTransport::new();
        me(&mut transport, "user");
        transport
            .expect_request()
            .withf(|path, _| path == "/tasks/")
            .returning(|_, _| Ok(tasks_json()));
        transport
            .expect_request()
            .withf(|path, _| path == "/auth/logout")
            .times(1)
            .returning(|_, _| {
                Err(ClientError::Request {
                    status: 500,
                    message: "Request failed".to_string(),
                })
            });

        let api = TaskApi::new(transport);
        let mut app = App::new(&api, &runtime);
        app.navigate(Route::User);
        app.handle_key(KeyCode::Char('o'));

        assert_eq!(app.route, Route::Landing);
        assert!(app.session.is_none());
        assert_eq!(app.take_session_change(), Some(SessionChange::SignedOut));
    }
}
