//! Application state and event handling.
//!
//! [`App`] is everything the renderer draws from. Key events mutate it
//! synchronously; anything that needs a service comes back from
//! [`App::handle_key_event`] as an [`AppCommand`] for the main loop to send.

pub mod form;

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use taskdeck_model::task::{NewSubtask, Priority, Task, TaskId};

use crate::analytics::DEFAULT_DATE_FORMAT;
use crate::backend::AuthUser;
use crate::command::AppCommand;
use crate::filter::{DashboardFilter, StatusTab, categories};
use crate::notice::NoticeBoard;
use crate::session::SessionChange;
use crate::store::TaskSnapshot;
use crate::theme::ThemeMode;

use form::{
    EditorOutput, FieldSet, LOGIN_FIELDS, REGISTER_FIELDS, RESET_FIELDS, TaskEditor, TextField,
    login_form, register_form, reset_form,
};

/// Which screen is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Screen {
    /// Email/password sign-in.
    #[default]
    Login,
    /// Account registration.
    Register,
    /// Password reset request.
    ForgotPassword,
    /// Task list with filters and summary.
    Dashboard,
    /// Charts over the task list.
    Analytics,
    /// Theme and account settings.
    Settings,
}

impl Screen {
    /// Whether the screen needs a signed-in user.
    #[must_use]
    pub const fn requires_auth(self) -> bool {
        matches!(self, Self::Dashboard | Self::Analytics | Self::Settings)
    }

    /// Heading shown for the screen.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Login => "Sign in",
            Self::Register => "Create account",
            Self::ForgotPassword => "Reset password",
            Self::Dashboard => "Dashboard",
            Self::Analytics => "Analytics",
            Self::Settings => "Settings",
        }
    }
}

/// A modal panel drawn over the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    /// Create or edit a task.
    Editor(TaskEditor),
    /// A task's subtasks.
    Detail {
        /// Task being shown.
        task: TaskId,
        /// Selected subtask index.
        selected: usize,
        /// New subtask title while one is being typed.
        input: Option<TextField>,
    },
    /// Asks before deleting a task.
    ConfirmDelete(TaskId),
}

/// Main application state.
pub struct App {
    /// Current screen.
    pub screen: Screen,
    /// Signed-in user.
    pub user: Option<AuthUser>,
    /// Latest copy of the task store.
    pub snapshot: TaskSnapshot,
    /// Active theme.
    pub theme: ThemeMode,
    /// Visible notices.
    pub notices: NoticeBoard,
    /// Fields of the auth form on the current screen.
    pub form: FieldSet,
    /// Inline validation message for the auth form.
    pub form_error: Option<String>,
    /// Active/completed tab.
    pub tab: StatusTab,
    /// Dashboard filters.
    pub filter: DashboardFilter,
    /// Search box contents.
    pub search: TextField,
    /// Whether keys go to the search box.
    pub searching: bool,
    /// Selected index into the visible tasks.
    pub selected: usize,
    /// Modal panel, if any.
    pub overlay: Option<Overlay>,
    /// `strftime` format for due dates.
    pub date_format: String,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl App {
    /// Creates an app on the login screen.
    #[must_use]
    pub fn new(notices: NoticeBoard) -> Self {
        Self {
            screen: Screen::Login,
            user: None,
            snapshot: TaskSnapshot {
                loading: true,
                ..TaskSnapshot::default()
            },
            theme: ThemeMode::default(),
            notices,
            form: FieldSet::new(LOGIN_FIELDS),
            form_error: None,
            tab: StatusTab::default(),
            filter: DashboardFilter::default(),
            search: TextField::default(),
            searching: false,
            selected: 0,
            overlay: None,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            should_quit: false,
        }
    }

    /// Sets the due date format.
    #[must_use]
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Switches screens. Protected screens redirect to the login screen
    /// while nobody is signed in.
    pub fn navigate(&mut self, screen: Screen) {
        let screen = if screen.requires_auth() && self.user.is_none() {
            Screen::Login
        } else {
            screen
        };
        if screen != self.screen {
            tracing::debug!(from = ?self.screen, to = ?screen, "navigate");
        }
        self.form = match screen {
            Screen::Login => FieldSet::new(LOGIN_FIELDS),
            Screen::Register => FieldSet::new(REGISTER_FIELDS),
            Screen::ForgotPassword => FieldSet::new(RESET_FIELDS),
            _ => self.form.clone(),
        };
        self.form_error = None;
        self.overlay = None;
        self.searching = false;
        self.screen = screen;
    }

    /// Follows the signed-in user. Signing out leaves any protected screen;
    /// signing in leaves the auth screens for the dashboard.
    pub fn set_user(&mut self, user: Option<AuthUser>) {
        let signed_in = user.is_some();
        self.user = user;
        if signed_in && !self.screen.requires_auth() {
            self.reset_dashboard();
            self.navigate(Screen::Dashboard);
        } else if !signed_in && self.screen.requires_auth() {
            self.navigate(Screen::Login);
        }
    }

    /// Applies a change seen on the auth-state channel.
    pub fn apply_session_change(&mut self, change: SessionChange) {
        match change {
            SessionChange::SignedIn(user) => self.set_user(Some(user)),
            SessionChange::SignedOut => self.set_user(None),
        }
    }

    /// Replaces the task snapshot, keeping the selection in range.
    pub fn set_snapshot(&mut self, snapshot: TaskSnapshot) {
        self.snapshot = snapshot;
        self.clamp_selection();
        if let Some(Overlay::Detail { task, selected, .. }) = &mut self.overlay {
            match self.snapshot.tasks.iter().find(|t| &t.id == task) {
                Some(t) => *selected = (*selected).min(t.subtasks.len().saturating_sub(1)),
                None => self.overlay = None,
            }
        }
    }

    /// Expires old notices.
    pub fn tick(&mut self) {
        self.notices.expire();
    }

    /// Tasks on the current tab that pass the filters.
    #[must_use]
    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.filter.apply(&self.snapshot.tasks, self.tab)
    }

    /// The highlighted task.
    #[must_use]
    pub fn selected_task(&self) -> Option<&Task> {
        self.visible_tasks().get(self.selected).copied()
    }

    /// The task a detail overlay refers to.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.snapshot.tasks.iter().find(|t| &t.id == id)
    }

    /// Handle a key event, returning a command when a service is needed.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<AppCommand> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return None;
        }
        if self.overlay.is_some() {
            return self.handle_overlay_key(key);
        }
        match self.screen {
            Screen::Login | Screen::Register | Screen::ForgotPassword => self.handle_auth_key(key),
            Screen::Dashboard => self.handle_dashboard_key(key),
            Screen::Analytics => {
                self.handle_nav_key(key);
                None
            }
            Screen::Settings => self.handle_settings_key(key),
        }
    }

    fn handle_auth_key(&mut self, key: KeyEvent) -> Option<AppCommand> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match (key.code, ctrl) {
            (KeyCode::Esc, _) => {
                if self.screen == Screen::Login {
                    self.should_quit = true;
                } else {
                    self.navigate(Screen::Login);
                }
            }
            (KeyCode::Tab | KeyCode::Down, _) => self.form.next(),
            (KeyCode::BackTab | KeyCode::Up, _) => self.form.prev(),
            (KeyCode::Enter, _) => return self.submit_auth_form(),
            (KeyCode::Char('g'), true) if self.screen != Screen::ForgotPassword => {
                return Some(AppCommand::SignInWithGoogle);
            }
            (KeyCode::Char('r'), true) => self.navigate(Screen::Register),
            (KeyCode::Char('f'), true) => self.navigate(Screen::ForgotPassword),
            (KeyCode::Char('l'), true) => self.navigate(Screen::Login),
            _ if !ctrl => {
                if self.form.handle_key(key) {
                    self.form_error = None;
                }
            }
            _ => {}
        }
        None
    }

    fn submit_auth_form(&mut self) -> Option<AppCommand> {
        let result = match self.screen {
            Screen::Login => {
                let form = login_form(&self.form);
                form.validate().map(|()| AppCommand::SignIn(form))
            }
            Screen::Register => {
                let form = register_form(&self.form);
                form.validate().map(|()| AppCommand::SignUp(form))
            }
            Screen::ForgotPassword => {
                let form = reset_form(&self.form);
                form.validate().map(|()| AppCommand::SendPasswordReset(form))
            }
            _ => return None,
        };
        match result {
            Ok(command) => {
                self.form_error = None;
                Some(command)
            }
            Err(err) => {
                self.form_error = Some(err.to_string());
                None
            }
        }
    }

    /// Screen switching shared by the protected screens. Returns `true` if
    /// the key was consumed.
    fn handle_nav_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('1') => self.navigate(Screen::Dashboard),
            KeyCode::Char('2') => self.navigate(Screen::Analytics),
            KeyCode::Char('3') => self.navigate(Screen::Settings),
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc if self.screen != Screen::Dashboard => self.navigate(Screen::Dashboard),
            KeyCode::Esc => self.should_quit = true,
            _ => return false,
        }
        true
    }

    fn handle_settings_key(&mut self, key: KeyEvent) -> Option<AppCommand> {
        match key.code {
            KeyCode::Char('t') => Some(AppCommand::ToggleTheme),
            KeyCode::Char('o') => Some(AppCommand::SignOut),
            _ => {
                self.handle_nav_key(key);
                None
            }
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) -> Option<AppCommand> {
        if self.searching {
            self.handle_search_key(key);
            return None;
        }
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.select_prev(),
            KeyCode::Tab => {
                self.tab = self.tab.toggled();
                self.selected = 0;
            }
            KeyCode::Char('/') => self.searching = true,
            KeyCode::Char('c') => self.cycle_category(),
            KeyCode::Char('p') => self.cycle_priority(),
            KeyCode::Char('r') => {
                self.filter.reset();
                self.search.clear();
                self.selected = 0;
            }
            KeyCode::Char('n') => self.overlay = Some(Overlay::Editor(TaskEditor::create())),
            KeyCode::Char('e') => {
                if let Some(task) = self.selected_task() {
                    self.overlay = Some(Overlay::Editor(TaskEditor::edit(task)));
                }
            }
            KeyCode::Char(' ' | 'x') => {
                return self.selected_task().map(|t| AppCommand::ToggleTask(t.id.clone()));
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(task) = self.selected_task() {
                    self.overlay = Some(Overlay::ConfirmDelete(task.id.clone()));
                }
            }
            KeyCode::Enter => {
                if let Some(task) = self.selected_task() {
                    self.overlay = Some(Overlay::Detail {
                        task: task.id.clone(),
                        selected: 0,
                        input: None,
                    });
                }
            }
            _ => {
                self.handle_nav_key(key);
            }
        }
        None
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => self.searching = false,
            _ => {
                if self.search.handle_key(key) {
                    self.filter.search = self.search.value().to_string();
                    self.selected = 0;
                }
            }
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> Option<AppCommand> {
        let overlay = self.overlay.take()?;
        let (next, command) = match overlay {
            Overlay::Editor(editor) => Self::handle_editor_key(editor, key),
            Overlay::ConfirmDelete(id) => match key.code {
                KeyCode::Char('y' | 'Y') => (None, Some(AppCommand::DeleteTask(id))),
                KeyCode::Char('n' | 'N') | KeyCode::Esc => (None, None),
                _ => (Some(Overlay::ConfirmDelete(id)), None),
            },
            Overlay::Detail {
                task,
                selected,
                input,
            } => self.handle_detail_key(task, selected, input, key),
        };
        self.overlay = next;
        command
    }

    fn handle_editor_key(
        mut editor: TaskEditor,
        key: KeyEvent,
    ) -> (Option<Overlay>, Option<AppCommand>) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match (key.code, ctrl) {
            (KeyCode::Esc, _) => return (None, None),
            (KeyCode::Tab | KeyCode::Down, _) => editor.fields.next(),
            (KeyCode::BackTab | KeyCode::Up, _) => editor.fields.prev(),
            (KeyCode::Char('p'), true) => editor.cycle_priority(),
            (KeyCode::Enter, _) => {
                return match editor.submit() {
                    Some(EditorOutput::Create(task)) => (None, Some(AppCommand::AddTask(task))),
                    Some(EditorOutput::Update(task, patch)) => {
                        (None, Some(AppCommand::UpdateTask { task, patch }))
                    }
                    None => (Some(Overlay::Editor(editor)), None),
                };
            }
            _ if !ctrl => {
                editor.fields.handle_key(key);
            }
            _ => {}
        }
        (Some(Overlay::Editor(editor)), None)
    }

    fn handle_detail_key(
        &self,
        task: TaskId,
        mut selected: usize,
        input: Option<TextField>,
        key: KeyEvent,
    ) -> (Option<Overlay>, Option<AppCommand>) {
        if let Some(mut field) = input {
            return match key.code {
                KeyCode::Esc => (Some(detail(task, selected, None)), None),
                KeyCode::Enter if field.value().trim().is_empty() => {
                    (Some(detail(task, selected, None)), None)
                }
                KeyCode::Enter => {
                    let subtask = NewSubtask::new(field.value());
                    let command = AppCommand::AddSubtask {
                        task: task.clone(),
                        subtask,
                    };
                    (Some(detail(task, selected, None)), Some(command))
                }
                _ => {
                    field.handle_key(key);
                    (Some(detail(task, selected, Some(field))), None)
                }
            };
        }

        let subtasks = self.task(&task).map(|t| t.subtasks.as_slice()).unwrap_or_default();
        let current = subtasks.get(selected).map(|s| s.id.clone());
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return (None, None),
            KeyCode::Char('j') | KeyCode::Down => {
                selected = (selected + 1).min(subtasks.len().saturating_sub(1));
            }
            KeyCode::Char('k') | KeyCode::Up => selected = selected.saturating_sub(1),
            KeyCode::Char('a') => {
                return (Some(detail(task, selected, Some(TextField::default()))), None);
            }
            KeyCode::Char(' ') => {
                if let Some(subtask) = current {
                    let command = AppCommand::ToggleSubtask {
                        task: task.clone(),
                        subtask,
                    };
                    return (Some(detail(task, selected, None)), Some(command));
                }
            }
            KeyCode::Char('x' | 'd') | KeyCode::Delete => {
                if let Some(subtask) = current {
                    let command = AppCommand::DeleteSubtask {
                        task: task.clone(),
                        subtask,
                    };
                    return (Some(detail(task, selected, None)), Some(command));
                }
            }
            KeyCode::Char('c') => {
                return (
                    Some(detail(task.clone(), selected, None)),
                    Some(AppCommand::ToggleTask(task)),
                );
            }
            _ => {}
        }
        (Some(detail(task, selected, None)), None)
    }

    fn cycle_category(&mut self) {
        let all = categories(&self.snapshot.tasks);
        self.filter.category = match &self.filter.category {
            None => all.first().cloned(),
            Some(current) => all
                .iter()
                .position(|c| c == current)
                .and_then(|i| all.get(i + 1))
                .cloned(),
        };
        self.selected = 0;
    }

    fn cycle_priority(&mut self) {
        self.filter.priority = match self.filter.priority {
            None => Some(Priority::High),
            Some(Priority::High) => Some(Priority::Medium),
            Some(Priority::Medium) => Some(Priority::Low),
            Some(Priority::Low) => None,
        };
        self.selected = 0;
    }

    fn select_next(&mut self) {
        let len = self.visible_tasks().len();
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    const fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_tasks().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn reset_dashboard(&mut self) {
        self.tab = StatusTab::default();
        self.filter.reset();
        self.search.clear();
        self.searching = false;
        self.selected = 0;
    }
}

const fn detail(task: TaskId, selected: usize, input: Option<TextField>) -> Overlay {
    Overlay::Detail {
        task,
        selected,
        input,
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(NoticeBoard::new(Duration::from_secs(4), 3))
    }
}
