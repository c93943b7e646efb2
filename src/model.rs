use std::path::PathBuf;
use std::time::{Duration, Instant};

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use serde_json::Value;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, error::TryRecvError, unbounded_channel};
use tracing::{debug, error, info, trace, warn};

use crate::api::{ApiClient, UploadRequest, WriteRequest, auth, save_download};
use crate::config::DeskConfig;
use crate::domain::{DeskError, HELP_TEXT, Message, TOAST_SECONDS};
use crate::fetch::{Applied, Ticket};
use crate::inputter::{InputResult, Inputter};
use crate::nav::{MenuPolicy, Route};
use crate::pages::form::{Field, Form, FormEvent, FormView, Submission};
use crate::pages::{self, ActionContext, FetchJob, Nav, Screen};
use crate::session::{UserProfile, now_epoch_seconds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Login,
    Ready,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modus {
    Table,
    Search,
    Menu,
    Actions,
    Form,
    Popup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub level: Level,
    pub message: String,
    created: Instant,
}

impl Toast {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            created: Instant::now(),
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created) >= Duration::from_secs(TOAST_SECONDS)
    }
}

/// Results of work running off the UI thread.
#[derive(Debug)]
pub enum Completion {
    Fetched {
        ticket: Ticket,
        result: Result<Vec<Value>, DeskError>,
    },
    Submitted {
        mount: u64,
        success: String,
        result: Result<Value, DeskError>,
    },
    Exported(Result<PathBuf, DeskError>),
    LoggedIn(Result<UserProfile, DeskError>),
}

pub struct Model {
    config: DeskConfig,
    api: ApiClient,
    policy: MenuPolicy,
    pub status: Status,
    modus: Modus,
    screen: Option<Box<dyn Screen>>,
    menu: Vec<Route>,
    menu_cursor: usize,
    action_cursor: usize,
    form: Option<Form>,
    login: Form,
    login_pending: bool,
    input: Inputter,
    last_input: InputResult,
    toast: Option<Toast>,
    popup_message: String,
    clipboard: Option<Clipboard>,
    completions_tx: UnboundedSender<Completion>,
    completions: UnboundedReceiver<Completion>,
    in_flight: usize,
    ui_size: (usize, usize),
}

fn login_form() -> Form {
    Form::new(
        "Log in",
        vec![
            Field::text("username", "Username").required(),
            Field::secret("password", "Password").required(),
        ],
        |values| {
            Ok(Submission::Login {
                username: values.required("username")?,
                password: values.required("password")?,
            })
        },
    )
}

impl Model {
    /// Starts on the login screen unless a restored session is active.
    /// Must be called inside a tokio runtime.
    pub fn init(config: &DeskConfig, api: ApiClient) -> Self {
        let (completions_tx, completions) = unbounded_channel();
        let mut model = Self {
            config: config.clone(),
            api,
            policy: MenuPolicy::default(),
            status: Status::Login,
            modus: Modus::Table,
            screen: None,
            menu: Vec::new(),
            menu_cursor: 0,
            action_cursor: 0,
            form: None,
            login: login_form(),
            login_pending: false,
            input: Inputter::default(),
            last_input: InputResult::default(),
            toast: None,
            popup_message: String::new(),
            clipboard: None,
            completions_tx,
            completions,
            in_flight: 0,
            ui_size: (0, 0),
        };
        if model.api.session().is_active() {
            model.enter_ready();
        }
        model
    }

    // -------------------- Accessors for the UI ---------------------- //

    pub fn raw_keyevents(&self) -> bool {
        self.status == Status::Login || matches!(self.modus, Modus::Search | Modus::Form)
    }

    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.api.session().user()
    }

    pub fn menu(&self) -> &[Route] {
        &self.menu
    }

    /// Cursor into the menu while it is open.
    pub fn menu_cursor(&self) -> Option<usize> {
        (self.modus == Modus::Menu).then_some(self.menu_cursor)
    }

    pub fn screen(&self) -> Option<&dyn Screen> {
        self.screen.as_deref()
    }

    pub fn search_input(&self) -> Option<&InputResult> {
        (self.modus == Modus::Search).then_some(&self.last_input)
    }

    pub fn form_view(&self) -> Option<FormView> {
        match self.status {
            Status::Login => Some(self.login.view()),
            _ if self.modus == Modus::Form => self.form.as_ref().map(Form::view),
            _ => None,
        }
    }

    pub fn login_pending(&self) -> bool {
        self.login_pending
    }

    pub fn action_picker(&self) -> Option<(Vec<&'static str>, usize)> {
        if self.modus != Modus::Actions {
            return None;
        }
        self.screen
            .as_ref()
            .map(|s| (s.actions(), self.action_cursor))
    }

    pub fn popup(&self) -> Option<&str> {
        (self.modus == Modus::Popup).then_some(self.popup_message.as_str())
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    /// Writes or exports still running.
    pub fn busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    fn set_toast(&mut self, level: Level, message: impl Into<String>) {
        let toast = Toast::new(level, message);
        trace!("Toast {:?}: {}", toast.level, toast.message);
        self.toast = Some(toast);
    }

    /// Logs and shows a failure. Errors that end the session go back to login.
    fn fail(&mut self, context: &str, e: DeskError) {
        if e.requires_login() {
            warn!("{context}: {e}");
            self.to_login("Session ended, please log in again");
            return;
        }
        error!("{context}: {e}");
        self.set_toast(Level::Error, format!("{context}: {e}"));
    }

    // -------------------- Session lifecycle ---------------------- //

    fn enter_ready(&mut self) {
        let user = self.user().unwrap_or_default();
        self.menu = self.policy.menu_for(&user);
        self.menu_cursor = 0;
        self.status = Status::Ready;
        self.modus = Modus::Table;
        info!(
            "Ready as {} ({}), menu: {:?}",
            user.user_name,
            user.role,
            self.menu.iter().map(Route::slug).collect::<Vec<_>>()
        );
        if let Some(first) = self.menu.first().copied() {
            self.mount(first);
        }
    }

    fn to_login(&mut self, message: &str) {
        if let Err(e) = self.api.session().logout() {
            warn!("Failed to clear session: {e}");
        }
        self.status = Status::Login;
        self.modus = Modus::Table;
        self.screen = None;
        self.form = None;
        self.menu.clear();
        self.login = login_form();
        self.login_pending = false;
        self.set_toast(Level::Info, message);
    }

    fn logout(&mut self) {
        info!("Logging out");
        self.to_login("Logged out");
    }

    fn submit_login(&mut self) {
        if self.login_pending {
            return;
        }
        match self.login.submit() {
            Ok(Submission::Login { username, password }) => {
                self.login.set_error(None);
                self.login_pending = true;
                let api = self.api.clone();
                let tx = self.completions_tx.clone();
                tokio::spawn(async move {
                    let result = auth::login(&api, &username, &password).await;
                    if tx.send(Completion::LoggedIn(result)).is_err() {
                        debug!("Login finished after shutdown");
                    }
                });
            }
            Ok(_) => warn!("Unexpected submission from login form"),
            Err(e) => self.login.set_error(Some(e.to_string())),
        }
    }

    // -------------------- Screens and fetching ---------------------- //

    /// Replaces the mounted screen with a fresh one and fetches its rows.
    pub fn mount(&mut self, route: Route) {
        if !self.policy.allows(&self.user().unwrap_or_default(), route) {
            self.set_toast(Level::Error, format!("{} is not in your menu", route.title()));
            return;
        }
        info!("Mounting {}", route.slug());
        if let Some(idx) = self.menu.iter().position(|r| *r == route) {
            self.menu_cursor = idx;
        }
        self.screen = Some(pages::open(route));
        self.refetch();
    }

    fn refetch(&mut self) {
        if let Some(screen) = self.screen.as_mut() {
            if let Some(job) = screen.begin_fetch() {
                self.spawn_fetch(job);
            }
        }
    }

    fn spawn_fetch(&self, job: FetchJob) {
        debug!("Fetching {} {:?} as {:?}", job.path, job.query, job.ticket);
        let api = self.api.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = api.get_rows(job.path, &job.query).await;
            if tx
                .send(Completion::Fetched {
                    ticket: job.ticket,
                    result,
                })
                .is_err()
            {
                debug!("Fetch finished after shutdown");
            }
        });
    }

    fn spawn_write(&mut self, write: WriteRequest, success: String) {
        let Some(mount) = self.screen.as_ref().map(|s| s.mount()) else {
            return;
        };
        self.in_flight += 1;
        let api = self.api.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = api.send(&write).await;
            let done = Completion::Submitted { mount, success, result };
            if tx.send(done).is_err() {
                debug!("Write finished after shutdown");
            }
        });
    }

    fn spawn_upload(&mut self, upload: UploadRequest, success: String) {
        let Some(mount) = self.screen.as_ref().map(|s| s.mount()) else {
            return;
        };
        self.in_flight += 1;
        let api = self.api.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = api.upload(&upload).await;
            let done = Completion::Submitted { mount, success, result };
            if tx.send(done).is_err() {
                debug!("Upload finished after shutdown");
            }
        });
    }

    fn export(&mut self) {
        let Some(path) = self.screen.as_ref().and_then(|s| s.export_path()) else {
            self.set_toast(Level::Info, "Nothing to export on this screen");
            return;
        };
        self.in_flight += 1;
        self.set_toast(Level::Info, "Exporting…");
        let api = self.api.clone();
        let tx = self.completions_tx.clone();
        let dir = self.config.download_dir.clone();
        tokio::spawn(async move {
            let result = match api.download(path, &[]).await {
                Ok(download) => save_download(&dir, &download),
                Err(e) => Err(e),
            };
            if tx.send(Completion::Exported(result)).is_err() {
                debug!("Export finished after shutdown");
            }
        });
    }

    /// Drains finished background work and expires the toast.
    pub fn tick(&mut self) {
        let now = Instant::now();
        if self.toast.as_ref().is_some_and(|t| t.is_expired(now)) {
            self.toast = None;
        }
        loop {
            match self.completions.try_recv() {
                Ok(done) => self.complete(done),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Completion channel closed");
                    break;
                }
            }
        }
        if self.status == Status::Ready && !self.api.session().check_expiry(now_epoch_seconds()) {
            self.to_login("Session expired, please log in again");
        }
    }

    pub fn complete(&mut self, done: Completion) {
        match done {
            Completion::Fetched { ticket, result } => {
                let Some(screen) = self.screen.as_mut() else {
                    debug!("Dropping fetch {:?}, nothing mounted", ticket);
                    return;
                };
                match screen.apply_fetch(ticket, result) {
                    Applied::Loaded(count) => debug!("{} loaded {count} rows", screen.route().slug()),
                    Applied::Stale => {}
                    Applied::Failed(e) => {
                        let context = screen.error_message();
                        self.fail(context, e);
                    }
                }
            }
            Completion::Submitted { mount, success, result } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                match result {
                    Ok(_) => {
                        info!("{success}");
                        self.set_toast(Level::Success, success);
                        if self.screen.as_ref().is_some_and(|s| s.mount() == mount) {
                            self.refetch();
                        }
                    }
                    Err(e) => self.fail("Save failed", e),
                }
            }
            Completion::Exported(result) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                match result {
                    Ok(path) => self.set_toast(Level::Success, format!("Saved {}", path.display())),
                    Err(e) => self.fail("Export failed", e),
                }
            }
            Completion::LoggedIn(result) => {
                self.login_pending = false;
                match result {
                    Ok(user) => {
                        let name = if user.user_name.is_empty() { "back" } else { user.user_name.as_str() };
                        let greeting = format!("Welcome {name}");
                        self.enter_ready();
                        self.set_toast(Level::Success, greeting);
                    }
                    Err(e) => {
                        warn!("Login failed: {e}");
                        self.login.set_error(Some(e.to_string()));
                    }
                }
            }
        }
    }

    // -------------------- Message handling ---------------------- //

    pub fn update(&mut self, message: Option<Message>) -> Result<(), DeskError> {
        let Some(msg) = message else {
            return Ok(());
        };
        if let Message::Resize(width, height) = msg {
            self.ui_resize(width, height);
            return Ok(());
        }
        if msg == Message::Quit {
            self.quit();
            return Ok(());
        }

        if self.status == Status::Login {
            if let Message::RawKey(key) = msg {
                self.login_key(key);
            }
            return Ok(());
        }

        match self.modus {
            Modus::Table => match msg {
                Message::MoveUp => self.navigate(Nav::Up),
                Message::MoveDown => self.navigate(Nav::Down),
                Message::NextPage => self.navigate(Nav::NextPage),
                Message::PrevPage => self.navigate(Nav::PrevPage),
                Message::FirstPage => self.navigate(Nav::FirstPage),
                Message::LastPage => self.navigate(Nav::LastPage),
                Message::NextTab => self.next_tab(),
                Message::Search => self.enter_search(),
                Message::Enter => self.open_actions(),
                Message::Action(idx) => self.open_action(idx),
                Message::Refresh => self.refetch(),
                Message::Export => self.export(),
                Message::CopyRow => self.copy_row(),
                Message::Menu => self.modus = Modus::Menu,
                Message::Logout => self.logout(),
                Message::Help => self.show_help(),
                Message::Exit => self.clear_search(),
                _ => (),
            },
            Modus::Menu => match msg {
                Message::MoveUp => self.menu_cursor = self.menu_cursor.saturating_sub(1),
                Message::MoveDown => {
                    if self.menu_cursor + 1 < self.menu.len() {
                        self.menu_cursor += 1;
                    }
                }
                Message::Enter => {
                    self.modus = Modus::Table;
                    if let Some(route) = self.menu.get(self.menu_cursor).copied() {
                        self.mount(route);
                    }
                }
                Message::Exit | Message::Menu => self.modus = Modus::Table,
                Message::Logout => self.logout(),
                _ => (),
            },
            Modus::Actions => match msg {
                Message::MoveUp => self.action_cursor = self.action_cursor.saturating_sub(1),
                Message::MoveDown => {
                    let count = self.screen.as_ref().map(|s| s.actions().len()).unwrap_or(0);
                    if self.action_cursor + 1 < count {
                        self.action_cursor += 1;
                    }
                }
                Message::Enter => self.open_action(self.action_cursor),
                Message::Action(idx) => self.open_action(idx),
                Message::Exit => self.modus = Modus::Table,
                _ => (),
            },
            Modus::Popup => match msg {
                Message::Exit | Message::Enter | Message::Help => self.modus = Modus::Table,
                _ => (),
            },
            Modus::Search => {
                if let Message::RawKey(key) = msg {
                    self.search_key(key);
                }
            }
            Modus::Form => {
                if let Message::RawKey(key) = msg {
                    self.form_key(key);
                }
            }
        }
        Ok(())
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.ui_size.0, width, self.ui_size.1, height
        );
        self.ui_size = (width, height);
    }

    fn navigate(&mut self, nav: Nav) {
        if let Some(screen) = self.screen.as_mut() {
            screen.navigate(nav);
        }
    }

    fn next_tab(&mut self) {
        if self.screen.as_mut().is_some_and(|s| s.next_tab()) {
            self.refetch();
        }
    }

    fn show_help(&mut self) {
        self.popup_message = HELP_TEXT.to_string();
        self.modus = Modus::Popup;
    }

    fn enter_search(&mut self) {
        let Some(screen) = self.screen.as_ref() else {
            return;
        };
        if !screen.is_searchable() {
            return;
        }
        self.input.set(screen.query());
        self.last_input = self.input.get();
        self.modus = Modus::Search;
    }

    fn clear_search(&mut self) {
        if let Some(screen) = self.screen.as_mut() {
            screen.set_query("");
        }
    }

    fn search_key(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if let Some(screen) = self.screen.as_mut() {
            screen.set_query(&self.last_input.input);
        }
        if self.last_input.finished {
            trace!("Search done: {:?}", self.last_input.input);
            self.modus = Modus::Table;
        }
    }

    fn login_key(&mut self, key: KeyEvent) {
        match self.login.key(key) {
            FormEvent::Editing => {}
            FormEvent::Submit => self.submit_login(),
            FormEvent::Cancel => self.quit(),
        }
    }

    fn open_actions(&mut self) {
        let count = self.screen.as_ref().map(|s| s.actions().len()).unwrap_or(0);
        match count {
            0 => self.set_toast(Level::Info, "No actions on this screen"),
            1 => self.open_action(0),
            _ => {
                self.action_cursor = 0;
                self.modus = Modus::Actions;
            }
        }
    }

    fn open_action(&mut self, idx: usize) {
        let Some(screen) = self.screen.as_ref() else {
            return;
        };
        let ctx = ActionContext {
            user: self.user().unwrap_or_default(),
            today: chrono::Local::now().date_naive(),
        };
        match screen.open_action(idx, &ctx) {
            Ok(form) => {
                debug!("Opened form \"{}\" on row {:?}", form.title(), screen.selected_key());
                self.form = Some(form);
                self.modus = Modus::Form;
            }
            Err(e) => {
                self.modus = Modus::Table;
                self.set_toast(Level::Error, e.to_string());
            }
        }
    }

    fn form_key(&mut self, key: KeyEvent) {
        let Some(form) = self.form.as_mut() else {
            self.modus = Modus::Table;
            return;
        };
        match form.key(key) {
            FormEvent::Editing => {}
            FormEvent::Cancel => {
                self.form = None;
                self.modus = Modus::Table;
            }
            FormEvent::Submit => match form.submit() {
                Ok(submission) => {
                    let success = form.success_message().to_string();
                    self.form = None;
                    self.modus = Modus::Table;
                    match submission {
                        Submission::Write(write) => self.spawn_write(write, success),
                        Submission::Upload(upload) => self.spawn_upload(upload, success),
                        Submission::Login { .. } => warn!("Unexpected login submission"),
                    }
                }
                Err(e) => {
                    debug!("Form rejected: {e}");
                    form.set_error(Some(e.to_string()));
                }
            },
        }
    }

    fn copy_row(&mut self) {
        let Some(row) = self.screen.as_ref().and_then(|s| s.selected_as_csv()) else {
            self.set_toast(Level::Info, "No row selected");
            return;
        };
        match self.copy_text(row) {
            Ok(()) => self.set_toast(Level::Success, "Copied row to clipboard"),
            Err(e) => self.fail("Copy failed", e),
        }
    }

    fn copy_text(&mut self, text: String) -> Result<(), DeskError> {
        if self.clipboard.is_none() {
            self.clipboard = Some(Clipboard::new().map_err(|e| DeskError::Clipboard(e.to_string()))?);
        }
        match self.clipboard.as_mut() {
            Some(clipboard) => clipboard
                .set_text(text)
                .map_err(|e| DeskError::Clipboard(e.to_string())),
            None => Err(DeskError::Clipboard("no clipboard".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::LoadState;
    use crate::session::{Session, make_token};
    use crate::view::TableBody;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};
    use serde_json::json;

    fn api(session: Session) -> ApiClient {
        ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1), session).unwrap()
    }

    fn logged_in(role: &str, employee_id: &str) -> Model {
        let session = Session::in_memory();
        let token = make_token(&json!({
            "exp": now_epoch_seconds() + 600,
            "role": role,
            "employee_id": employee_id,
            "user_name": "Asha",
        }));
        session.login(token, None).unwrap();
        Model::init(&DeskConfig::new("http://127.0.0.1:9"), api(session))
    }

    fn key(code: KeyCode) -> Option<Message> {
        Some(Message::RawKey(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn current_ticket(model: &mut Model) -> Ticket {
        let screen = model.screen.as_mut().unwrap();
        screen.begin_fetch().unwrap().ticket
    }

    #[tokio::test]
    async fn starts_on_login_without_session() {
        let model = Model::init(&DeskConfig::new("http://127.0.0.1:9"), api(Session::in_memory()));
        assert_eq!(model.status, Status::Login);
        assert!(model.raw_keyevents());
        assert!(model.form_view().is_some());
    }

    #[tokio::test]
    async fn restored_session_mounts_first_menu_entry() {
        let model = logged_in("store", "S01111");
        assert_eq!(model.status, Status::Ready);
        assert_eq!(model.menu()[0], Route::Indents);
        let screen = model.screen().unwrap();
        assert_eq!(screen.route(), Route::Indents);
        assert_eq!(screen.load_state(), &LoadState::Loading);
    }

    #[test]
    fn mounts_from_a_plain_thread_inside_an_entered_runtime() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = rt.enter();
        let model = logged_in("repair", "R01234");
        assert_eq!(model.status, Status::Ready);
        let screen = model.screen().unwrap();
        assert_eq!(screen.load_state(), &LoadState::Loading);
    }

    #[tokio::test]
    async fn override_user_sees_single_screen() {
        let model = logged_in("store", "S07632");
        assert_eq!(model.menu(), &[Route::StoreOutApproval]);
    }

    #[tokio::test]
    async fn fetch_completion_fills_the_table() {
        let mut model = logged_in("store", "S01111");
        let ticket = current_ticket(&mut model);
        model.complete(Completion::Fetched {
            ticket,
            result: Ok(vec![json!({"indent_no": "IN-1"}), json!({"indent_no": "IN-2"})]),
        });
        match model.screen().unwrap().frame().body {
            TableBody::Rows(rows) => assert_eq!(rows.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_failure_shows_screen_message() {
        let mut model = logged_in("store", "S01111");
        let ticket = current_ticket(&mut model);
        model.complete(Completion::Fetched {
            ticket,
            result: Err(DeskError::Status(500, "boom".into())),
        });
        let toast = model.toast().unwrap();
        assert_eq!(toast.level, Level::Error);
        assert!(toast.message.starts_with("Failed to load indents"));
    }

    #[tokio::test]
    async fn unauthorized_returns_to_login() {
        let mut model = logged_in("store", "S01111");
        let ticket = current_ticket(&mut model);
        model.complete(Completion::Fetched {
            ticket,
            result: Err(DeskError::Unauthorized(401)),
        });
        assert_eq!(model.status, Status::Login);
        assert!(model.screen().is_none());
        assert!(!model.api.session().is_active());
    }

    #[tokio::test]
    async fn search_filters_while_typing() {
        let mut model = logged_in("store", "S01111");
        let ticket = current_ticket(&mut model);
        model.complete(Completion::Fetched {
            ticket,
            result: Ok(vec![
                json!({"indent_no": "IN-1", "item_name": "Bearing"}),
                json!({"indent_no": "IN-2", "item_name": "Gasket"}),
            ]),
        });
        model.update(Some(Message::Search)).unwrap();
        assert!(model.raw_keyevents());
        for c in "gask".chars() {
            model.update(key(KeyCode::Char(c))).unwrap();
        }
        assert_eq!(model.screen().unwrap().query(), "gask");
        model.update(key(KeyCode::Enter)).unwrap();
        assert!(!model.raw_keyevents());
        match model.screen().unwrap().frame().body {
            TableBody::Rows(rows) => assert_eq!(rows[0][1], "Gasket"),
            other => panic!("unexpected {other:?}"),
        }
        model.update(Some(Message::Exit)).unwrap();
        assert_eq!(model.screen().unwrap().query(), "");
    }

    #[tokio::test]
    async fn invalid_form_stays_open_with_error() {
        let mut model = logged_in("store", "S01111");
        model.update(Some(Message::Enter)).unwrap();
        assert_eq!(model.form_view().unwrap().title, "Create indent");
        model.update(key(KeyCode::Enter)).unwrap();
        let view = model.form_view().unwrap();
        assert_eq!(view.error.as_deref(), Some("Item is required"));
        model.update(key(KeyCode::Esc)).unwrap();
        assert!(model.form_view().is_none());
    }

    #[tokio::test]
    async fn successful_write_refetches_the_screen() {
        let mut model = logged_in("store", "S01111");
        let mount = model.screen().unwrap().mount();
        model.in_flight = 1;
        model.complete(Completion::Submitted {
            mount,
            success: "Indent created".into(),
            result: Ok(json!({"success": true})),
        });
        assert!(!model.busy());
        assert_eq!(model.toast().unwrap().message, "Indent created");
        assert_eq!(model.screen().unwrap().load_state(), &LoadState::Loading);
    }

    #[tokio::test]
    async fn export_is_refused_where_unavailable() {
        let mut model = logged_in("store", "S07632");
        model.update(Some(Message::Export)).unwrap();
        assert_eq!(model.toast().unwrap().message, "Nothing to export on this screen");
    }

    #[tokio::test]
    async fn menu_switches_screens() {
        let mut model = logged_in("store", "S01111");
        model.update(Some(Message::Menu)).unwrap();
        assert_eq!(model.menu_cursor(), Some(0));
        model.update(Some(Message::MoveDown)).unwrap();
        model.update(Some(Message::Enter)).unwrap();
        assert_eq!(model.menu_cursor(), None);
        assert_eq!(model.screen().unwrap().route(), model.menu()[1]);
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let mut model = logged_in("repair", "S02222");
        model.update(Some(Message::Logout)).unwrap();
        assert_eq!(model.status, Status::Login);
        assert!(model.menu().is_empty());
        assert_eq!(model.toast().unwrap().message, "Logged out");
    }

    #[tokio::test]
    async fn help_popup_opens_and_closes() {
        let mut model = logged_in("repair", "S02222");
        model.update(Some(Message::Help)).unwrap();
        assert!(model.popup().is_some());
        model.update(Some(Message::Exit)).unwrap();
        assert!(model.popup().is_none());
    }

    #[test]
    fn toasts_expire() {
        let toast = Toast::new(Level::Info, "hello");
        assert!(!toast.is_expired(Instant::now()));
        assert!(toast.is_expired(Instant::now() + Duration::from_secs(TOAST_SECONDS)));
    }
}
