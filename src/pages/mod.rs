//! Page controllers.
//!
//! Every screen is a [`PageSpec`] (endpoints, columns, copy, actions) driving
//! one generic [`Page`]. The model only sees the object safe [`Screen`]
//! trait, so it can hold whichever screen is mounted without knowing its
//! record type.

pub mod form;
pub mod repair;
pub mod settings;
pub mod store;

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::query;
use crate::domain::DeskError;
use crate::fetch::{Applied, FetchTracker, LoadState, Ticket, next_mount_id};
use crate::nav::Route;
use crate::records::Record;
use crate::session::UserProfile;
use crate::view::{Column, DataView, TableFrame};

use form::Form;

/// One list endpoint of a screen. Single list screens have exactly one tab.
#[derive(Debug, Clone, PartialEq)]
pub struct Tab {
    pub label: &'static str,
    pub path: &'static str,
    pub query: Vec<(&'static str, &'static str)>,
    pub empty_message: &'static str,
}

impl Tab {
    pub fn new(label: &'static str, path: &'static str, empty_message: &'static str) -> Self {
        Self {
            label,
            path,
            query: Vec::new(),
            empty_message,
        }
    }

    pub fn query(mut self, key: &'static str, value: &'static str) -> Self {
        self.query.push((key, value));
        self
    }
}

/// What an action needs to know besides the selected row.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionContext {
    pub user: UserProfile,
    pub today: NaiveDate,
}

impl ActionContext {
    pub fn today_string(&self) -> String {
        self.today.format(form::DATE_FORMAT).to_string()
    }
}

pub type FormBuilder<R> = Arc<dyn Fn(Option<&R>, &ActionContext) -> Result<Form, DeskError> + Send + Sync>;

pub struct Action<R> {
    pub label: &'static str,
    pub needs_row: bool,
    build: FormBuilder<R>,
}

impl<R: Record> Action<R> {
    /// An action working on the selected row.
    pub fn on_row<F>(label: &'static str, build: F) -> Self
    where
        F: Fn(&R, &ActionContext) -> Result<Form, DeskError> + Send + Sync + 'static,
    {
        Self {
            label,
            needs_row: true,
            build: Arc::new(move |row, ctx| match row {
                Some(row) => build(row, ctx),
                None => Err(DeskError::InvalidInput("Select a row first".into())),
            }),
        }
    }

    /// An action that creates something new.
    pub fn create<F>(label: &'static str, build: F) -> Self
    where
        F: Fn(&ActionContext) -> Result<Form, DeskError> + Send + Sync + 'static,
    {
        Self {
            label,
            needs_row: false,
            build: Arc::new(move |_, ctx| build(ctx)),
        }
    }
}

pub struct PageSpec<R: Record> {
    pub route: Route,
    pub tabs: Vec<Tab>,
    pub columns: Vec<Column<R>>,
    /// `None` derives the fields from the column keys.
    pub search_fields: Option<Vec<&'static str>>,
    pub page_size: usize,
    pub placeholder: &'static str,
    /// Toast shown when a fetch fails.
    pub error_message: &'static str,
    pub actions: Vec<Action<R>>,
    pub export: Option<&'static str>,
}

/// A fetch the model should run off the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchJob {
    pub ticket: Ticket,
    pub path: &'static str,
    pub query: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Up,
    Down,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
}

pub trait Screen {
    fn route(&self) -> Route;
    fn mount(&self) -> u64;
    fn tabs(&self) -> Vec<&'static str>;
    fn active_tab(&self) -> usize;
    /// Switches to the next tab, `false` when there is only one.
    fn next_tab(&mut self) -> bool;
    fn frame(&self) -> TableFrame;
    fn is_searchable(&self) -> bool;
    fn query(&self) -> &str;
    fn set_query(&mut self, query: &str);
    fn navigate(&mut self, nav: Nav);
    fn load_state(&self) -> &LoadState;
    /// `None` when the screen has no endpoint to load from.
    fn begin_fetch(&mut self) -> Option<FetchJob>;
    /// Applies a finished fetch, returning the row count when it was current.
    fn apply_fetch(&mut self, ticket: Ticket, result: Result<Vec<Value>, DeskError>) -> Applied<usize>;
    fn error_message(&self) -> &'static str;
    fn actions(&self) -> Vec<&'static str>;
    fn open_action(&self, index: usize, ctx: &ActionContext) -> Result<Form, DeskError>;
    fn export_path(&self) -> Option<&'static str>;
    fn selected_as_csv(&self) -> Option<String>;
    fn selected_key(&self) -> Option<String>;
}

/// A mounted screen: its `PageSpec`, view state and fetch tracker.
pub struct Page<R: Record> {
    route: Route,
    tabs: Vec<Tab>,
    tab: usize,
    error_message: &'static str,
    actions: Vec<Action<R>>,
    export: Option<&'static str>,
    view: DataView<R>,
    tracker: FetchTracker,
}

impl<R: Record> Page<R> {
    pub fn new(spec: PageSpec<R>) -> Self {
        let empty = spec.tabs.first().map(|t| t.empty_message).unwrap_or("No records found");
        let mut view = DataView::new(spec.columns)
            .page_size(spec.page_size)
            .placeholder(spec.placeholder)
            .empty_message(empty);
        if let Some(fields) = &spec.search_fields {
            view = view.search_fields(fields);
        }
        Self {
            route: spec.route,
            tabs: spec.tabs,
            tab: 0,
            error_message: spec.error_message,
            actions: spec.actions,
            export: spec.export,
            view,
            tracker: FetchTracker::new(next_mount_id()),
        }
    }

    #[cfg(test)]
    pub fn view(&self) -> &DataView<R> {
        &self.view
    }
}

impl<R: Record> Screen for Page<R> {
    fn route(&self) -> Route {
        self.route
    }

    fn mount(&self) -> u64 {
        self.tracker.mount()
    }

    fn tabs(&self) -> Vec<&'static str> {
        self.tabs.iter().map(|t| t.label).collect()
    }

    fn active_tab(&self) -> usize {
        self.tab
    }

    fn next_tab(&mut self) -> bool {
        if self.tabs.len() < 2 {
            return false;
        }
        self.tab = (self.tab + 1) % self.tabs.len();
        self.view.set_empty_message(self.tabs[self.tab].empty_message);
        self.view.first_page();
        debug!("{} switched to tab {}", self.route.title(), self.tabs[self.tab].label);
        true
    }

    fn frame(&self) -> TableFrame {
        self.view.frame()
    }

    fn is_searchable(&self) -> bool {
        self.view.is_searchable()
    }

    fn query(&self) -> &str {
        self.view.query()
    }

    fn set_query(&mut self, query: &str) {
        self.view.set_query(query);
    }

    fn navigate(&mut self, nav: Nav) {
        match nav {
            Nav::Up => self.view.move_up(),
            Nav::Down => self.view.move_down(),
            Nav::NextPage => self.view.next_page(),
            Nav::PrevPage => self.view.prev_page(),
            Nav::FirstPage => self.view.first_page(),
            Nav::LastPage => self.view.last_page(),
        }
    }

    fn load_state(&self) -> &LoadState {
        self.tracker.state()
    }

    fn begin_fetch(&mut self) -> Option<FetchJob> {
        let Some(tab) = self.tabs.get(self.tab) else {
            warn!("{} has no tab to fetch", self.route.title());
            return None;
        };
        let (path, query) = (tab.path, query(&tab.query));
        let ticket = self.tracker.begin();
        self.view.set_loading(true);
        Some(FetchJob { ticket, path, query })
    }

    fn apply_fetch(&mut self, ticket: Ticket, result: Result<Vec<Value>, DeskError>) -> Applied<usize> {
        match self.tracker.finish(ticket, result) {
            Applied::Stale => Applied::Stale,
            Applied::Loaded(values) => {
                let rows: Vec<R> = values.iter().map(R::from_json).collect();
                let count = rows.len();
                self.view.set_rows(rows);
                self.view.set_loading(false);
                Applied::Loaded(count)
            }
            Applied::Failed(e) => {
                warn!("{} failed to load: {e}", self.route.title());
                self.view.set_loading(false);
                Applied::Failed(e)
            }
        }
    }

    fn error_message(&self) -> &'static str {
        self.error_message
    }

    fn actions(&self) -> Vec<&'static str> {
        self.actions.iter().map(|a| a.label).collect()
    }

    fn open_action(&self, index: usize, ctx: &ActionContext) -> Result<Form, DeskError> {
        let action = self
            .actions
            .get(index)
            .ok_or_else(|| DeskError::InvalidInput("No such action".into()))?;
        let row = if action.needs_row { self.view.selected() } else { None };
        (action.build)(row, ctx)
    }

    fn export_path(&self) -> Option<&'static str> {
        self.export
    }

    fn selected_as_csv(&self) -> Option<String> {
        self.view.selected_as_csv()
    }

    fn selected_key(&self) -> Option<String> {
        self.view.selected().and_then(|r| r.row_key())
    }
}

/// Builds a fresh, empty screen for a route.
pub fn open(route: Route) -> Box<dyn Screen> {
    match route {
        Route::RepairIndent => Box::new(Page::new(repair::repair_indent())),
        Route::VendorDispatch => Box::new(Page::new(repair::vendor_dispatch())),
        Route::RepairPayments => Box::new(Page::new(repair::repair_payments())),
        Route::GatePassFollowup => Box::new(Page::new(repair::gate_pass_followup())),
        Route::Indents => Box::new(Page::new(store::indents())),
        Route::ApproveIndent => Box::new(Page::new(store::approve_indent())),
        Route::ApproveIndentData => Box::new(Page::new(store::approve_indent_data())),
        Route::PurchaseOrders => Box::new(Page::new(store::purchase_orders())),
        Route::Inventory => Box::new(Page::new(store::inventory())),
        Route::VendorRateApproval => Box::new(Page::new(store::vendor_rate_approval())),
        Route::StoreOutApproval => Box::new(Page::new(store::store_out_approval())),
        Route::Users => Box::new(Page::new(settings::users())),
    }
}

/// The key of a row an action works on, or an input error naming it.
pub(crate) fn row_key(value: Option<String>, what: &str) -> Result<String, DeskError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| DeskError::InvalidInput(format!("Selected row has no {what}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RepairTask;
    use crate::view::TableBody;
    use serde_json::json;

    fn ctx() -> ActionContext {
        ActionContext {
            user: UserProfile {
                user_name: "Asha".into(),
                role: "repair".into(),
                employee_id: "S01234".into(),
                department: "Maintenance".into(),
            },
            today: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    #[test]
    fn every_route_opens_with_empty_rows() {
        for route in Route::ALL {
            let screen = open(route);
            assert_eq!(screen.route(), route);
            assert_eq!(screen.load_state(), &LoadState::Idle);
            assert!(!screen.tabs().is_empty());
            assert!(matches!(screen.frame().body, TableBody::Empty(_)));
        }
    }

    #[test]
    fn each_mount_gets_its_own_id() {
        let a = open(Route::Indents);
        let b = open(Route::Indents);
        assert_ne!(a.mount(), b.mount());
    }

    #[test]
    fn fetch_shows_skeleton_then_rows() {
        let mut screen = open(Route::RepairIndent);
        let job = screen.begin_fetch().unwrap();
        assert_eq!(job.path, "/repair/tasks");
        assert_eq!(job.query, vec![("status".to_string(), "pending".to_string())]);
        assert!(matches!(screen.frame().body, TableBody::Skeleton { rows: 15, .. }));

        let rows = vec![json!({"task_no": "TR-1", "machineName": "Press"})];
        assert!(matches!(screen.apply_fetch(job.ticket, Ok(rows)), Applied::Loaded(1)));
        assert_eq!(screen.load_state(), &LoadState::Loaded);
        assert_eq!(screen.selected_key(), Some("TR-1".into()));
    }

    #[test]
    fn out_of_order_responses_keep_the_latest() {
        let mut screen = open(Route::RepairIndent);
        let first = screen.begin_fetch().unwrap();
        assert!(screen.next_tab());
        let second = screen.begin_fetch().unwrap();
        assert_eq!(second.query, vec![("status".to_string(), "history".to_string())]);

        let history = vec![json!({"task_no": "TR-9"})];
        screen.apply_fetch(second.ticket, Ok(history));
        let pending = vec![json!({"task_no": "TR-1"}), json!({"task_no": "TR-2"})];
        assert!(matches!(screen.apply_fetch(first.ticket, Ok(pending)), Applied::Stale));
        assert_eq!(screen.selected_key(), Some("TR-9".into()));
    }

    #[test]
    fn failed_refresh_keeps_previous_rows() {
        let mut screen = open(Route::Indents);
        let job = screen.begin_fetch().unwrap();
        screen.apply_fetch(job.ticket, Ok(vec![json!({"indent_no": "IN-1"})]));
        let job = screen.begin_fetch().unwrap();
        let applied = screen.apply_fetch(job.ticket, Err(DeskError::Status(500, "down".into())));
        assert!(matches!(applied, Applied::Failed(_)));
        assert!(matches!(screen.frame().body, TableBody::Rows(ref r) if r.len() == 1));
        assert!(!screen.frame().loading);
    }

    #[test]
    fn tab_switch_changes_empty_copy() {
        let mut screen = open(Route::RepairPayments);
        assert_eq!(
            screen.frame().body,
            TableBody::Empty("No pending payments found".into())
        );
        screen.next_tab();
        assert_eq!(screen.frame().body, TableBody::Empty("No paid bills found".into()));
    }

    #[test]
    fn single_tab_screens_do_not_switch() {
        let mut screen = open(Route::Inventory);
        assert!(!screen.next_tab());
    }

    #[test]
    fn row_actions_need_a_selection() {
        let screen = open(Route::VendorDispatch);
        let err = screen.open_action(0, &ctx()).unwrap_err();
        assert_eq!(err.to_string(), "Select a row first");
        assert!(screen.open_action(7, &ctx()).is_err());
    }

    #[test]
    fn typed_page_exposes_its_view() {
        let mut page: Page<RepairTask> = Page::new(repair::repair_indent());
        let job = page.begin_fetch().unwrap();
        page.apply_fetch(job.ticket, Ok(vec![json!({"TASK_NO": "TR-5"})]));
        assert_eq!(page.view().rows()[0].task_no.as_deref(), Some("TR-5"));
    }

    #[test]
    fn screen_without_tabs_does_not_fetch() {
        let mut spec = settings::users();
        spec.tabs.clear();
        let mut page = Page::new(spec);
        assert!(page.begin_fetch().is_none());
        assert_eq!(page.load_state(), &LoadState::Idle);
        assert!(!page.frame().loading);
    }
}
