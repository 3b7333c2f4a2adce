use crate::console::Console;
use crate::error::ConsoleError;
use crate::form::{create_form, key_choices, update_form, Field, Form, FormMode};
use crate::storage::{RecordKey, Table};
use crate::viz::{self, Aggregation, ChartKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen {
    Login,
    SignUp,
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Focus {
    Sidebar,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Visualize,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Read,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Visualize,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Action::Read => "Read",
            Action::Create => "Create",
            Action::Update => "Update",
            Action::Delete => "Delete",
            Action::Visualize => "Visualize",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SidebarControl {
    Table,
    Action,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Success(String),
    Error(String),
}

/// Which visualization control has focus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VizControl {
    Chart,
    X,
    Y,
    Aggregation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    /// (category label, aggregated value); nulls are left out.
    Series(Vec<(String, f64)>),
    /// (latitude, longitude)
    Points(Vec<(f64, f64)>),
}

#[derive(Debug, Clone, Default)]
pub struct VizState {
    pub chart: ChartKind,
    pub categories: Vec<String>,
    pub numerics: Vec<String>,
    pub x_index: usize,
    pub y_index: usize,
    pub aggregation: Aggregation,
    pub control: Option<VizControl>,
    pub data: Option<ChartData>,
}

pub struct App {
    pub console: Console,
    pub screen: Screen,
    pub focus: Focus,
    pub should_quit: bool,
    pub status: Option<Status>,

    // Login / sign-up inputs
    pub username: String,
    pub password: String,
    pub auth_field: usize,

    // Main screen
    pub table_index: usize,
    pub action: Action,
    pub sidebar_control: SidebarControl,
    pub table: Option<Table>,
    pub result_scroll: usize,
    pub result_horizontal_scroll: usize,
    pub column_widths: Vec<usize>,

    pub form: Option<Form>,
    pub form_field: usize,
    pub key_choices: Vec<RecordKey>,
    pub key_index: usize,
    pub key_selector_focused: bool,

    pub viz: VizState,
}

impl App {
    pub fn new(console: Console) -> Self {
        Self {
            console,
            screen: Screen::Login,
            focus: Focus::Sidebar,
            should_quit: false,
            status: None,
            username: String::new(),
            password: String::new(),
            auth_field: 0,
            table_index: 0,
            action: Action::Read,
            sidebar_control: SidebarControl::Table,
            table: None,
            result_scroll: 0,
            result_horizontal_scroll: 0,
            column_widths: Vec::new(),
            form: None,
            form_field: 0,
            key_choices: Vec::new(),
            key_index: 0,
            key_selector_focused: true,
            viz: VizState::default(),
        }
    }

    fn succeed(&mut self, message: impl Into<String>) {
        self.status = Some(Status::Success(message.into()));
    }

    fn fail(&mut self, err: &ConsoleError) {
        self.status = Some(Status::Error(err.user_message()));
    }

    // ----- login / sign-up ---------------------------------------------

    pub fn auth_input_mut(&mut self) -> &mut String {
        if self.auth_field == 0 {
            &mut self.username
        } else {
            &mut self.password
        }
    }

    pub fn toggle_auth_field(&mut self) {
        self.auth_field = 1 - self.auth_field;
    }

    pub fn toggle_auth_screen(&mut self) {
        self.screen = match self.screen {
            Screen::Login => Screen::SignUp,
            _ => Screen::Login,
        };
        self.status = None;
        self.password.clear();
    }

    pub fn submit_auth(&mut self) {
        match self.screen {
            Screen::SignUp => match self.console.sign_up(&self.username, &self.password) {
                Ok(()) => {
                    self.screen = Screen::Login;
                    self.password.clear();
                    self.succeed("Account created! Please log in.");
                }
                Err(e) => self.fail(&e),
            },
            Screen::Login => {
                let (username, password) = (self.username.clone(), self.password.clone());
                match self.console.login(&username, &password) {
                    Ok(()) => {
                        self.screen = Screen::Main;
                        self.focus = Focus::Sidebar;
                        self.password.clear();
                        self.succeed(format!("Welcome, {}!", username));
                        self.refresh();
                    }
                    Err(e) => {
                        self.password.clear();
                        self.fail(&e);
                    }
                }
            }
            Screen::Main => {}
        }
    }

    pub fn logout(&mut self) {
        self.console.logout();
        self.screen = Screen::Login;
        self.auth_field = 0;
        self.table = None;
        self.form = None;
        self.viz = VizState::default();
        self.succeed("You've been logged out.");
    }

    // ----- sidebar -------------------------------------------------------

    pub fn table_name(&self) -> Option<&str> {
        self.console.tables().get(self.table_index).copied()
    }

    pub fn next_sidebar_control(&mut self) {
        self.sidebar_control = match self.sidebar_control {
            SidebarControl::Table => SidebarControl::Action,
            SidebarControl::Action => SidebarControl::Table,
        };
    }

    pub fn cycle_sidebar(&mut self, forward: bool) {
        match self.sidebar_control {
            SidebarControl::Table => {
                let count = self.console.tables().len();
                self.table_index = cycle(self.table_index, count, forward);
                self.viz = VizState::default();
            }
            SidebarControl::Action => {
                let current = Action::ALL
                    .iter()
                    .position(|a| *a == self.action)
                    .unwrap_or(0);
                self.action = Action::ALL[cycle(current, Action::ALL.len(), forward)];
            }
        }
        self.refresh();
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Sidebar => Focus::Content,
            Focus::Content => Focus::Sidebar,
        };
    }

    /// Reloads the selected table and rebuilds the state of the current
    /// action from it.
    pub fn refresh(&mut self) {
        let Some(name) = self.table_name().map(str::to_string) else {
            return;
        };
        let table = match self.console.load(&name) {
            Ok(table) => table,
            Err(e) => {
                self.table = None;
                self.fail(&e);
                return;
            }
        };

        self.calculate_column_widths(&table);
        self.result_scroll = self.result_scroll.min(table.row_count().saturating_sub(1));
        self.key_choices = key_choices(&table);
        self.key_index = self.key_index.min(self.key_choices.len().saturating_sub(1));
        self.table = Some(table);

        match self.action {
            Action::Create => {
                self.form = self.table.as_ref().map(create_form);
                self.form_field = 0;
            }
            Action::Update => {
                self.key_selector_focused = true;
                self.rebuild_update_form();
            }
            Action::Visualize => self.refresh_viz_columns(),
            Action::Read | Action::Delete => self.form = None,
        }
    }

    fn calculate_column_widths(&mut self, table: &Table) {
        self.column_widths = table
            .schema
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let header_width = col.name.len();
                let max_value_width = table
                    .rows
                    .iter()
                    .map(|row| row.values.get(i).map_or(0, |v| v.to_string().len()))
                    .max()
                    .unwrap_or(0);
                header_width.max(max_value_width).max(4) // minimum width of 4
            })
            .collect();
    }

    // ----- read ----------------------------------------------------------

    pub fn scroll_results_up(&mut self) {
        self.result_scroll = self.result_scroll.saturating_sub(1);
    }

    pub fn scroll_results_down(&mut self) {
        if let Some(ref table) = self.table {
            if self.result_scroll < table.row_count().saturating_sub(1) {
                self.result_scroll += 1;
            }
        }
    }

    pub fn scroll_results_left(&mut self) {
        self.result_horizontal_scroll = self.result_horizontal_scroll.saturating_sub(1);
    }

    pub fn scroll_results_right(&mut self) {
        if self.result_horizontal_scroll + 1 < self.column_widths.len() {
            self.result_horizontal_scroll += 1;
        }
    }

    pub fn page_up(&mut self) {
        self.result_scroll = self.result_scroll.saturating_sub(10);
    }

    pub fn page_down(&mut self) {
        if let Some(ref table) = self.table {
            let last = table.row_count().saturating_sub(1);
            self.result_scroll = (self.result_scroll + 10).min(last);
        }
    }

    pub fn scroll_to_top(&mut self) {
        self.result_scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        if let Some(ref table) = self.table {
            self.result_scroll = table.row_count().saturating_sub(1);
        }
    }

    // ----- create / update / delete -------------------------------------

    pub fn selected_key(&self) -> Option<&RecordKey> {
        self.key_choices.get(self.key_index)
    }

    pub fn cycle_key(&mut self, forward: bool) {
        self.key_index = cycle(self.key_index, self.key_choices.len(), forward);
        if self.action == Action::Update {
            self.rebuild_update_form();
        }
    }

    fn rebuild_update_form(&mut self) {
        self.form = match (self.table.as_ref(), self.key_choices.get(self.key_index)) {
            (Some(table), Some(key)) => update_form(table, key).ok(),
            _ => None,
        };
        self.form_field = self.first_editable_field();
    }

    fn first_editable_field(&self) -> usize {
        self.form
            .as_ref()
            .and_then(|f| f.fields.iter().position(|field| !field.read_only))
            .unwrap_or(0)
    }

    pub fn move_field(&mut self, forward: bool) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        if self.action == Action::Update && self.key_selector_focused {
            // The key selector sits above the first field.
            if forward {
                self.key_selector_focused = false;
                self.form_field = self.first_editable_field();
            }
            return;
        }

        let editable = |i: &usize| form.fields.get(*i).is_some_and(|f| !f.read_only);
        let next = if forward {
            (self.form_field + 1..form.fields.len()).find(editable)
        } else {
            (0..self.form_field).rev().find(editable)
        };
        match next {
            Some(i) => self.form_field = i,
            None if !forward && self.action == Action::Update => self.key_selector_focused = true,
            None => {}
        }
    }

    fn active_field_editable(&self) -> bool {
        !(self.action == Action::Update && self.key_selector_focused)
    }

    fn active_field_mut(&mut self) -> Option<&mut Field> {
        let index = self.form_field;
        self.form.as_mut().and_then(|f| f.fields.get_mut(index))
    }

    pub fn insert_char(&mut self, c: char) {
        if !self.active_field_editable() {
            return;
        }
        if let Some(field) = self.active_field_mut() {
            if !field.read_only {
                field.text.push(c);
            }
        }
    }

    pub fn delete_char(&mut self) {
        if !self.active_field_editable() {
            return;
        }
        if let Some(field) = self.active_field_mut() {
            if !field.read_only {
                field.text.pop();
            }
        }
    }

    pub fn step_field(&mut self, up: bool) {
        if self.action == Action::Update && self.key_selector_focused {
            self.cycle_key(up);
            return;
        }
        if let Some(field) = self.active_field_mut() {
            if up {
                field.step_up();
            } else {
                field.step_down();
            }
        }
    }

    pub fn submit_form(&mut self) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        let message = match &form.mode {
            FormMode::Create => "Record inserted!",
            FormMode::Update(_) => "Record updated!",
        };
        let nothing_to_save = form.editable_fields().next().is_none();
        match self.console.submit(form) {
            Ok(0) if nothing_to_save => self.succeed("Nothing to update."),
            Ok(0) => {
                self.succeed("No record matched; nothing changed.");
                self.refresh();
            }
            Ok(_) => {
                self.succeed(message);
                self.refresh();
            }
            Err(e) => self.fail(&e),
        }
    }

    pub fn delete_selected(&mut self) {
        let (Some(name), Some(key)) = (self.table_name(), self.selected_key()) else {
            return;
        };
        let (name, key) = (name.to_string(), key.clone());
        let message = match self.console.delete(&name, &key) {
            Ok(0) => "No record matched; nothing changed.",
            Ok(_) => "Record deleted!",
            Err(e) => return self.fail(&e),
        };
        self.succeed(message);
        self.refresh();
    }

    // ----- visualize -----------------------------------------------------

    fn refresh_viz_columns(&mut self) {
        let Some(table) = self.table.as_ref() else {
            return;
        };
        self.viz.categories = viz::categorical_columns(&table.schema)
            .iter()
            .map(|c| c.name.clone())
            .collect();
        self.viz.numerics = viz::numeric_columns(&table.schema)
            .iter()
            .map(|c| c.name.clone())
            .collect();
        let last_x = self.viz.categories.len().saturating_sub(1);
        let last_y = self.viz.numerics.len().saturating_sub(1);
        self.viz.x_index = self.viz.x_index.min(last_x);
        self.viz.y_index = self.viz.y_index.min(last_y);
        self.viz.control.get_or_insert(VizControl::Chart);
        self.refresh_chart();
    }

    pub fn refresh_chart(&mut self) {
        let Some(table) = self.table.as_ref() else {
            return;
        };
        let result = match self.viz.chart {
            ChartKind::Map => viz::map_points(table).map(ChartData::Points),
            ChartKind::Bar | ChartKind::Line => {
                let (Some(x), Some(y)) = (
                    self.viz.categories.get(self.viz.x_index),
                    self.viz.numerics.get(self.viz.y_index),
                ) else {
                    self.viz.data = None;
                    return;
                };
                viz::aggregate(table, x, y, self.viz.aggregation).map(|groups| {
                    ChartData::Series(
                        groups
                            .into_iter()
                            .filter_map(|(label, value)| {
                                Some((label.to_string(), value.as_float()?))
                            })
                            .collect(),
                    )
                })
            }
        };

        match result {
            Ok(data) => self.viz.data = Some(data),
            Err(e) => {
                self.viz.data = None;
                self.fail(&e);
            }
        }
    }

    pub fn move_viz_control(&mut self, forward: bool) {
        let controls: &[VizControl] = match self.viz.chart {
            ChartKind::Map => &[VizControl::Chart],
            _ => &[
                VizControl::Chart,
                VizControl::X,
                VizControl::Y,
                VizControl::Aggregation,
            ],
        };
        let current = self
            .viz
            .control
            .and_then(|c| controls.iter().position(|x| *x == c))
            .unwrap_or(0);
        let next = if forward {
            (current + 1).min(controls.len() - 1)
        } else {
            current.saturating_sub(1)
        };
        self.viz.control = Some(controls[next]);
    }

    pub fn cycle_viz_value(&mut self, forward: bool) {
        match self.viz.control.unwrap_or(VizControl::Chart) {
            VizControl::Chart => {
                let current = ChartKind::ALL
                    .iter()
                    .position(|c| *c == self.viz.chart)
                    .unwrap_or(0);
                self.viz.chart = ChartKind::ALL[cycle(current, ChartKind::ALL.len(), forward)];
            }
            VizControl::X => {
                self.viz.x_index = cycle(self.viz.x_index, self.viz.categories.len(), forward);
            }
            VizControl::Y => {
                self.viz.y_index = cycle(self.viz.y_index, self.viz.numerics.len(), forward);
            }
            VizControl::Aggregation => {
                let current = Aggregation::ALL
                    .iter()
                    .position(|a| *a == self.viz.aggregation)
                    .unwrap_or(0);
                self.viz.aggregation =
                    Aggregation::ALL[cycle(current, Aggregation::ALL.len(), forward)];
            }
        }
        self.status = None;
        self.refresh_chart();
    }

    pub fn reload_schema(&mut self) {
        match self.console.reload_schema() {
            Ok(()) => {
                self.succeed("Schema reloaded.");
                self.refresh();
            }
            Err(e) => self.fail(&e),
        }
    }
}

fn cycle(index: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        0
    } else if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    }
}
