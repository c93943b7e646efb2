//! Modal forms opened by page actions.
//!
//! A form is a list of typed fields edited one at a time through the shared
//! [`Inputter`]. Submitting validates every field and hands the typed values
//! to a pure build step that describes the request to send. Nothing here
//! talks to the network.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use ratatui::crossterm::event::{KeyCode, KeyEvent};
use tracing::debug;

use crate::api::{UploadRequest, WriteRequest};
use crate::domain::DeskError;
use crate::inputter::Inputter;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Secret,
    Number,
    /// `YYYY-MM-DD`
    Date,
    Choice(Vec<&'static str>),
    /// Path to a local file, `~` is expanded.
    File,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub value: String,
}

impl Field {
    fn of(kind: FieldKind, name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            value: String::new(),
        }
    }

    pub fn text(name: &'static str, label: &'static str) -> Self {
        Self::of(FieldKind::Text, name, label)
    }

    pub fn secret(name: &'static str, label: &'static str) -> Self {
        Self::of(FieldKind::Secret, name, label)
    }

    pub fn number(name: &'static str, label: &'static str) -> Self {
        Self::of(FieldKind::Number, name, label)
    }

    pub fn date(name: &'static str, label: &'static str) -> Self {
        Self::of(FieldKind::Date, name, label)
    }

    pub fn file(name: &'static str, label: &'static str) -> Self {
        Self::of(FieldKind::File, name, label)
    }

    /// A choice starts on its first option.
    pub fn choice(name: &'static str, label: &'static str, options: &[&'static str]) -> Self {
        let mut field = Self::of(FieldKind::Choice(options.to_vec()), name, label);
        field.value = options.first().map(|o| o.to_string()).unwrap_or_default();
        field
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn initial(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Prefills from an optional row value, leaving the field as is otherwise.
    pub fn prefill<T: fmt::Display>(self, value: Option<T>) -> Self {
        match value {
            Some(v) => self.initial(v.to_string()),
            None => self,
        }
    }

    fn hint(&self) -> Option<String> {
        match &self.kind {
            FieldKind::Date => Some("YYYY-MM-DD".to_string()),
            FieldKind::Choice(options) => Some(format!("←/→ {}", options.join(" | "))),
            FieldKind::File => Some("path to file".to_string()),
            _ => None,
        }
    }

    fn cycle(&mut self, step: isize) {
        if let FieldKind::Choice(options) = &self.kind
            && !options.is_empty()
        {
            let current = options
                .iter()
                .position(|o| o.eq_ignore_ascii_case(self.value.trim()))
                .unwrap_or(0) as isize;
            let len = options.len() as isize;
            let next = (current + step).rem_euclid(len) as usize;
            self.value = options[next].to_string();
        }
    }

    /// Checks the raw text and returns its canonical form, `None` when blank.
    fn validate(&self) -> Result<Option<String>, DeskError> {
        let raw = self.value.trim();
        if raw.is_empty() {
            if self.required {
                return Err(DeskError::InvalidInput(format!("{} is required", self.label)));
            }
            return Ok(None);
        }
        let canonical = match &self.kind {
            FieldKind::Text | FieldKind::Secret => raw.to_string(),
            FieldKind::Number => {
                let cleaned = raw.replace(',', "");
                match cleaned.parse::<f64>() {
                    Ok(n) if n.is_finite() => cleaned,
                    _ => {
                        return Err(DeskError::InvalidInput(format!(
                            "{} must be a number",
                            self.label
                        )));
                    }
                }
            }
            FieldKind::Date => {
                NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
                    DeskError::InvalidInput(format!("{} must be a date (YYYY-MM-DD)", self.label))
                })?;
                raw.to_string()
            }
            FieldKind::Choice(options) => options
                .iter()
                .find(|o| o.eq_ignore_ascii_case(raw))
                .map(|o| o.to_string())
                .ok_or_else(|| {
                    DeskError::InvalidInput(format!(
                        "{} must be one of {}",
                        self.label,
                        options.join(", ")
                    ))
                })?,
            FieldKind::File => {
                let expanded = shellexpand::tilde(raw).to_string();
                if !PathBuf::from(&expanded).is_file() {
                    return Err(DeskError::InvalidInput(format!(
                        "{}: no such file {expanded}",
                        self.label
                    )));
                }
                expanded
            }
        };
        Ok(Some(canonical))
    }
}

/// Validated, canonical field values keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormValues(HashMap<&'static str, String>);

impl FormValues {
    pub fn text(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }

    pub fn required(&self, name: &str) -> Result<String, DeskError> {
        self.text(name)
            .ok_or_else(|| DeskError::InvalidInput(format!("{name} is required")))
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(|v| v.parse().ok())
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        self.0
            .get(name)
            .and_then(|v| NaiveDate::parse_from_str(v, DATE_FORMAT).ok())
    }

    pub fn path(&self, name: &str) -> Option<PathBuf> {
        self.0.get(name).map(PathBuf::from)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.0
            .get(name)
            .is_some_and(|v| v.eq_ignore_ascii_case("yes"))
    }
}

/// What a submitted form asks the model to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Write(WriteRequest),
    Upload(UploadRequest),
    Login { username: String, password: String },
}

type BuildFn = Box<dyn Fn(&FormValues) -> Result<Submission, DeskError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    Editing,
    Submit,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldView {
    pub label: String,
    pub value: String,
    pub hint: Option<String>,
    pub required: bool,
    pub focused: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormView {
    pub title: String,
    pub fields: Vec<FieldView>,
    /// Char offset of the cursor in the focused field.
    pub cursor: usize,
    pub error: Option<String>,
}

pub struct Form {
    title: String,
    fields: Vec<Field>,
    focus: usize,
    editor: Inputter,
    build: BuildFn,
    success: String,
    error: Option<String>,
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("title", &self.title)
            .field("fields", &self.fields)
            .field("focus", &self.focus)
            .finish()
    }
}

impl Form {
    pub fn new<F>(title: impl Into<String>, fields: Vec<Field>, build: F) -> Self
    where
        F: Fn(&FormValues) -> Result<Submission, DeskError> + 'static,
    {
        let mut form = Self {
            title: title.into(),
            fields,
            focus: 0,
            editor: Inputter::default(),
            build: Box::new(build),
            success: "Saved".to_string(),
            error: None,
        };
        form.load();
        form
    }

    /// Toast text shown once the submission went through.
    pub fn on_success(mut self, message: impl Into<String>) -> Self {
        self.success = message.into();
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn success_message(&self) -> &str {
        &self.success
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    #[cfg(test)]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn key(&mut self, key: KeyEvent) -> FormEvent {
        match key.code {
            KeyCode::Esc => return FormEvent::Cancel,
            KeyCode::Enter => {
                self.commit();
                return FormEvent::Submit;
            }
            KeyCode::Tab | KeyCode::Down => self.move_focus(1),
            KeyCode::BackTab | KeyCode::Up => self.move_focus(-1),
            KeyCode::Left | KeyCode::Right if self.focused_is_choice() => {
                let step = if key.code == KeyCode::Left { -1 } else { 1 };
                if let Some(field) = self.fields.get_mut(self.focus) {
                    field.cycle(step);
                }
                self.load();
            }
            _ => {
                self.editor.read(key);
                self.commit();
            }
        }
        FormEvent::Editing
    }

    /// Validates all fields and runs the build step.
    pub fn submit(&mut self) -> Result<Submission, DeskError> {
        self.commit();
        let values = self.validate()?;
        let submission = (self.build)(&values)?;
        match &submission {
            Submission::Write(write) => debug!("Form \"{}\" writes {}", self.title, write.path),
            Submission::Upload(upload) => debug!("Form \"{}\" uploads to {}", self.title, upload.path),
            Submission::Login { username, .. } => debug!("Login submitted for {username}"),
        }
        Ok(submission)
    }

    pub fn validate(&self) -> Result<FormValues, DeskError> {
        let mut values = HashMap::new();
        for field in &self.fields {
            if let Some(value) = field.validate()? {
                values.insert(field.name, value);
            }
        }
        Ok(FormValues(values))
    }

    pub fn view(&self) -> FormView {
        FormView {
            title: self.title.clone(),
            fields: self
                .fields
                .iter()
                .enumerate()
                .map(|(idx, f)| FieldView {
                    label: f.label.to_string(),
                    value: match f.kind {
                        FieldKind::Secret => "*".repeat(f.value.chars().count()),
                        _ => f.value.clone(),
                    },
                    hint: f.hint(),
                    required: f.required,
                    focused: idx == self.focus,
                })
                .collect(),
            cursor: self.editor.cursor(),
            error: self.error.clone(),
        }
    }

    fn focused_is_choice(&self) -> bool {
        self.fields
            .get(self.focus)
            .is_some_and(|f| matches!(f.kind, FieldKind::Choice(_)))
    }

    fn move_focus(&mut self, step: isize) {
        if self.fields.is_empty() {
            return;
        }
        self.commit();
        let len = self.fields.len() as isize;
        self.focus = (self.focus as isize + step).rem_euclid(len) as usize;
        self.load();
    }

    fn commit(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value = self.editor.value().to_string();
        }
    }

    fn load(&mut self) {
        match self.fields.get(self.focus) {
            Some(field) => self.editor.set(&field.value),
            None => self.editor.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;
    use serde_json::json;

    fn press(form: &mut Form, code: KeyCode) -> FormEvent {
        form.key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(form: &mut Form, s: &str) {
        for c in s.chars() {
            press(form, KeyCode::Char(c));
        }
    }

    fn payment_form() -> Form {
        Form::new(
            "Record payment",
            vec![
                Field::number("paid_amount", "Amount").required(),
                Field::choice("payment_mode", "Mode", &["Cash", "NEFT"]).required(),
                Field::date("payment_date", "Date").required().initial("2024-03-01"),
            ],
            |values| {
                Ok(Submission::Write(WriteRequest::put(
                    "/repair/payments/1",
                    &json!({
                        "paid_amount": values.number("paid_amount"),
                        "payment_mode": values.text("payment_mode"),
                        "payment_date": values.date("payment_date"),
                    }),
                )?))
            },
        )
    }

    #[test]
    fn required_fields_are_checked() {
        let mut form = payment_form();
        let err = form.submit().unwrap_err();
        assert_eq!(err.to_string(), "Amount is required");
    }

    #[test]
    fn numbers_and_dates_are_validated() {
        let mut form = payment_form();
        type_str(&mut form, "abc");
        assert_eq!(form.submit().unwrap_err().to_string(), "Amount must be a number");

        let mut form = payment_form();
        type_str(&mut form, "1,500");
        press(&mut form, KeyCode::Tab);
        press(&mut form, KeyCode::Tab);
        for _ in 0..10 {
            press(&mut form, KeyCode::Backspace);
        }
        type_str(&mut form, "01/03/2024");
        assert_eq!(
            form.submit().unwrap_err().to_string(),
            "Date must be a date (YYYY-MM-DD)"
        );
    }

    #[test]
    fn valid_form_builds_the_request() {
        let mut form = payment_form();
        type_str(&mut form, "1,500");
        press(&mut form, KeyCode::Down);
        press(&mut form, KeyCode::Right);
        match form.submit().unwrap() {
            Submission::Write(req) => {
                assert_eq!(req.body["paid_amount"], json!(1500.0));
                assert_eq!(req.body["payment_mode"], json!("NEFT"));
                assert_eq!(req.body["payment_date"], json!("2024-03-01"));
            }
            other => panic!("unexpected submission {other:?}"),
        }
    }

    #[test]
    fn choices_wrap_and_accept_any_case() {
        let mut field = Field::choice("d", "Decision", &["Approve", "Reject"]);
        field.cycle(-1);
        assert_eq!(field.value, "Reject");
        field.cycle(1);
        assert_eq!(field.value, "Approve");
        field.value = "reject".into();
        assert_eq!(field.validate().unwrap(), Some("Reject".to_string()));
    }

    #[test]
    fn missing_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut field = Field::file("bill", "Bill image").required();
        field.value = dir.path().join("nope.jpg").to_string_lossy().to_string();
        assert!(matches!(field.validate(), Err(DeskError::InvalidInput(_))));

        let file = dir.path().join("bill.jpg");
        std::fs::write(&file, b"jpg").unwrap();
        field.value = file.to_string_lossy().to_string();
        assert!(field.validate().unwrap().is_some());
    }

    #[test]
    fn secrets_are_masked() {
        let mut form = Form::new("Login", vec![Field::secret("password", "Password")], |_| {
            Err(DeskError::InvalidInput("unused".into()))
        });
        type_str(&mut form, "hunter2");
        assert_eq!(form.view().fields[0].value, "*******");
        assert_eq!(form.view().cursor, 7);
    }

    #[test]
    fn escape_cancels() {
        let mut form = payment_form();
        assert_eq!(press(&mut form, KeyCode::Esc), FormEvent::Cancel);
    }
}
