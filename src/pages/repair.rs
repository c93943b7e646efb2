use crate::api::followup::{self, FollowupEntry, GATE_PASS};
use crate::api::repair::{
    self, NewRepairIndent, PAYMENTS, PENDING_DISPATCH, PaymentEntry, TASKS, TASKS_EXPORT, VendorDispatch,
};
use crate::domain::DeskError;
use crate::nav::Route;
use crate::records::{GatePassFollowup, RepairPayment, RepairTask};
use crate::view::{Column, DEFAULT_PAGE_SIZE};

use super::form::{Field, Form, Submission};
use super::{Action, PageSpec, Tab, row_key};

const PRIORITIES: [&str; 4] = ["Medium", "High", "Urgent", "Low"];
const PAYMENT_MODES: [&str; 5] = ["NEFT", "RTGS", "Cheque", "Cash", "UPI"];

pub fn repair_indent() -> PageSpec<RepairTask> {
    PageSpec {
        route: Route::RepairIndent,
        tabs: vec![
            Tab::new("Pending", TASKS, "No pending repair indents found").query("status", "pending"),
            Tab::new("History", TASKS, "No repair history found").query("status", "history"),
        ],
        columns: vec![
            Column::new("task_no", "Task No").width(10),
            Column::new("machine_name", "Machine"),
            Column::new("serial_no", "Serial No"),
            Column::new("department", "Department"),
            Column::new("problem", "Problem"),
            Column::new("priority", "Priority").width(8),
            Column::new("indenter", "Indenter"),
            Column::new("indent_date", "Indent Date").width(12),
            Column::new("status", "Status"),
        ],
        search_fields: None,
        page_size: DEFAULT_PAGE_SIZE,
        placeholder: "—",
        error_message: "Failed to load repair tasks",
        actions: vec![Action::create("New repair indent", |ctx| {
            Ok(Form::new(
                "New repair indent",
                vec![
                    Field::text("machine_name", "Machine").required(),
                    Field::text("serial_no", "Serial No"),
                    Field::text("department", "Department")
                        .required()
                        .initial(ctx.user.department.clone()),
                    Field::text("problem", "Problem").required(),
                    Field::choice("priority", "Priority", &PRIORITIES).required(),
                ],
                |values| {
                    let indent = NewRepairIndent {
                        machine_name: values.required("machine_name")?,
                        serial_no: values.text("serial_no"),
                        department: values.required("department")?,
                        problem: values.required("problem")?,
                        priority: values.required("priority")?,
                    };
                    Ok(Submission::Write(repair::create_indent(&indent)?))
                },
            )
            .on_success("Repair indent created"))
        })],
        export: Some(TASKS_EXPORT),
    }
}

pub fn vendor_dispatch() -> PageSpec<RepairTask> {
    PageSpec {
        route: Route::VendorDispatch,
        tabs: vec![Tab::new("Pending", PENDING_DISPATCH, "No tasks waiting for dispatch")],
        columns: vec![
            Column::new("task_no", "Task No").width(10),
            Column::new("machine_name", "Machine"),
            Column::new("department", "Department"),
            Column::new("problem", "Problem"),
            Column::new("planned_date", "Planned").width(12),
            Column::new("vendor_name", "Vendor"),
            Column::new("dispatch_date", "Dispatched").width(12),
        ],
        search_fields: Some(vec!["task_no", "machine_name", "department", "vendor_name"]),
        page_size: DEFAULT_PAGE_SIZE,
        placeholder: "—",
        error_message: "Failed to load tasks for dispatch",
        actions: vec![Action::on_row("Dispatch to vendor", |task: &RepairTask, ctx| {
            let task_no = row_key(task.task_no.clone(), "task number")?;
            Ok(Form::new(
                format!("Dispatch {task_no}"),
                vec![
                    Field::text("vendor_name", "Vendor")
                        .required()
                        .prefill(task.vendor_name.as_deref()),
                    Field::text("transporter", "Transporter"),
                    Field::date("dispatch_date", "Dispatch date")
                        .required()
                        .initial(ctx.today_string()),
                    Field::date("expected_return", "Expected return"),
                ],
                move |values| {
                    let dispatch_date = values
                        .date("dispatch_date")
                        .ok_or_else(|| DeskError::InvalidInput("Dispatch date is required".into()))?;
                    let expected_return = values.date("expected_return");
                    if expected_return.is_some_and(|back| back < dispatch_date) {
                        return Err(DeskError::InvalidInput(
                            "Expected return is before the dispatch date".into(),
                        ));
                    }
                    let body = VendorDispatch {
                        vendor_name: values.required("vendor_name")?,
                        transporter: values.text("transporter"),
                        dispatch_date,
                        expected_return,
                    };
                    Ok(Submission::Write(repair::dispatch(&task_no, &body)?))
                },
            )
            .on_success("Task dispatched"))
        })],
        export: None,
    }
}

pub fn repair_payments() -> PageSpec<RepairPayment> {
    PageSpec {
        route: Route::RepairPayments,
        tabs: vec![
            Tab::new("Pending", PAYMENTS, "No pending payments found").query("status", "pending"),
            Tab::new("Paid", PAYMENTS, "No paid bills found").query("status", "paid"),
        ],
        columns: vec![
            Column::new("task_no", "Task No").width(10),
            Column::new("machine_name", "Machine"),
            Column::new("vendor_name", "Vendor"),
            Column::new("bill_no", "Bill No"),
            Column::new("bill_date", "Bill Date").width(12),
            Column::money("bill_amount", "Bill Amount"),
            Column::money("paid_amount", "Paid"),
            Column::money("to_be_paid", "To Be Paid"),
            Column::new("payment_status", "Status"),
        ],
        search_fields: Some(vec!["task_no", "machine_name", "vendor_name", "bill_no"]),
        page_size: DEFAULT_PAGE_SIZE,
        placeholder: "-",
        error_message: "Failed to load repair payments",
        actions: vec![
            Action::on_row("Record payment", |payment: &RepairPayment, ctx| {
                let payment_id = row_key(payment.payment_id.clone(), "payment id")?;
                Ok(Form::new(
                    format!("Record payment for {}", payment.task_no.as_deref().unwrap_or(&payment_id)),
                    vec![
                        Field::number("paid_amount", "Amount")
                            .required()
                            .prefill(payment.to_be_paid.filter(|v| *v > 0.0)),
                        Field::choice("payment_mode", "Mode", &PAYMENT_MODES).required(),
                        Field::date("payment_date", "Payment date")
                            .required()
                            .initial(ctx.today_string()),
                        Field::text("reference_no", "Reference No"),
                    ],
                    move |values| {
                        let paid_amount = values.number("paid_amount").unwrap_or_default();
                        if paid_amount <= 0.0 {
                            return Err(DeskError::InvalidInput("Amount must be greater than zero".into()));
                        }
                        let entry = PaymentEntry {
                            paid_amount,
                            payment_mode: values.required("payment_mode")?,
                            payment_date: values
                                .date("payment_date")
                                .ok_or_else(|| DeskError::InvalidInput("Payment date is required".into()))?,
                            reference_no: values.text("reference_no"),
                        };
                        Ok(Submission::Write(repair::record_payment(&payment_id, &entry)?))
                    },
                )
                .on_success("Payment recorded"))
            }),
            Action::on_row("Upload bill image", |payment: &RepairPayment, _| {
                let payment_id = row_key(payment.payment_id.clone(), "payment id")?;
                let task_no = payment.task_no.clone();
                Ok(Form::new(
                    "Upload bill image",
                    vec![Field::file("bill_image", "Bill image").required()],
                    move |values| {
                        let file = values
                            .path("bill_image")
                            .ok_or_else(|| DeskError::InvalidInput("Bill image is required".into()))?;
                        Ok(Submission::Upload(repair::bill_upload(
                            &payment_id,
                            task_no.as_deref(),
                            file,
                        )))
                    },
                )
                .on_success("Bill uploaded"))
            }),
        ],
        export: None,
    }
}

pub fn gate_pass_followup() -> PageSpec<GatePassFollowup> {
    PageSpec {
        route: Route::GatePassFollowup,
        tabs: vec![Tab::new("Open", GATE_PASS, "No gate passes awaiting return")],
        columns: vec![
            Column::new("gate_pass_no", "Gate Pass").width(10),
            Column::new("task_no", "Task No").width(10),
            Column::new("machine_name", "Machine"),
            Column::new("vendor_name", "Vendor"),
            Column::new("sent_date", "Sent").width(12),
            Column::new("expected_return", "Expected").width(12),
            Column::new("followup_count", "Follow-ups").width(10),
            Column::new("last_remarks", "Last Remarks"),
            Column::new("next_followup", "Next Follow-up").width(14),
        ],
        search_fields: Some(vec!["gate_pass_no", "task_no", "machine_name", "vendor_name"]),
        page_size: DEFAULT_PAGE_SIZE,
        placeholder: "—",
        error_message: "Failed to load gate passes",
        actions: vec![Action::on_row("Record follow-up", |pass: &GatePassFollowup, _| {
            let gate_pass_no = row_key(pass.gate_pass_no.clone(), "gate pass number")?;
            Ok(Form::new(
                format!("Follow-up for {gate_pass_no}"),
                vec![
                    Field::text("remarks", "Remarks").required(),
                    Field::date("next_followup", "Next follow-up"),
                    Field::choice("returned", "Returned", &["No", "Yes"]).required(),
                ],
                move |values| {
                    let entry = FollowupEntry {
                        remarks: values.required("remarks")?,
                        next_followup: values.date("next_followup"),
                        returned: values.flag("returned"),
                    };
                    Ok(Submission::Write(followup::record(&gate_pass_no, &entry)?))
                },
            )
            .on_success("Follow-up recorded"))
        })],
        export: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::pages::form::FormEvent;
    use crate::pages::{ActionContext, Page, Screen};
    use crate::session::UserProfile;
    use chrono::NaiveDate;
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use serde_json::json;

    fn ctx() -> ActionContext {
        ActionContext {
            user: UserProfile {
                department: "Maintenance".into(),
                ..UserProfile::default()
            },
            today: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    fn loaded<R: crate::records::Record>(spec: PageSpec<R>, rows: Vec<serde_json::Value>) -> Page<R> {
        let mut page = Page::new(spec);
        let job = page.begin_fetch().unwrap();
        page.apply_fetch(job.ticket, Ok(rows));
        page
    }

    fn type_str(form: &mut Form, s: &str) {
        for c in s.chars() {
            form.key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
    }

    #[test]
    fn new_indent_defaults_department_from_user() {
        let page = loaded(repair_indent(), Vec::new());
        let mut form = page.open_action(0, &ctx()).unwrap();
        assert_eq!(form.fields()[2].value, "Maintenance");
        type_str(&mut form, "Hydraulic Press");
        for name in ["", "", "Oil leak"] {
            form.key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
            type_str(&mut form, name);
        }
        match form.submit().unwrap() {
            Submission::Write(req) => {
                assert_eq!(req.method, Method::Post);
                assert_eq!(req.path, "/repair/tasks");
                assert_eq!(req.body["machine_name"], json!("Hydraulic Press"));
                assert_eq!(req.body["problem"], json!("Oil leak"));
                assert_eq!(req.body["priority"], json!("Medium"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn dispatch_prefills_from_the_row() {
        let page = loaded(
            vendor_dispatch(),
            vec![json!({"taskNo": "TR-7", "vendorName": "Acme Hydraulics"})],
        );
        let mut form = page.open_action(0, &ctx()).unwrap();
        assert_eq!(form.title(), "Dispatch TR-7");
        assert_eq!(form.fields()[0].value, "Acme Hydraulics");
        assert_eq!(form.fields()[2].value, "2024-03-01");
        match form.submit().unwrap() {
            Submission::Write(req) => {
                assert_eq!(req.path, "/repair/tasks/TR-7/dispatch");
                assert_eq!(req.body["dispatch_date"], json!("2024-03-01"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn return_before_dispatch_is_rejected() {
        let page = loaded(vendor_dispatch(), vec![json!({"task_no": "TR-7", "vendor": "Acme"})]);
        let mut form = page.open_action(0, &ctx()).unwrap();
        for _ in 0..3 {
            form.key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
        }
        type_str(&mut form, "2024-02-01");
        let err = form.submit().unwrap_err();
        assert_eq!(err.to_string(), "Expected return is before the dispatch date");
    }

    #[test]
    fn payment_defaults_to_the_outstanding_amount() {
        let page = loaded(
            repair_payments(),
            vec![json!({"id": 11, "task_no": "TR-101", "bill_amount": 5000, "paid_amount": "2000"})],
        );
        let mut form = page.open_action(0, &ctx()).unwrap();
        assert_eq!(form.fields()[0].value, "3000");
        match form.submit().unwrap() {
            Submission::Write(req) => {
                assert_eq!(req.path, "/repair/payments/11");
                assert_eq!(req.body["paid_amount"], json!(3000.0));
                assert_eq!(req.body["payment_mode"], json!("NEFT"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn zero_payment_is_rejected() {
        let page = loaded(
            repair_payments(),
            vec![json!({"id": 12, "bill_amount": 100, "paid_amount": 150})],
        );
        let mut form = page.open_action(0, &ctx()).unwrap();
        type_str(&mut form, "0");
        assert!(matches!(form.key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)), FormEvent::Submit));
        assert_eq!(form.submit().unwrap_err().to_string(), "Amount must be greater than zero");
    }

    #[test]
    fn bill_upload_builds_a_multipart_request() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bill.png");
        std::fs::write(&file, b"png").unwrap();

        let page = loaded(repair_payments(), vec![json!({"payment_id": "P-3", "task_no": "TR-3"})]);
        let mut form = page.open_action(1, &ctx()).unwrap();
        type_str(&mut form, &file.to_string_lossy());
        match form.submit().unwrap() {
            Submission::Upload(up) => {
                assert_eq!(up.path, "/repair/payments/P-3/bill");
                assert_eq!(up.field, "bill_image");
                assert_eq!(up.file, file);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn followup_marks_returned_machines() {
        let page = loaded(gate_pass_followup(), vec![json!({"GATE_PASS_NO": "GP/12", "TASK_NO": "TR-1"})]);
        let mut form = page.open_action(0, &ctx()).unwrap();
        type_str(&mut form, "Vendor confirmed pickup");
        form.key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
        form.key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
        form.key(KeyEvent::new(KeyCode::Right, KeyModifiers::NONE));
        match form.submit().unwrap() {
            Submission::Write(req) => {
                assert_eq!(req.path, "/followup/gate-pass/GP%2F12");
                assert_eq!(req.body["returned"], json!(true));
                assert_eq!(req.body["next_followup"], json!(null));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
