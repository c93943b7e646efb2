use chrono::NaiveDate;
use serde_json::Value;

use super::fields::{date, integer, number, text};
use super::{Cell, Record, cell};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairTask {
    pub task_no: Option<String>,
    pub machine_name: Option<String>,
    pub serial_no: Option<String>,
    pub department: Option<String>,
    pub problem: Option<String>,
    pub priority: Option<String>,
    pub indenter: Option<String>,
    pub indent_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub vendor_name: Option<String>,
    pub planned_date: Option<NaiveDate>,
    pub dispatch_date: Option<NaiveDate>,
}

impl Record for RepairTask {
    fn from_json(raw: &Value) -> Self {
        RepairTask {
            task_no: text(raw, &["task_no", "task_id"]),
            machine_name: text(raw, &["machine_name", "machine"]),
            serial_no: text(raw, &["serial_no", "machine_serial_no"]),
            department: text(raw, &["department", "dept"]),
            problem: text(raw, &["problem", "problem_description", "issue"]),
            priority: text(raw, &["priority"]),
            indenter: text(raw, &["indenter", "indenter_name", "doer_name"]),
            indent_date: date(raw, &["indent_date", "created_at", "timestamp"]),
            status: text(raw, &["status", "repair_status"]),
            vendor_name: text(raw, &["vendor_name", "vendor"]),
            planned_date: date(raw, &["planned_date", "planned"]),
            dispatch_date: date(raw, &["dispatch_date", "sent_date"]),
        }
    }

    fn value(&self, key: &str) -> Option<Cell> {
        match key {
            "task_no" => cell(&self.task_no),
            "machine_name" => cell(&self.machine_name),
            "serial_no" => cell(&self.serial_no),
            "department" => cell(&self.department),
            "problem" => cell(&self.problem),
            "priority" => cell(&self.priority),
            "indenter" => cell(&self.indenter),
            "indent_date" => cell(&self.indent_date),
            "status" => cell(&self.status),
            "vendor_name" => cell(&self.vendor_name),
            "planned_date" => cell(&self.planned_date),
            "dispatch_date" => cell(&self.dispatch_date),
            _ => None,
        }
    }

    fn row_key(&self) -> Option<String> {
        self.task_no.clone()
    }
}

/// A vendor bill waiting for, or already through, payment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairPayment {
    pub payment_id: Option<String>,
    pub task_no: Option<String>,
    pub machine_name: Option<String>,
    pub vendor_name: Option<String>,
    pub bill_no: Option<String>,
    pub bill_date: Option<NaiveDate>,
    pub bill_amount: Option<f64>,
    pub paid_amount: Option<f64>,
    pub to_be_paid: Option<f64>,
    pub payment_status: Option<String>,
    pub payment_mode: Option<String>,
    pub bill_image: Option<String>,
}

impl RepairPayment {
    /// Outstanding amount, never below zero.
    pub fn derive_to_be_paid(bill_amount: Option<f64>, paid_amount: Option<f64>) -> Option<f64> {
        bill_amount.map(|bill| (bill - paid_amount.unwrap_or(0.0)).max(0.0))
    }
}

impl Record for RepairPayment {
    fn from_json(raw: &Value) -> Self {
        let bill_amount = number(raw, &["bill_amount", "total_bill_amount", "amount"]);
        let paid_amount = number(raw, &["paid_amount", "amount_paid"]);
        let to_be_paid = number(raw, &["to_be_paid", "balance_amount", "pending_amount"])
            .or_else(|| Self::derive_to_be_paid(bill_amount, paid_amount));
        RepairPayment {
            payment_id: text(raw, &["payment_id", "id", "uid"]),
            task_no: text(raw, &["task_no", "task_id"]),
            machine_name: text(raw, &["machine_name", "machine"]),
            vendor_name: text(raw, &["vendor_name", "vendor"]),
            bill_no: text(raw, &["bill_no", "bill_number", "invoice_no"]),
            bill_date: date(raw, &["bill_date", "invoice_date"]),
            bill_amount,
            paid_amount,
            to_be_paid,
            payment_status: text(raw, &["payment_status", "status"]),
            payment_mode: text(raw, &["payment_mode", "payment_type"]),
            bill_image: text(raw, &["bill_image", "bill_image_url", "bill_url"]),
        }
    }

    fn value(&self, key: &str) -> Option<Cell> {
        match key {
            "payment_id" => cell(&self.payment_id),
            "task_no" => cell(&self.task_no),
            "machine_name" => cell(&self.machine_name),
            "vendor_name" => cell(&self.vendor_name),
            "bill_no" => cell(&self.bill_no),
            "bill_date" => cell(&self.bill_date),
            "bill_amount" => cell(&self.bill_amount),
            "paid_amount" => cell(&self.paid_amount),
            "to_be_paid" => cell(&self.to_be_paid),
            "payment_status" => cell(&self.payment_status),
            "payment_mode" => cell(&self.payment_mode),
            "bill_image" => cell(&self.bill_image),
            _ => None,
        }
    }

    fn row_key(&self) -> Option<String> {
        self.payment_id.clone().or_else(|| self.task_no.clone())
    }
}

/// Gate pass raised when a machine leaves for repair; followed up until it
/// comes back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatePassFollowup {
    pub task_no: Option<String>,
    pub gate_pass_no: Option<String>,
    pub machine_name: Option<String>,
    pub vendor_name: Option<String>,
    pub sent_date: Option<NaiveDate>,
    pub expected_return: Option<NaiveDate>,
    pub followup_count: Option<i64>,
    pub last_remarks: Option<String>,
    pub next_followup: Option<NaiveDate>,
}

impl Record for GatePassFollowup {
    fn from_json(raw: &Value) -> Self {
        GatePassFollowup {
            task_no: text(raw, &["task_no", "task_id"]),
            gate_pass_no: text(raw, &["gate_pass_no", "gatepass_no", "gate_pass"]),
            machine_name: text(raw, &["machine_name", "machine"]),
            vendor_name: text(raw, &["vendor_name", "vendor"]),
            sent_date: date(raw, &["sent_date", "dispatch_date"]),
            expected_return: date(raw, &["expected_return", "expected_return_date"]),
            followup_count: integer(raw, &["followup_count", "follow_up_count"]),
            last_remarks: text(raw, &["last_remarks", "remarks"]),
            next_followup: date(raw, &["next_followup", "next_followup_date", "next_date"]),
        }
    }

    fn value(&self, key: &str) -> Option<Cell> {
        match key {
            "task_no" => cell(&self.task_no),
            "gate_pass_no" => cell(&self.gate_pass_no),
            "machine_name" => cell(&self.machine_name),
            "vendor_name" => cell(&self.vendor_name),
            "sent_date" => cell(&self.sent_date),
            "expected_return" => cell(&self.expected_return),
            "followup_count" => cell(&self.followup_count),
            "last_remarks" => cell(&self.last_remarks),
            "next_followup" => cell(&self.next_followup),
            _ => None,
        }
    }

    fn row_key(&self) -> Option<String> {
        self.gate_pass_no.clone().or_else(|| self.task_no.clone())
    }
}
