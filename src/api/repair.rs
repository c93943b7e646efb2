use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

use super::{UploadRequest, WriteRequest, encode_segment};
use crate::domain::DeskError;

pub const TASKS: &str = "/repair/tasks";
pub const PENDING_DISPATCH: &str = "/repair/tasks/pending-dispatch";
pub const PAYMENTS: &str = "/repair/payments";
pub const TASKS_EXPORT: &str = "/repair/tasks/export";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRepairIndent {
    pub machine_name: String,
    pub serial_no: Option<String>,
    pub department: String,
    pub problem: String,
    pub priority: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorDispatch {
    pub vendor_name: String,
    pub transporter: Option<String>,
    pub dispatch_date: NaiveDate,
    pub expected_return: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentEntry {
    pub paid_amount: f64,
    pub payment_mode: String,
    pub payment_date: NaiveDate,
    pub reference_no: Option<String>,
}

pub fn create_indent(indent: &NewRepairIndent) -> Result<WriteRequest, DeskError> {
    WriteRequest::post(TASKS, indent)
}

pub fn dispatch(task_no: &str, dispatch: &VendorDispatch) -> Result<WriteRequest, DeskError> {
    WriteRequest::put(
        format!("{TASKS}/{}/dispatch", encode_segment(task_no)),
        dispatch,
    )
}

pub fn record_payment(payment_id: &str, entry: &PaymentEntry) -> Result<WriteRequest, DeskError> {
    WriteRequest::put(format!("{PAYMENTS}/{}", encode_segment(payment_id)), entry)
}

pub fn bill_upload(payment_id: &str, task_no: Option<&str>, file: PathBuf) -> UploadRequest {
    UploadRequest {
        path: format!("{PAYMENTS}/{}/bill", encode_segment(payment_id)),
        field: "bill_image".to_string(),
        file,
        fields: task_no
            .map(|t| vec![("task_no".to_string(), t.to_string())])
            .unwrap_or_default(),
    }
}
