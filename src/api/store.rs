use serde::Serialize;

use super::{WriteRequest, encode_segment};
use crate::domain::DeskError;

pub const INDENTS: &str = "/store/indents";
pub const INDENTS_EXPORT: &str = "/store/indents/export";
pub const INDENT_APPROVALS: &str = "/store/indents/approvals";
pub const INDENT_APPROVAL_DATA: &str = "/store/indents/approval-data";
pub const PURCHASE_ORDERS: &str = "/store/purchase-orders";
pub const PURCHASE_ORDERS_EXPORT: &str = "/store/purchase-orders/export";
pub const STOCK_REPORT: &str = "/store/stock-report";
pub const STOCK_REPORT_EXPORT: &str = "/store/stock-report/export";
pub const VENDOR_RATES: &str = "/store/vendor-rates";
pub const STORE_OUT: &str = "/store/store-out";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn parse(raw: &str) -> Option<Decision> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" | "a" | "yes" => Some(Decision::Approved),
            "reject" | "rejected" | "r" | "no" => Some(Decision::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIndent {
    pub item_name: String,
    pub quantity: f64,
    pub uom: String,
    pub department: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndentDecision {
    pub status: Decision,
    pub approved_qty: Option<f64>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleDecision {
    pub status: Decision,
    pub remarks: Option<String>,
}

pub fn create_indent(indent: &NewIndent) -> Result<WriteRequest, DeskError> {
    WriteRequest::post(INDENTS, indent)
}

pub fn decide_indent(line_id: &str, decision: &IndentDecision) -> Result<WriteRequest, DeskError> {
    WriteRequest::put(
        format!("{INDENTS}/{}/approval", encode_segment(line_id)),
        decision,
    )
}

pub fn decide_vendor_rate(rate_id: &str, decision: &SimpleDecision) -> Result<WriteRequest, DeskError> {
    WriteRequest::put(
        format!("{VENDOR_RATES}/{}/approval", encode_segment(rate_id)),
        decision,
    )
}

pub fn decide_store_out(request_id: &str, decision: &SimpleDecision) -> Result<WriteRequest, DeskError> {
    WriteRequest::put(
        format!("{STORE_OUT}/{}/approval", encode_segment(request_id)),
        decision,
    )
}
