use chrono::NaiveDate;
use serde::Serialize;

use super::{WriteRequest, encode_segment};
use crate::domain::DeskError;

pub const GATE_PASS: &str = "/followup/gate-pass";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowupEntry {
    pub remarks: String,
    pub next_followup: Option<NaiveDate>,
    pub returned: bool,
}

pub fn record(gate_pass_no: &str, entry: &FollowupEntry) -> Result<WriteRequest, DeskError> {
    WriteRequest::put(format!("{GATE_PASS}/{}", encode_segment(gate_pass_no)), entry)
}
