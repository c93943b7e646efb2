use crate::api::store::{
    self, Decision, INDENT_APPROVAL_DATA, INDENT_APPROVALS, INDENTS, INDENTS_EXPORT, IndentDecision, NewIndent,
    PURCHASE_ORDERS, PURCHASE_ORDERS_EXPORT, STOCK_REPORT, STOCK_REPORT_EXPORT, STORE_OUT, SimpleDecision,
    VENDOR_RATES,
};
use crate::domain::DeskError;
use crate::nav::Route;
use crate::records::{IndentLine, PurchaseOrder, StockItem, StoreOutRequest, VendorRate};
use crate::view::{Column, DEFAULT_PAGE_SIZE};

use super::form::{Field, Form, FormValues, Submission};
use super::{Action, PageSpec, Tab, row_key};

/// Indent and purchase order lists run long.
const LONG_PAGE: usize = 50;

const UNITS: [&str; 6] = ["Nos", "Kg", "Ltr", "Mtr", "Set", "Box"];

fn decision_field() -> Field {
    Field::choice("decision", "Decision", &["Approve", "Reject"]).required()
}

/// Reads the decision and insists on remarks when rejecting.
fn decision_of(values: &FormValues) -> Result<(Decision, Option<String>), DeskError> {
    let decision = values
        .text("decision")
        .and_then(|d| Decision::parse(&d))
        .ok_or_else(|| DeskError::InvalidInput("Decision is required".into()))?;
    let remarks = values.text("remarks");
    if decision == Decision::Rejected && remarks.is_none() {
        return Err(DeskError::InvalidInput("Remarks are required when rejecting".into()));
    }
    Ok((decision, remarks))
}

fn indent_columns() -> Vec<Column<IndentLine>> {
    vec![
        Column::new("indent_no", "Indent No").width(10),
        Column::new("item_name", "Item"),
        Column::new("quantity", "Qty").width(8),
        Column::new("uom", "UOM").width(6),
        Column::new("department", "Department"),
        Column::new("indenter", "Indenter"),
        Column::new("indent_date", "Date").width(12),
        Column::new("approval_status", "Status"),
    ]
}

pub fn indents() -> PageSpec<IndentLine> {
    PageSpec {
        route: Route::Indents,
        tabs: vec![Tab::new("All", INDENTS, "No indents found")],
        columns: indent_columns(),
        search_fields: None,
        page_size: LONG_PAGE,
        placeholder: "-",
        error_message: "Failed to load indents",
        actions: vec![Action::create("Create indent", |ctx| {
            Ok(Form::new(
                "Create indent",
                vec![
                    Field::text("item_name", "Item").required(),
                    Field::number("quantity", "Quantity").required(),
                    Field::choice("uom", "UOM", &UNITS).required(),
                    Field::text("department", "Department")
                        .required()
                        .initial(ctx.user.department.clone()),
                    Field::text("remarks", "Remarks"),
                ],
                |values| {
                    let quantity = values.number("quantity").unwrap_or_default();
                    if quantity <= 0.0 {
                        return Err(DeskError::InvalidInput("Quantity must be greater than zero".into()));
                    }
                    let indent = NewIndent {
                        item_name: values.required("item_name")?,
                        quantity,
                        uom: values.required("uom")?,
                        department: values.required("department")?,
                        remarks: values.text("remarks"),
                    };
                    Ok(Submission::Write(store::create_indent(&indent)?))
                },
            )
            .on_success("Indent created"))
        })],
        export: Some(INDENTS_EXPORT),
    }
}

pub fn approve_indent() -> PageSpec<IndentLine> {
    let mut columns = indent_columns();
    columns.push(Column::new("approved_qty", "Approved Qty").width(12));
    PageSpec {
        route: Route::ApproveIndent,
        tabs: vec![
            Tab::new("Pending", INDENT_APPROVALS, "No indents pending approval").query("status", "pending"),
            Tab::new("History", INDENT_APPROVALS, "No approval history found").query("status", "history"),
        ],
        columns,
        search_fields: Some(vec!["indent_no", "item_name", "department", "indenter"]),
        page_size: LONG_PAGE,
        placeholder: "-",
        error_message: "Failed to load indents for approval",
        actions: vec![Action::on_row("Approve / reject", |line: &IndentLine, _| {
            let line_id = row_key(line.line_id.clone().or_else(|| line.indent_no.clone()), "indent line id")?;
            let requested = line.quantity;
            Ok(Form::new(
                format!("Indent {}", line.indent_no.as_deref().unwrap_or(&line_id)),
                vec![
                    decision_field(),
                    Field::number("approved_qty", "Approved qty").prefill(requested),
                    Field::text("remarks", "Remarks"),
                ],
                move |values| {
                    let (status, remarks) = decision_of(values)?;
                    let approved_qty = match status {
                        Decision::Approved => {
                            let qty = values.number("approved_qty").or(requested);
                            if let (Some(qty), Some(max)) = (qty, requested)
                                && qty > max
                            {
                                return Err(DeskError::InvalidInput(format!(
                                    "Approved qty cannot exceed the requested {max}"
                                )));
                            }
                            qty
                        }
                        Decision::Rejected => None,
                    };
                    let decision = IndentDecision {
                        status,
                        approved_qty,
                        remarks,
                    };
                    Ok(Submission::Write(store::decide_indent(&line_id, &decision)?))
                },
            )
            .on_success("Indent decision saved"))
        })],
        export: None,
    }
}

pub fn approve_indent_data() -> PageSpec<IndentLine> {
    let mut columns = indent_columns();
    columns.push(Column::new("approved_qty", "Approved Qty").width(12));
    columns.push(Column::new("remarks", "Remarks"));
    PageSpec {
        route: Route::ApproveIndentData,
        tabs: vec![Tab::new("All", INDENT_APPROVAL_DATA, "No approval data found")],
        columns,
        search_fields: None,
        page_size: LONG_PAGE,
        placeholder: "-",
        error_message: "Failed to load indent approval data",
        actions: Vec::new(),
        export: None,
    }
}

pub fn purchase_orders() -> PageSpec<PurchaseOrder> {
    PageSpec {
        route: Route::PurchaseOrders,
        tabs: vec![Tab::new("All", PURCHASE_ORDERS, "No purchase orders found")],
        columns: vec![
            Column::new("po_no", "PO No").width(10),
            Column::new("indent_no", "Indent No").width(10),
            Column::new("vendor_name", "Vendor"),
            Column::new("po_date", "PO Date").width(12),
            Column::money("total_amount", "Amount"),
            Column::new("delivery_date", "Delivery").width(12),
            Column::new("status", "Status"),
        ],
        search_fields: None,
        page_size: LONG_PAGE,
        placeholder: "-",
        error_message: "Failed to load purchase orders",
        actions: Vec::new(),
        export: Some(PURCHASE_ORDERS_EXPORT),
    }
}

pub fn inventory() -> PageSpec<StockItem> {
    PageSpec {
        route: Route::Inventory,
        tabs: vec![Tab::new("Stock", STOCK_REPORT, "No stock records found")],
        columns: vec![
            Column::new("item_code", "Code").width(10),
            Column::new("item_name", "Item"),
            Column::new("category", "Category"),
            Column::new("uom", "UOM").width(6),
            Column::new("opening_qty", "Opening").width(9),
            Column::new("received_qty", "Received").width(9),
            Column::new("issued_qty", "Issued").width(9),
            Column::new("closing_qty", "Closing").width(9),
            Column::new("reorder_level", "Reorder At").width(10),
            Column::computed("Alert", |item: &StockItem| {
                item.below_reorder_level().then(|| "Reorder".to_string())
            })
            .width(8),
        ],
        search_fields: Some(vec!["item_code", "item_name", "category"]),
        page_size: DEFAULT_PAGE_SIZE,
        placeholder: "-",
        error_message: "Failed to load stock report",
        actions: Vec::new(),
        export: Some(STOCK_REPORT_EXPORT),
    }
}

pub fn vendor_rate_approval() -> PageSpec<VendorRate> {
    PageSpec {
        route: Route::VendorRateApproval,
        tabs: vec![Tab::new("Pending", VENDOR_RATES, "No rates pending approval").query("status", "pending")],
        columns: vec![
            Column::new("vendor_name", "Vendor"),
            Column::new("item_name", "Item"),
            Column::money("rate", "Rate"),
            Column::money("previous_rate", "Previous"),
            Column::computed("Change", |rate: &VendorRate| {
                rate.change_percent().map(|p| format!("{p:+.1}%"))
            })
            .width(8),
            Column::new("uom", "UOM").width(6),
            Column::new("valid_from", "Valid From").width(12),
            Column::new("status", "Status"),
        ],
        search_fields: None,
        page_size: DEFAULT_PAGE_SIZE,
        placeholder: "—",
        error_message: "Failed to load vendor rates",
        actions: vec![Action::on_row("Approve rate", |rate: &VendorRate, _| {
            let rate_id = row_key(rate.id.clone(), "rate id")?;
            Ok(Form::new(
                format!(
                    "Rate of {} for {}",
                    rate.vendor_name.as_deref().unwrap_or("vendor"),
                    rate.item_name.as_deref().unwrap_or("item")
                ),
                vec![decision_field(), Field::text("remarks", "Remarks")],
                move |values| {
                    let (status, remarks) = decision_of(values)?;
                    let decision = SimpleDecision { status, remarks };
                    Ok(Submission::Write(store::decide_vendor_rate(&rate_id, &decision)?))
                },
            )
            .on_success("Rate decision saved"))
        })],
        export: None,
    }
}

pub fn store_out_approval() -> PageSpec<StoreOutRequest> {
    PageSpec {
        route: Route::StoreOutApproval,
        tabs: vec![Tab::new("Pending", STORE_OUT, "No store out requests pending").query("status", "pending")],
        columns: vec![
            Column::new("request_no", "Request No").width(10),
            Column::new("item_name", "Item"),
            Column::new("quantity", "Qty").width(8),
            Column::new("uom", "UOM").width(6),
            Column::new("department", "Department"),
            Column::new("requested_by", "Requested By"),
            Column::new("request_date", "Date").width(12),
            Column::new("status", "Status"),
        ],
        search_fields: None,
        page_size: DEFAULT_PAGE_SIZE,
        placeholder: "-",
        error_message: "Failed to load store out requests",
        actions: vec![Action::on_row("Approve / reject", |request: &StoreOutRequest, _| {
            let request_id = row_key(request.id.clone().or_else(|| request.request_no.clone()), "request id")?;
            Ok(Form::new(
                format!("Store out {}", request.request_no.as_deref().unwrap_or(&request_id)),
                vec![decision_field(), Field::text("remarks", "Remarks")],
                move |values| {
                    let (status, remarks) = decision_of(values)?;
                    let decision = SimpleDecision { status, remarks };
                    Ok(Submission::Write(store::decide_store_out(&request_id, &decision)?))
                },
            )
            .on_success("Store out decision saved"))
        })],
        export: None,
    }
}
