use chrono::NaiveDate;
use serde_json::Value;

use super::fields::{date, number, text};
use super::{Cell, Record, cell};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndentLine {
    pub line_id: Option<String>,
    pub indent_no: Option<String>,
    pub item_name: Option<String>,
    pub quantity: Option<f64>,
    pub uom: Option<String>,
    pub department: Option<String>,
    pub indenter: Option<String>,
    pub indent_date: Option<NaiveDate>,
    pub approval_status: Option<String>,
    pub approved_qty: Option<f64>,
    pub remarks: Option<String>,
}

impl Record for IndentLine {
    fn from_json(raw: &Value) -> Self {
        IndentLine {
            line_id: text(raw, &["id", "line_id", "row_id"]),
            indent_no: text(raw, &["indent_no", "indent_number"]),
            item_name: text(raw, &["item_name", "product_name", "material"]),
            quantity: number(raw, &["quantity", "qty", "required_qty"]),
            uom: text(raw, &["uom", "unit"]),
            department: text(raw, &["department", "dept"]),
            indenter: text(raw, &["indenter", "indenter_name", "requested_by"]),
            indent_date: date(raw, &["indent_date", "created_at", "timestamp"]),
            approval_status: text(raw, &["approval_status", "status"]),
            approved_qty: number(raw, &["approved_qty", "approved_quantity"]),
            remarks: text(raw, &["remarks", "note"]),
        }
    }

    fn value(&self, key: &str) -> Option<Cell> {
        match key {
            "line_id" => cell(&self.line_id),
            "indent_no" => cell(&self.indent_no),
            "item_name" => cell(&self.item_name),
            "quantity" => cell(&self.quantity),
            "uom" => cell(&self.uom),
            "department" => cell(&self.department),
            "indenter" => cell(&self.indenter),
            "indent_date" => cell(&self.indent_date),
            "approval_status" => cell(&self.approval_status),
            "approved_qty" => cell(&self.approved_qty),
            "remarks" => cell(&self.remarks),
            _ => None,
        }
    }

    fn row_key(&self) -> Option<String> {
        self.line_id.clone().or_else(|| self.indent_no.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PurchaseOrder {
    pub po_no: Option<String>,
    pub indent_no: Option<String>,
    pub vendor_name: Option<String>,
    pub po_date: Option<NaiveDate>,
    pub total_amount: Option<f64>,
    pub delivery_date: Option<NaiveDate>,
    pub status: Option<String>,
}

impl Record for PurchaseOrder {
    fn from_json(raw: &Value) -> Self {
        PurchaseOrder {
            po_no: text(raw, &["po_no", "po_number", "purchase_order_no"]),
            indent_no: text(raw, &["indent_no", "indent_number"]),
            vendor_name: text(raw, &["vendor_name", "vendor", "party_name"]),
            po_date: date(raw, &["po_date", "created_at"]),
            total_amount: number(raw, &["total_amount", "po_amount", "amount"]),
            delivery_date: date(raw, &["delivery_date", "expected_delivery"]),
            status: text(raw, &["status", "po_status"]),
        }
    }

    fn value(&self, key: &str) -> Option<Cell> {
        match key {
            "po_no" => cell(&self.po_no),
            "indent_no" => cell(&self.indent_no),
            "vendor_name" => cell(&self.vendor_name),
            "po_date" => cell(&self.po_date),
            "total_amount" => cell(&self.total_amount),
            "delivery_date" => cell(&self.delivery_date),
            "status" => cell(&self.status),
            _ => None,
        }
    }

    fn row_key(&self) -> Option<String> {
        self.po_no.clone()
    }
}

/// One line of the stock report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockItem {
    pub item_code: Option<String>,
    pub item_name: Option<String>,
    pub category: Option<String>,
    pub uom: Option<String>,
    pub opening_qty: Option<f64>,
    pub received_qty: Option<f64>,
    pub issued_qty: Option<f64>,
    pub closing_qty: Option<f64>,
    pub reorder_level: Option<f64>,
}

impl StockItem {
    pub fn below_reorder_level(&self) -> bool {
        matches!((self.closing_qty, self.reorder_level), (Some(c), Some(r)) if c <= r)
    }
}

impl Record for StockItem {
    fn from_json(raw: &Value) -> Self {
        let opening_qty = number(raw, &["opening_qty", "opening_stock", "opening"]);
        let received_qty = number(raw, &["received_qty", "inward_qty", "in_qty"]);
        let issued_qty = number(raw, &["issued_qty", "outward_qty", "out_qty"]);
        let closing_qty = number(raw, &["closing_qty", "closing_stock", "current_stock"])
            .or_else(|| {
                opening_qty.map(|o| o + received_qty.unwrap_or(0.0) - issued_qty.unwrap_or(0.0))
            });
        StockItem {
            item_code: text(raw, &["item_code", "sku", "product_code"]),
            item_name: text(raw, &["item_name", "product_name"]),
            category: text(raw, &["category", "group_name"]),
            uom: text(raw, &["uom", "unit"]),
            opening_qty,
            received_qty,
            issued_qty,
            closing_qty,
            reorder_level: number(raw, &["reorder_level", "min_stock"]),
        }
    }

    fn value(&self, key: &str) -> Option<Cell> {
        match key {
            "item_code" => cell(&self.item_code),
            "item_name" => cell(&self.item_name),
            "category" => cell(&self.category),
            "uom" => cell(&self.uom),
            "opening_qty" => cell(&self.opening_qty),
            "received_qty" => cell(&self.received_qty),
            "issued_qty" => cell(&self.issued_qty),
            "closing_qty" => cell(&self.closing_qty),
            "reorder_level" => cell(&self.reorder_level),
            _ => None,
        }
    }

    fn row_key(&self) -> Option<String> {
        self.item_code.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VendorRate {
    pub id: Option<String>,
    pub vendor_name: Option<String>,
    pub item_name: Option<String>,
    pub rate: Option<f64>,
    pub previous_rate: Option<f64>,
    pub uom: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub status: Option<String>,
}

impl VendorRate {
    /// Relative change against the previous rate, in percent.
    pub fn change_percent(&self) -> Option<f64> {
        match (self.rate, self.previous_rate) {
            (Some(rate), Some(prev)) if prev != 0.0 => Some((rate - prev) / prev * 100.0),
            _ => None,
        }
    }
}

impl Record for VendorRate {
    fn from_json(raw: &Value) -> Self {
        VendorRate {
            id: text(raw, &["id", "rate_id"]),
            vendor_name: text(raw, &["vendor_name", "vendor", "party_name"]),
            item_name: text(raw, &["item_name", "product_name"]),
            rate: number(raw, &["rate", "new_rate", "unit_price"]),
            previous_rate: number(raw, &["previous_rate", "old_rate", "last_rate"]),
            uom: text(raw, &["uom", "unit"]),
            valid_from: date(raw, &["valid_from", "effective_date"]),
            status: text(raw, &["status", "approval_status"]),
        }
    }

    fn value(&self, key: &str) -> Option<Cell> {
        match key {
            "id" => cell(&self.id),
            "vendor_name" => cell(&self.vendor_name),
            "item_name" => cell(&self.item_name),
            "rate" => cell(&self.rate),
            "previous_rate" => cell(&self.previous_rate),
            "uom" => cell(&self.uom),
            "valid_from" => cell(&self.valid_from),
            "status" => cell(&self.status),
            _ => None,
        }
    }

    fn row_key(&self) -> Option<String> {
        self.id.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreOutRequest {
    pub id: Option<String>,
    pub request_no: Option<String>,
    pub item_name: Option<String>,
    pub quantity: Option<f64>,
    pub uom: Option<String>,
    pub department: Option<String>,
    pub requested_by: Option<String>,
    pub request_date: Option<NaiveDate>,
    pub status: Option<String>,
}

impl Record for StoreOutRequest {
    fn from_json(raw: &Value) -> Self {
        StoreOutRequest {
            id: text(raw, &["id", "request_id"]),
            request_no: text(raw, &["request_no", "issue_no", "slip_no"]),
            item_name: text(raw, &["item_name", "product_name"]),
            quantity: number(raw, &["quantity", "qty", "issue_qty"]),
            uom: text(raw, &["uom", "unit"]),
            department: text(raw, &["department", "dept"]),
            requested_by: text(raw, &["requested_by", "indenter", "employee_name"]),
            request_date: date(raw, &["request_date", "created_at", "timestamp"]),
            status: text(raw, &["status", "approval_status"]),
        }
    }

    fn value(&self, key: &str) -> Option<Cell> {
        match key {
            "id" => cell(&self.id),
            "request_no" => cell(&self.request_no),
            "item_name" => cell(&self.item_name),
            "quantity" => cell(&self.quantity),
            "uom" => cell(&self.uom),
            "department" => cell(&self.department),
            "requested_by" => cell(&self.requested_by),
            "request_date" => cell(&self.request_date),
            "status" => cell(&self.status),
            _ => None,
        }
    }

    fn row_key(&self) -> Option<String> {
        self.id.clone().or_else(|| self.request_no.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn closing_stock_is_derived() {
        let item = StockItem::from_json(&json!({
            "itemCode": "BRG-6204",
            "opening_qty": 40,
            "inwardQty": "10",
            "ISSUED_QTY": 45,
            "reorder_level": 5
        }));
        assert_eq!(item.closing_qty, Some(5.0));
        assert!(item.below_reorder_level());
    }

    #[test]
    fn rate_change_percent() {
        let rate = VendorRate::from_json(&json!({"rate": 110, "old_rate": 100}));
        let change = rate.change_percent().unwrap();
        assert!((change - 10.0).abs() < 1e-9);
        assert_eq!(VendorRate::default().change_percent(), None);
    }

    #[test]
    fn indent_line_identity_prefers_line_id() {
        let line = IndentLine::from_json(&json!({"id": 9, "indentNo": "IND-4"}));
        assert_eq!(line.row_key().as_deref(), Some("9"));
        let line = IndentLine::from_json(&json!({"INDENT_NO": "IND-4"}));
        assert_eq!(line.row_key().as_deref(), Some("IND-4"));
    }
}
