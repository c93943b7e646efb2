use serde_json::Value;

use super::fields::{boolean, text};
use super::{Cell, Record, cell};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserAccount {
    pub user_name: Option<String>,
    pub employee_id: Option<String>,
    pub role: Option<String>,
    pub department: Option<String>,
    pub active: Option<bool>,
}

impl Record for UserAccount {
    fn from_json(raw: &Value) -> Self {
        UserAccount {
            user_name: text(raw, &["user_name", "username", "name"]),
            employee_id: text(raw, &["employee_id", "emp_id"]),
            role: text(raw, &["role", "user_role"]),
            department: text(raw, &["department", "dept"]),
            active: boolean(raw, &["active", "is_active", "status"]),
        }
    }

    fn value(&self, key: &str) -> Option<Cell> {
        match key {
            "user_name" => cell(&self.user_name),
            "employee_id" => cell(&self.employee_id),
            "role" => cell(&self.role),
            "department" => cell(&self.department),
            "active" => self
                .active
                .map(|a| Cell::from(if a { "Active" } else { "Inactive" })),
            _ => None,
        }
    }

    fn row_key(&self) -> Option<String> {
        self.employee_id.clone()
    }
}
