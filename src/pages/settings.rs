use crate::api::settings::USERS;
use crate::nav::Route;
use crate::records::UserAccount;
use crate::view::{Column, DEFAULT_PAGE_SIZE};

use super::{PageSpec, Tab};

pub fn users() -> PageSpec<UserAccount> {
    PageSpec {
        route: Route::Users,
        tabs: vec![Tab::new("Users", USERS, "No users found")],
        columns: vec![
            Column::new("user_name", "User"),
            Column::new("employee_id", "Employee ID").width(12),
            Column::new("role", "Role").width(10),
            Column::new("department", "Department"),
            Column::new("active", "Status").width(9),
        ],
        search_fields: Some(vec!["user_name", "employee_id", "role", "department"]),
        page_size: DEFAULT_PAGE_SIZE,
        placeholder: "-",
        error_message: "Failed to load users",
        actions: Vec::new(),
        export: None,
    }
}
