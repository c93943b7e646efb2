//! Screens and the menu each user gets to see.
//!
//! The menu policy only decides what is offered in the navigation. It is not
//! an access control mechanism: the backend must authorize every call on its
//! own, regardless of what the desk shows.

use crate::session::UserProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Repair,
    Store,
    Settings,
}

impl Section {
    pub fn title(&self) -> &'static str {
        match self {
            Section::Repair => "Repair",
            Section::Store => "Store",
            Section::Settings => "Settings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    RepairIndent,
    VendorDispatch,
    RepairPayments,
    GatePassFollowup,
    Indents,
    ApproveIndent,
    ApproveIndentData,
    PurchaseOrders,
    Inventory,
    VendorRateApproval,
    StoreOutApproval,
    Users,
}

impl Route {
    pub const ALL: [Route; 12] = [
        Route::RepairIndent,
        Route::VendorDispatch,
        Route::RepairPayments,
        Route::GatePassFollowup,
        Route::Indents,
        Route::ApproveIndent,
        Route::ApproveIndentData,
        Route::PurchaseOrders,
        Route::Inventory,
        Route::VendorRateApproval,
        Route::StoreOutApproval,
        Route::Users,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Route::RepairIndent => "Repair Indent",
            Route::VendorDispatch => "Vendor Dispatch",
            Route::RepairPayments => "Repair Payments",
            Route::GatePassFollowup => "Gate Pass Follow-up",
            Route::Indents => "Indents",
            Route::ApproveIndent => "Approve Indent",
            Route::ApproveIndentData => "Approve Indent Data",
            Route::PurchaseOrders => "Purchase Orders",
            Route::Inventory => "Inventory",
            Route::VendorRateApproval => "Vendor Rate Approval",
            Route::StoreOutApproval => "Store Out Approval",
            Route::Users => "Users",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Route::RepairIndent => "repair/indent",
            Route::VendorDispatch => "repair/vendor-dispatch",
            Route::RepairPayments => "repair/payments",
            Route::GatePassFollowup => "repair/gate-pass",
            Route::Indents => "store/indents",
            Route::ApproveIndent => "store/approve-indent",
            Route::ApproveIndentData => "store/approve-indent-data",
            Route::PurchaseOrders => "store/purchase-orders",
            Route::Inventory => "store/inventory",
            Route::VendorRateApproval => "store/vendor-rates",
            Route::StoreOutApproval => "store/store-out-approval",
            Route::Users => "settings/users",
        }
    }

    pub fn section(&self) -> Section {
        match self {
            Route::RepairIndent
            | Route::VendorDispatch
            | Route::RepairPayments
            | Route::GatePassFollowup => Section::Repair,
            Route::Users => Section::Settings,
            _ => Section::Store,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Repair,
    Store,
    Purchase,
    User,
}

impl Role {
    pub fn parse(raw: &str) -> Role {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" | "administrator" | "superadmin" => Role::Admin,
            "repair" | "maintenance" => Role::Repair,
            "store" | "storekeeper" => Role::Store,
            "purchase" | "purchaser" => Role::Purchase,
            _ => Role::User,
        }
    }
}

/// Which routes are offered to whom, evaluated top to bottom.
#[derive(Debug, Clone)]
pub struct MenuPolicy {
    /// Employees pinned to a fixed set of screens, whatever their role.
    pub employee_overrides: Vec<(&'static str, Vec<Route>)>,
    pub role_grants: Vec<(Role, Vec<Route>)>,
    pub department_grants: Vec<(&'static str, Vec<Route>)>,
    pub fallback: Vec<Route>,
}

impl Default for MenuPolicy {
    fn default() -> Self {
        MenuPolicy {
            employee_overrides: vec![
                ("S07632", vec![Route::StoreOutApproval]),
                ("S08217", vec![Route::StoreOutApproval]),
                ("S00116", vec![Route::ApproveIndentData]),
            ],
            role_grants: vec![
                (
                    Role::Repair,
                    vec![
                        Route::RepairIndent,
                        Route::VendorDispatch,
                        Route::RepairPayments,
                        Route::GatePassFollowup,
                    ],
                ),
                (
                    Role::Store,
                    vec![
                        Route::Indents,
                        Route::ApproveIndent,
                        Route::Inventory,
                        Route::StoreOutApproval,
                    ],
                ),
                (
                    Role::Purchase,
                    vec![
                        Route::Indents,
                        Route::PurchaseOrders,
                        Route::VendorRateApproval,
                        Route::Inventory,
                    ],
                ),
                (Role::User, vec![Route::Indents]),
            ],
            department_grants: vec![
                ("maintenance", vec![Route::RepairIndent, Route::GatePassFollowup]),
                ("accounts", vec![Route::RepairPayments]),
            ],
            fallback: vec![Route::Indents],
        }
    }
}

impl MenuPolicy {
    pub fn menu_for(&self, user: &UserProfile) -> Vec<Route> {
        let employee_id = user.employee_id.trim();
        if let Some((_, routes)) = self
            .employee_overrides
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(employee_id))
        {
            return routes.clone();
        }

        let role = Role::parse(&user.role);
        if role == Role::Admin {
            return Route::ALL.to_vec();
        }

        let department = user.department.trim();
        let mut granted: Vec<Route> = Vec::new();
        for (r, routes) in &self.role_grants {
            if *r == role {
                granted.extend(routes);
            }
        }
        for (d, routes) in &self.department_grants {
            if d.eq_ignore_ascii_case(department) {
                granted.extend(routes);
            }
        }

        let menu: Vec<Route> = Route::ALL
            .into_iter()
            .filter(|r| granted.contains(r))
            .collect();
        if menu.is_empty() {
            self.fallback.clone()
        } else {
            menu
        }
    }

    pub fn allows(&self, user: &UserProfile, route: Route) -> bool {
        self.menu_for(user).contains(&route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str, employee_id: &str, department: &str) -> UserProfile {
        UserProfile {
            user_name: "test".into(),
            role: role.into(),
            employee_id: employee_id.into(),
            department: department.into(),
        }
    }

    #[test]
    fn pinned_employee_sees_only_store_out() {
        let policy = MenuPolicy::default();
        for role in ["admin", "store", "repair", ""] {
            assert_eq!(
                policy.menu_for(&user(role, "S07632", "Stores")),
                vec![Route::StoreOutApproval]
            );
        }
        assert_eq!(
            policy.menu_for(&user("admin", "s00116", "")),
            vec![Route::ApproveIndentData]
        );
    }

    #[test]
    fn admin_sees_everything() {
        let menu = MenuPolicy::default().menu_for(&user("Admin", "A1", ""));
        assert_eq!(menu, Route::ALL.to_vec());
    }

    #[test]
    fn role_and_department_grants_merge_in_route_order() {
        let menu = MenuPolicy::default().menu_for(&user("store", "S1", "Accounts"));
        assert_eq!(
            menu,
            vec![
                Route::RepairPayments,
                Route::Indents,
                Route::ApproveIndent,
                Route::Inventory,
                Route::StoreOutApproval,
            ]
        );
    }

    #[test]
    fn unknown_role_gets_the_basic_menu() {
        let menu = MenuPolicy::default().menu_for(&user("guest", "X", ""));
        assert_eq!(menu, vec![Route::Indents]);
        let empty = MenuPolicy {
            role_grants: Vec::new(),
            ..MenuPolicy::default()
        };
        assert_eq!(empty.menu_for(&user("guest", "X", "")), vec![Route::Indents]);
    }
}
