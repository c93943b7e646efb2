pub const USERS: &str = "/settings/users";
