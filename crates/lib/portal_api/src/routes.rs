//! Route paths.

pub const POST_AUTH_EMPLOYEE_LOGIN: &str = "/auth/employee/login";
pub const POST_AUTH_CUSTOMER_LOGIN: &str = "/auth/customer/login";
pub const POST_AUTH_CUSTOMER_REGISTER: &str = "/auth/customer/register";
pub const POST_AUTH_LOGOUT: &str = "/auth/logout";
pub const AUTH_ME: &str = "/auth/me";

pub const TICKETS: &str = "/tickets";
pub const TICKETS_ID: &str = "/tickets/{id}";

pub const GET_ADMIN_PENDING_CUSTOMERS: &str = "/admin/pending-customers";
pub const POST_ADMIN_APPROVE_CUSTOMER: &str = "/admin/approve-customer/{id}";
pub const POST_ADMIN_DEACTIVATE_CUSTOMER: &str = "/admin/deactivate-customer/{id}";

pub const GET_LINKS: &str = "/links";
