//! Route paths.

pub const USERS: &str = "/api/v1/users";
pub const USERS_SIGNUP: &str = "/api/v1/users/signup";
pub const USERS_LOGIN: &str = "/api/v1/users/login";
pub const USERS_REFRESH: &str = "/api/v1/users/refresh";
pub const USERS_LOGOUT: &str = "/api/v1/users/logout";
pub const USERS_ID: &str = "/api/v1/users/{id}";

pub const RESTAURANTS: &str = "/api/v1/restaurants";
pub const RESTAURANTS_ID: &str = "/api/v1/restaurants/{id}";

pub const CUISINES: &str = "/api/v1/cuisines";
pub const CUISINES_ID: &str = "/api/v1/cuisines/{id}";

pub const CATEGORIES: &str = "/api/v1/categories";
pub const CATEGORIES_ID: &str = "/api/v1/categories/{id}";
