pub mod auth_service;
pub use auth_service::{AuthError, AuthService};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod blog_service;
pub use blog_service::{BlogError, BlogService, NewPost};

pub mod blog_service_impl;
pub use blog_service_impl::SeaOrmBlogService;

pub mod gate;
pub mod password;
pub use password::PasswordHashService;

pub mod session;
pub use session::{CurrentUser, Identity, SessionManager};

pub mod throttle;
pub use throttle::LoginThrottle;
