mod auth;
mod health_check;

pub use auth::{
    change_password, check, forgot_password, login, logout, register, reset_password,
    verify_email,
};
pub use health_check::health_check;
