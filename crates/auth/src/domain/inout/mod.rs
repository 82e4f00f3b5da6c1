pub mod login;

pub mod prelude {
    pub use super::login::*;
}
