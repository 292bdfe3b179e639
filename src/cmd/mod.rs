pub mod history;
pub mod login;
pub mod proxy;
pub mod rules;
pub mod tenant;
pub mod update;
pub mod upn;
