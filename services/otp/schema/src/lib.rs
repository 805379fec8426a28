pub mod accounts;
pub mod passcodes;
