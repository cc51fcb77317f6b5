pub mod device;
pub mod issue;
pub mod smart;
