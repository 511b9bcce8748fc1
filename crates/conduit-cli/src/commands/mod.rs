pub mod check;
pub mod dispatch;
pub mod history;
pub mod import;
pub mod schema;
pub mod search;
pub mod stats;
pub mod status;
