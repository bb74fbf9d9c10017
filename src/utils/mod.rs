pub mod logging;
pub mod url;
pub mod wrap;
