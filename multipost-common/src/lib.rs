pub mod calendar;
pub mod export;
pub mod legacy;
pub mod model;
pub mod query;
pub mod util;
