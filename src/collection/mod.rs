mod core;
mod ops;
mod page;

pub use self::core::Collection;
pub use page::{Page, PageParams, offset_for, resolve, total_pages};
