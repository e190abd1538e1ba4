mod posts;
mod types;

pub use posts::{merge_new_posts, validate_date, PostStore};
pub use types::{PostRecord, StoreError, UNTITLED};
