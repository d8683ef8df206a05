mod cache;
mod specificity;
mod table;

pub use self::cache::{CacheStats, LruCache, MatchCache};
pub use self::specificity::{compare_specificity, rank, Specificity};
pub use self::table::{Matched, MethodFilter, Registration, RouteTable};
