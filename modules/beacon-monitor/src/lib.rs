mod feed;
mod paged;
mod rss;
mod scheduler;
mod task_monitor;

pub use feed::{BaseFeedMonitor, FeedEntityConfig, FeedSource};
pub use paged::{PageContext, PagedFeedConfig, PagedFeedMonitor, PagedFeedSource};
pub use rss::RssFeedSource;
pub use scheduler::Scheduler;
pub use task_monitor::{MonitorEntity, MonitorSource, TaskMonitor};
