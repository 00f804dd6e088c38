pub mod analytics;
pub mod link;

pub use analytics::{
    AnalyticsEvent, AnalyticsSummary, BrowserCount, DeviceCount, HitMetadata, HourBucket,
    NewEvent, PeakHourEntry, ReferrerCount,
};
pub use link::{NewLink, ShortLink, ShortenRequest};
