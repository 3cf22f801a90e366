//! News search: the Newsdata.io client, its wire types and the date window.
//!
//! # Module Structure
//!
//! - `newsdata`: three query strategies per account, pagination, bounded retry
//! - `types`: result rows and publication-date parsing
//! - `window`: lookback window and ISO-week run key

mod newsdata;
mod types;
mod window;

pub use newsdata::{
    NewsError, NewsdataClient, QueryStrategy, PRESS_WIRE_DOMAINS, PRESS_WIRE_EXCLUDED,
};
pub use types::{parse_pub_date, NewsArticle};
pub use window::{iso_week_key, DateWindow};
