pub mod pagewright;

pub use pagewright::{GeneratedComponent, Pagewright, PagewrightBuilder};
