pub mod config;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod provider;
pub mod request;
pub mod session;
pub mod version;
pub mod wildcard;

pub use error::{Error, Result};
pub use session::{PackageQuery, Session, SourceQuery};
pub use version::{PackageVersion, PackageVersionRange, VersionScheme};
