//! The registered transformation passes

pub mod bullets;
pub mod drop;
pub mod merge;
pub mod replace;
pub mod sections;
pub mod split;
pub mod strip;
pub mod tag;

pub use bullets::NestBullets;
pub use drop::DropElements;
pub use merge::{MergeByTag, MergeByTagConfig};
pub use replace::{RegexReplace, RegexReplaceConfig};
pub use sections::NestSections;
pub use split::{SplitText, SplitTextConfig};
pub use strip::{StripElements, StripElementsConfig};
pub use tag::{TagMatching, TagMatchingConfig, TagUpdateSpec};
