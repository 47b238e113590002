pub mod datatypes;
pub mod element;
pub mod pattern;
pub mod locate;
pub mod extract;
pub mod adjust;
pub mod rewrite;
pub mod amount;
pub mod document;
pub mod utils;
pub mod debug;

// 重新导出主要结构
pub use document::{adjust, Document, DocumentStats};
pub use element::{Element, NodeChild};
pub use locate::Candidate;
pub use extract::AmountToken;
pub use adjust::AdjustmentSpec;
pub use amount::ExtractedAmount;
pub use utils::PriceError;
pub use debug::DocumentDebugger;

// 常量定义
pub const CURRENCY_MARKER: char = '$';
pub const SUPPORTED_EXTENSIONS: &[&str] = &["html", "htm", "xhtml"];
