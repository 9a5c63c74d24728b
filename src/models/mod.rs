pub mod disease;
pub mod document;
pub mod enums;
pub mod intent;
pub mod session;
pub mod symptom;

pub use disease::*;
pub use document::*;
pub use enums::*;
pub use intent::*;
pub use session::*;
pub use symptom::*;
