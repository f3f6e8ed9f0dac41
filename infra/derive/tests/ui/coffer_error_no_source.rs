use coffer_derive::coffer_error;
use std::borrow::Cow;

#[coffer_error]
pub enum StateError {
    #[error("Locked{}", format_context(.context))]
    Locked { context: Option<Cow<'static, str>> },

    #[error("Out of range: {index}")]
    OutOfRange { index: usize },
}

fn main() {
    let err = StateError::Locked { context: None };
    assert!(err.context_str().is_none());
}
