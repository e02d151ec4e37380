pub(crate) mod errors;
pub(crate) mod evaluate;
pub(crate) mod handlers;
pub(crate) mod papers;
pub(crate) mod router;
pub(crate) mod validation;
