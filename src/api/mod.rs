pub(crate) mod assignments;
pub(crate) mod classes;
pub(crate) mod documents;
pub(crate) mod errors;
pub(crate) mod grading;
pub(crate) mod handlers;
pub(crate) mod helpers;
pub(crate) mod notifications;
pub(crate) mod router;
pub(crate) mod sse;
pub(crate) mod uploads;
pub(crate) mod validation;
