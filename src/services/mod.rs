pub(crate) mod assignment_lifecycle;
pub(crate) mod assignment_setup;
pub(crate) mod dashboard;
pub(crate) mod documents;
pub(crate) mod grading_engine;
pub(crate) mod grading_status;
pub(crate) mod notifier;
pub(crate) mod question_paper;
pub(crate) mod roster_import;
pub(crate) mod rubric;
pub(crate) mod share_links;
