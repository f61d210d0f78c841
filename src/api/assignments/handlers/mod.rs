mod detail;
mod lifecycle;
mod rubric;
mod setup;

pub(super) use detail::{get_assignment, get_progress, get_readiness, update_assignment};
pub(super) use lifecycle::{activate_assignment, complete_assignment, share_results};
pub(super) use rubric::{add_criterion, delete_criterion, list_rubric, update_criterion};
pub(super) use setup::{
    list_questions, replace_questions, upload_marking_scheme, upload_question_paper,
};
