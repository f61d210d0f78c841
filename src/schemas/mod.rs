use std::collections::HashMap;

use serde::Serialize;

pub(crate) mod assignment;
pub(crate) mod class;
pub(crate) mod document;
pub(crate) mod grading;
pub(crate) mod rubric;
pub(crate) mod student;

pub(crate) use crate::core::time::format_primitive;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) api_prefix: String,
}
