use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

const TOKEN_BYTES: usize = 16;

pub(crate) fn generate_share_token() -> String {
    let mut bytes = [0_u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub(crate) fn share_url(public_base_url: &str, token: &str) -> String {
    format!("{}/results/{token}", public_base_url.trim_end_matches('/'))
}

pub(crate) fn feedback_url(public_base_url: &str, assignment_id: &str, student_id: &str) -> String {
    format!("{}/feedback/{assignment_id}/{student_id}", public_base_url.trim_end_matches('/'))
}

pub(crate) fn document_url(public_base_url: &str, api_prefix: &str, document_id: &str) -> String {
    format!("{}{api_prefix}/documents/{document_id}", public_base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let first = generate_share_token();
        let second = generate_share_token();
        assert_eq!(first.len(), 22);
        assert_ne!(first, second);
        assert!(first.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
    }

    #[test]
    fn urls_join_without_double_slashes() {
        assert_eq!(
            share_url("https://markdesk.school/", "abc"),
            "https://markdesk.school/results/abc"
        );
        assert_eq!(
            feedback_url("https://markdesk.school", "assign-001", "STU-001"),
            "https://markdesk.school/feedback/assign-001/STU-001"
        );
        assert_eq!(
            document_url("http://localhost:8000/", "/api/v1", "doc-1"),
            "http://localhost:8000/api/v1/documents/doc-1"
        );
    }
}
