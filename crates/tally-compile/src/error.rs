//! Error types for checklist compilation

use crate::plan::AttachmentTarget;

/// Errors raised while compiling a resolved template
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Two distinct (section, test, name) triples escape to one path
    #[error("attachment path '{path}' derived from both {first} and {second}")]
    PathCollision {
        path: String,
        first: String,
        second: String,
    },
}

impl CompileError {
    /// Create a path-collision error naming both triples
    pub fn path_collision(first: &AttachmentTarget, second: &AttachmentTarget) -> Self {
        Self::PathCollision {
            path: second.path.clone(),
            first: first.to_string(),
            second: second.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_error_names_both_triples() {
        let a = AttachmentTarget::new("actor1", "t1", "a b");
        let b = AttachmentTarget::new("actor1", "t1", "a\u{00A0}b");
        let err = CompileError::path_collision(&a, &b);
        let msg = err.to_string();
        assert!(msg.contains("(actor1, t1, a b)"));
        assert!(msg.contains("(actor1, t1, a\u{00A0}b)"));
    }
}
