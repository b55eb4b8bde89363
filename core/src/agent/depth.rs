//! Recursion depth guard

use serde_json::Value;

/// True when a delegation at `depth` must not run
pub fn depth_exceeded(depth: usize, max_depth: usize) -> bool {
    depth > max_depth
}

/// Result returned instead of running a delegation that is too deep
pub fn max_depth_sentinel(max_depth: usize) -> Value {
    Value::String(format!(
        "[Max recursion depth {} reached. Returning without further processing.]",
        max_depth
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_allows_up_to_max() {
        assert!(!depth_exceeded(0, 1));
        assert!(!depth_exceeded(1, 1));
        assert!(depth_exceeded(2, 1));
        assert!(depth_exceeded(1, 0));
    }

    #[test]
    fn test_sentinel_names_the_limit() {
        assert_eq!(
            max_depth_sentinel(1),
            Value::String(
                "[Max recursion depth 1 reached. Returning without further processing.]"
                    .to_string()
            )
        );
    }
}
