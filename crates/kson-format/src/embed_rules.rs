//! Resolving the formatter's `(path_pattern, tag?)` embed-block rules
//! against a position in the AST (spec §4.6 "Embed rules").
//!
//! `path_pattern` is a JSON-Pointer-glob (`/a/b/*`, `/a/**`); matching reuses
//! the workspace's `glob-match` dependency by treating the pointer's `/`
//! segments as a glob path, the same way the teacher's `glob-matcher`/
//! `glob-match` crates treat filesystem paths.

use crate::options::EmbedBlockRule;

/// A single path segment pushed while walking the AST: an object key or an
/// array index, joined with `/` to form a JSON pointer.
#[derive(Debug, Clone)]
pub struct PathStack(Vec<String>);

impl PathStack {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push_key(&mut self, key: &str) {
        self.0.push(key.replace('~', "~0").replace('/', "~1"));
    }

    pub fn push_index(&mut self, index: usize) {
        self.0.push(index.to_string());
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }

    pub fn as_pointer(&self) -> String {
        if self.0.is_empty() {
            "/".to_string()
        } else {
            let mut s = String::new();
            for seg in &self.0 {
                s.push('/');
                s.push_str(seg);
            }
            s
        }
    }
}

impl Default for PathStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the rule that applies at `pointer`, last-rule-wins when more than
/// one pattern matches (spec §4.6: "last-rule-wins when paths overlap").
pub fn matching_rule<'a>(pointer: &str, rules: &'a [EmbedBlockRule]) -> Option<&'a EmbedBlockRule> {
    rules.iter().rev().find(|rule| glob_match::glob_match(&rule.path_pattern, pointer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_stack_builds_pointer() {
        let mut stack = PathStack::new();
        stack.push_key("a");
        stack.push_index(2);
        stack.push_key("b/c");
        assert_eq!(stack.as_pointer(), "/a/2/b~1c");
    }

    #[test]
    fn wildcard_matches_direct_child() {
        let rules = vec![EmbedBlockRule {
            path_pattern: "/a/*".to_string(),
            tag: Some("sql".to_string()),
        }];
        assert!(matching_rule("/a/b", &rules).is_some());
        assert!(matching_rule("/a/b/c", &rules).is_none());
    }

    #[test]
    fn double_star_matches_any_depth() {
        let rules = vec![EmbedBlockRule {
            path_pattern: "/a/**".to_string(),
            tag: None,
        }];
        assert!(matching_rule("/a/b/c/d", &rules).is_some());
    }

    #[test]
    fn last_matching_rule_wins() {
        let rules = vec![
            EmbedBlockRule {
                path_pattern: "/a/*".to_string(),
                tag: Some("first".to_string()),
            },
            EmbedBlockRule {
                path_pattern: "/a/b".to_string(),
                tag: Some("second".to_string()),
            },
        ];
        let rule = matching_rule("/a/b", &rules).unwrap();
        assert_eq!(rule.tag.as_deref(), Some("second"));
    }
}
