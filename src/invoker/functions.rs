//! Functions compiled into the invoker binary.
//!
//! The manifest's `location` names the artifact that ships them; the
//! registry is built once at startup and never mutated afterwards.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::invoker::registry::{FnHandler, HandlerRegistry};

#[derive(Debug, Deserialize)]
pub struct Text {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct WordCount {
    pub words: usize,
    pub characters: usize,
}

pub fn echo(input: Value) -> Result<Value, String> {
    Ok(input)
}

pub fn uppercase(input: String) -> Result<String, String> {
    Ok(input.to_uppercase())
}

pub fn reverse(input: String) -> Result<String, String> {
    Ok(input.chars().rev().collect())
}

pub fn word_count(input: Text) -> Result<WordCount, String> {
    if input.text.trim().is_empty() {
        return Err("text must not be blank".to_string());
    }
    Ok(WordCount {
        words: input.text.split_whitespace().count(),
        characters: input.text.chars().count(),
    })
}

/// Registry holding every builtin function.
pub fn builtin_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry
        .register("echo", echo)
        .register("uppercase", uppercase)
        .register("reverse", reverse)
        .register("wordCount", word_count)
        // Routing entry point of the hosting framework; never listed.
        .insert(Arc::new(FnHandler::new("functionRouter", echo).internal()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::registry::FunctionCatalog;

    #[test]
    fn builtins_registered() {
        let registry = builtin_registry();
        for name in ["echo", "uppercase", "reverse", "wordCount", "functionRouter"] {
            assert!(registry.lookup(name).is_some(), "{name} missing");
        }
        let internal: Vec<_> = registry
            .descriptors()
            .into_iter()
            .filter(|d| d.internal)
            .map(|d| d.name)
            .collect();
        assert_eq!(internal, ["functionRouter"]);
    }

    #[test]
    fn word_count_rejects_blank() {
        let handler = builtin_registry().lookup("wordCount").unwrap();
        assert!(handler.invoke(br#"{"text": "   "}"#).is_err());

        let out = handler.invoke(br#"{"text": "two words"}"#).unwrap();
        assert_eq!(out["words"], 2);
        assert_eq!(out["characters"], 9);
    }

    #[test]
    fn text_functions() {
        let registry = builtin_registry();
        let reverse = registry.lookup("reverse").unwrap();
        assert_eq!(reverse.invoke(b"abc").unwrap(), "cba");
        let upper = registry.lookup("uppercase").unwrap();
        assert_eq!(upper.invoke(br#""abc""#).unwrap(), "ABC");
    }
}
