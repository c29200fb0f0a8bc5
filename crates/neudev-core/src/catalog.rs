//! Language catalog lookups and pre-run code checks.

use crate::session::RunRequest;
use crate::{Result, TerminalError};
use neudev_types::ProgrammingLanguage;
use once_cell::sync::Lazy;
use regex::Regex;

/// Catalog language id to the compiler's short code.
const COMPILER_CODES: &[(u32, &str)] = &[(1, "java"), (2, "cs"), (3, "py")];

static JAVA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(public\s+class\s+\w+|System\.out\.println|import\s+java\.)").unwrap()
});

static PYTHON_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(print\s*\(|def\s+\w+\(|import\s+\w+|class\s+\w+|for\s+\w+\s+in|while\s+|if\s+)")
        .unwrap()
});

static CSHARP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(using\s+System;|namespace\s+\w+|Console\.WriteLine)").unwrap()
});

/// The languages the compiler currently supports.
pub fn builtin_languages() -> Vec<ProgrammingLanguage> {
    [(1, "Java"), (2, "C#"), (3, "Python")]
        .into_iter()
        .map(|(id, name)| ProgrammingLanguage {
            id,
            name: name.to_string(),
            icon: None,
        })
        .collect()
}

/// Compiler short code for a catalog language id.
pub fn compiler_code(language_id: u32) -> Option<&'static str> {
    COMPILER_CODES
        .iter()
        .find(|(id, _)| *id == language_id)
        .map(|(_, code)| *code)
}

/// Find a language by id, name (case-insensitive) or compiler short code.
pub fn find_language<'a>(
    languages: &'a [ProgrammingLanguage],
    query: &str,
) -> Option<&'a ProgrammingLanguage> {
    let query = query.trim();
    if let Ok(id) = query.parse::<u32>() {
        return languages.iter().find(|l| l.id == id);
    }
    languages.iter().find(|l| {
        l.name.eq_ignore_ascii_case(query)
            || compiler_code(l.id).is_some_and(|code| code.eq_ignore_ascii_case(query))
    })
}

/// Rough plausibility check that `code` is written in `language_name`.
///
/// Languages without a known pattern always pass.
pub fn looks_like(code: &str, language_name: &str) -> bool {
    let pattern: &Regex = match language_name {
        "Java" => &*JAVA_PATTERN,
        "Python" => &*PYTHON_PATTERN,
        "C#" => &*CSHARP_PATTERN,
        _ => return true,
    };
    pattern.is_match(code.trim())
}

/// Validate code for a language and build the run request.
pub fn prepare_run(language: &ProgrammingLanguage, code: &str, input: &str) -> Result<RunRequest> {
    if code.trim().is_empty() {
        return Err(TerminalError::EmptyCode);
    }
    if !looks_like(code, &language.name) {
        return Err(TerminalError::InvalidCode(language.name.clone()));
    }
    let short_code = compiler_code(language.id)
        .ok_or_else(|| TerminalError::UnsupportedLanguage(language.name.clone()))?;

    Ok(RunRequest {
        language: short_code.to_string(),
        code: code.to_string(),
        input: input.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_codes() {
        assert_eq!(compiler_code(1), Some("java"));
        assert_eq!(compiler_code(2), Some("cs"));
        assert_eq!(compiler_code(3), Some("py"));
        assert_eq!(compiler_code(9), None);
    }

    #[test]
    fn test_find_language() {
        let languages = builtin_languages();
        assert_eq!(find_language(&languages, "3").unwrap().name, "Python");
        assert_eq!(find_language(&languages, "python").unwrap().id, 3);
        assert_eq!(find_language(&languages, "cs").unwrap().name, "C#");
        assert!(find_language(&languages, "rust").is_none());
    }

    #[test]
    fn test_looks_like() {
        assert!(looks_like("print('hello')", "Python"));
        assert!(!looks_like("console.log('hello')", "Python"));
        assert!(looks_like(
            "public class Main { public static void main(String[] a) {} }",
            "Java"
        ));
        assert!(looks_like("Console.WriteLine(\"hi\");", "C#"));
        assert!(looks_like("anything", "Kotlin"));
    }

    #[test]
    fn test_prepare_run() {
        let python = ProgrammingLanguage {
            id: 3,
            name: "Python".to_string(),
            icon: None,
        };
        let request = prepare_run(&python, "print(input())", "5").unwrap();
        assert_eq!(request.language, "py");
        assert_eq!(request.input, "5");

        assert!(matches!(
            prepare_run(&python, "   ", ""),
            Err(TerminalError::EmptyCode)
        ));
        assert!(matches!(
            prepare_run(&python, "SELECT 1;", ""),
            Err(TerminalError::InvalidCode(_))
        ));
    }

    #[test]
    fn test_prepare_run_unsupported_language() {
        let kotlin = ProgrammingLanguage {
            id: 7,
            name: "Kotlin".to_string(),
            icon: None,
        };
        assert!(matches!(
            prepare_run(&kotlin, "fun main() {}", ""),
            Err(TerminalError::UnsupportedLanguage(_))
        ));
    }
}
