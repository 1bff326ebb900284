// src/llm/prompt.rs

use crate::github::FileRef;

/* ============================================================
   Stage 1 — summary prompt
   ============================================================ */

/// Ask for candidate test-case summaries across the given files.
///
/// Rendering is deterministic: files appear in input order, blank-line
/// separated, content passed through untouched — no truncation, no
/// escaping.
pub fn build_summary_prompt(files: &[FileRef]) -> String {
    let mut out = String::new();

    out.push_str("You are a testing expert. Given the following code files:\n");

    for (i, file) in files.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("File: {}\nContent:\n{}\n", file.path, file.content));
    }

    out.push_str(
        "\nGenerate a short list of possible test cases (1-2 line summaries) for each file.\n",
    );

    out
}

/* ============================================================
   Stage 2 — test code prompt
   ============================================================ */

/// Ask for a complete test case in the chosen framework.
pub fn build_test_code_prompt(summary: &str, framework: &str) -> String {
    format!(
        "Write a full {} test case based on this summary:\n{}\n",
        framework, summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, content: &str) -> FileRef {
        FileRef {
            path: path.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn summary_prompt_renders_files_in_input_order() {
        let prompt = build_summary_prompt(&[
            file("a.js", "function add(a,b){return a+b}"),
            file("b.js", "function sub(a,b){return a-b}"),
        ]);

        let a = prompt.find("File: a.js").unwrap();
        let b = prompt.find("File: b.js").unwrap();
        assert!(a < b);
        assert!(prompt.contains("Content:\nfunction add(a,b){return a+b}"));
        assert!(prompt.contains("Content:\nfunction sub(a,b){return a-b}"));
    }

    #[test]
    fn summary_prompt_does_not_alter_content() {
        let content = "line one\n  indented <html> & \"quotes\"\n";
        let prompt = build_summary_prompt(&[file("x.py", content)]);
        assert!(prompt.contains(content));
    }

    #[test]
    fn test_code_prompt_names_framework_and_summary() {
        let prompt = build_test_code_prompt("Test add() with positive numbers", "Jest");
        assert!(prompt.contains("full Jest test case"));
        assert!(prompt.contains("Test add() with positive numbers"));
    }
}
