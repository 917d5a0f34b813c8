//! Prompt assembly for file and folder summarization calls.
//!
//! Template text is deliberately plain configuration data; everything that
//! varies per item (paths, permalinks, content) is injected here.

use crate::types::{FileArtifact, FolderArtifact};

pub const DEFAULT_FILE_PROMPT: &str = "Write a detailed technical explanation of what this code does. \
Focus on the high-level purpose of the code and how it may be used in the larger project. \
Include code examples where appropriate. Keep your response between 100 and 300 words. \
DO NOT RETURN MORE THAN 300 WORDS. Output should be in markdown format. \
Do not just list the methods and classes in this file.";

pub const DEFAULT_FOLDER_PROMPT: &str = "Write a technical explanation of what the code in this folder does \
and how it might fit into the larger project or work with other parts of the project. \
Give examples of how this code might be used. Include code examples where appropriate. \
Be concise. Include any information that may be relevant to a developer who is curious about this folder. \
Keep your response under 400 words. Output should be in markdown format.";

/// Prompt asking for a prose summary of one source file.
pub fn file_summary(
    project_name: &str,
    content_type: &str,
    file_path: &str,
    url: &str,
    content: &str,
    instruction: &str,
) -> String {
    format!(
        "You are acting as a {content_type} documentation expert for a project called {project}.\n\
         Below is the {content_type} from a file located at `{path}` ({url}).\n\
         {instruction}\n\
         Do not say \"this file is a part of the {project} project\".\n\n\
         {content_type}:\n{content}\n\n\
         Response:",
        content_type = content_type,
        project = project_name,
        path = file_path,
        url = url,
        instruction = instruction,
        content = content,
    )
}

/// Prompt asking for the questions a reader would bring to one source file.
pub fn file_questions(
    project_name: &str,
    content_type: &str,
    target_audience: &str,
    file_path: &str,
    content: &str,
) -> String {
    format!(
        "You are acting as a {content_type} documentation expert for a project called {project}.\n\
         Below is the {content_type} from a file located at `{path}`.\n\
         What are 3 questions that a {audience} might ask about this {content_type}? \
         Answer each question in 1-2 sentences. Output should be in markdown format.\n\n\
         {content_type}:\n{content}\n\n\
         Questions and answers:",
        content_type = content_type,
        project = project_name,
        path = file_path,
        audience = target_audience,
        content = content,
    )
}

/// Prompt summarizing a folder from its children's already-written summaries.
pub fn folder_summary(
    project_name: &str,
    content_type: &str,
    folder_path: &str,
    files: &[FileArtifact],
    folders: &[FolderArtifact],
    instruction: &str,
) -> String {
    let mut children = String::new();
    if !files.is_empty() {
        children.push_str("Files:\n");
        for file in files {
            children.push_str(&format!(
                "Name: {}\nSummary: {}\n\n",
                file.file_name, file.summary
            ));
        }
    }
    if !folders.is_empty() {
        children.push_str("Folders:\n");
        for folder in folders {
            children.push_str(&format!(
                "Name: {}\nSummary: {}\n\n",
                folder.folder_name, folder.summary
            ));
        }
    }
    format!(
        "You are acting as a {content_type} documentation expert for a project called {project}.\n\
         You are currently documenting the folder located at `{path}`.\n\
         Below is a list of the files and subfolders in this folder, with a summary of each.\n\
         {instruction}\n\n\
         {children}\
         Response:",
        content_type = content_type,
        project = project_name,
        path = folder_path,
        instruction = instruction,
        children = children,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArtifactStatus, Fingerprint};

    fn file(name: &str, summary: &str) -> FileArtifact {
        FileArtifact {
            file_name: name.to_string(),
            file_path: name.to_string(),
            url: String::new(),
            summary: summary.to_string(),
            questions: String::new(),
            checksum: Fingerprint::from_hex("00".to_string()),
            status: ArtifactStatus::Complete,
        }
    }

    #[test]
    fn file_summary_includes_content_and_instruction() {
        let prompt = file_summary(
            "acme",
            "code",
            "src/lib.rs",
            "https://example.com/src/lib.rs",
            "fn main() {}",
            "Explain briefly.",
        );
        assert!(prompt.contains("project called acme"));
        assert!(prompt.contains("`src/lib.rs`"));
        assert!(prompt.contains("fn main() {}"));
        assert!(prompt.contains("Explain briefly."));
    }

    #[test]
    fn questions_prompt_names_the_audience() {
        let prompt = file_questions("acme", "code", "new contributor", "a.rs", "x");
        assert!(prompt.contains("new contributor"));
        assert!(prompt.contains("3 questions"));
    }

    #[test]
    fn folder_prompt_lists_each_child_once() {
        let files = vec![file("a.txt", "summary of a"), file("b.txt", "summary of b")];
        let prompt = folder_summary("acme", "code", "p", &files, &[], "Describe.");
        assert_eq!(prompt.matches("Name: a.txt").count(), 1);
        assert!(prompt.contains("summary of b"));
        assert!(!prompt.contains("Folders:"));
    }
}
