//! Integration tests for batch summarization.

mod common;

use common::{TestHarness, FROZEN_TIMESTAMP};
use notesync::config::schema::DEFAULT_PROMPT_TEMPLATE;
use notesync::summarize::{ScriptedCompletion, TEXT_MARKER};
use notesync::{Command, Status};

#[test]
fn test_no_text_files() {
    let h = TestHarness::new();
    let response = h.execute(Command::Distill);

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body.status, Status::NoFiles);
    assert_eq!(response.body.message, "No new text files found");
    assert!(h.completion.requests().is_empty());
}

#[test]
fn test_template_alone_is_not_distilled() {
    let h = TestHarness::new();
    h.seed_prompt("Just summarize.");

    let response = h.execute(Command::Distill);
    assert_eq!(response.body.status, Status::NoFiles);
}

#[test]
fn test_distill_writes_summary_and_archives_source() {
    let h = TestHarness::new();
    h.seed_prompt("Bullet points only.");
    h.seed_text("Board Meeting", "Q3 numbers reviewed");

    let response = h.execute(Command::Distill);
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body.status, Status::Success);
    assert_eq!(response.body.message, "Text files processed successfully");

    let processed = response.detail("processed").unwrap().as_array().unwrap();
    assert_eq!(processed.len(), 1);
    assert_eq!(processed[0]["status"], "success");
    assert_eq!(processed[0]["original_txt"], "Board Meeting.txt");
    assert_eq!(
        processed[0]["archived_as"],
        format!("Board Meeting_{}.txt", FROZEN_TIMESTAMP).as_str()
    );

    let summary = h.root_content("Board Meeting.md");
    assert!(summary.starts_with("### Summary"));
    assert!(summary.ends_with(&format!("Bullet points only.{}Q3 numbers reviewed", TEXT_MARKER)));
    assert_eq!(
        h.archived_names(),
        vec![format!("Board Meeting_{}.txt", FROZEN_TIMESTAMP)]
    );

    let requests = h.completion.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, h.config.completion.model);
    assert_eq!(requests[0].system, h.config.completion.system_prompt);
}

#[test]
fn test_missing_template_is_created_with_default() {
    let h = TestHarness::new();
    h.seed_text("Notes", "some notes");

    h.execute(Command::Distill);

    assert_eq!(
        h.root_content(&h.config.prompt.file_name),
        DEFAULT_PROMPT_TEMPLATE
    );
    let requests = h.completion.requests();
    assert!(requests[0].user.starts_with(DEFAULT_PROMPT_TEMPLATE.trim_end()));
}

#[test]
fn test_existing_summary_is_archived_not_overwritten() {
    let h = TestHarness::new();
    h.seed_prompt("Summarize.");
    h.seed_text("Weekly", "week one");
    h.execute(Command::Distill);

    // Mimics a fresh import of the same notebook on a later day
    h.seed_text("Weekly", "week two");
    h.execute(Command::Distill);

    let root = h.root_names();
    assert_eq!(root.iter().filter(|n| *n == "Weekly.md").count(), 1);
    assert!(h.root_content("Weekly.md").ends_with("week two"));
    assert!(h
        .archived_names()
        .contains(&format!("Weekly_{}.md", FROZEN_TIMESTAMP)));
}

#[test]
fn test_one_failure_does_not_stop_the_batch() {
    let completion = ScriptedCompletion::new(|request| {
        if request.user.contains("poison") {
            Err(notesync::CompletionError::EmptyResponse)
        } else {
            Ok("summary".to_string())
        }
    });
    let h = TestHarness::with_completion(completion);
    h.seed_prompt("Summarize.");
    h.seed_text("Good", "fine notes");
    h.seed_text("Bad", "poison notes");

    let response = h.execute(Command::Distill);
    assert_eq!(response.status_code, 200);

    let processed = response.detail("processed").unwrap().as_array().unwrap();
    let statuses: Vec<&str> = processed
        .iter()
        .map(|o| o["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["success", "error"]);

    // The failed source stays in place for the next run
    assert!(h.root_names().contains(&"Bad.txt".to_string()));
    assert!(!h.root_names().contains(&"Good.txt".to_string()));
}
