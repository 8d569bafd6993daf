use std::{path::PathBuf, process::Command};

use da2404::template::Story;

fn da2404() -> Command {
    Command::new(env!("CARGO_BIN_EXE_da2404"))
}

fn scratch_path(file_name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(file_name)
}

#[test]
fn dumped_story_renders_back_to_a_pdf() {
    let story_path = scratch_path("cli-dumped-story.json");
    let output_pdf_path = scratch_path("cli-dumped-story.pdf");

    let status = da2404()
        .arg("--dump-story")
        .arg(&story_path)
        .status()
        .unwrap();
    assert!(status.success());
    let json = std::fs::read_to_string(&story_path).unwrap();
    assert!(json.starts_with("[\n    {\n        \"type\": \"table\""));
    let story: Story = serde_json::from_str(&json).unwrap();
    assert_eq!(story.len(), 13 + 2 * 4);

    let status = da2404()
        .arg("--story")
        .arg(&story_path)
        .arg("-o")
        .arg(&output_pdf_path)
        .status()
        .unwrap();
    assert!(status.success());
    let document = lopdf::Document::load(&output_pdf_path).unwrap();
    assert_eq!(document.get_pages().len(), 2);
}

#[test]
fn renders_the_form_with_a_configuration() {
    let configuration_path = scratch_path("cli-configuration.json");
    let output_pdf_path = scratch_path("cli-configuration.pdf");
    std::fs::write(&configuration_path, r#"{ "supplementarySheets": 0 }"#).unwrap();

    let status = da2404()
        .arg("-c")
        .arg(&configuration_path)
        .arg("-o")
        .arg(&output_pdf_path)
        .status()
        .unwrap();
    assert!(status.success());
    let document = lopdf::Document::load(&output_pdf_path).unwrap();
    assert_eq!(document.get_pages().len(), 1);
}

#[test]
fn fails_without_an_output_path() {
    let output = da2404().output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--output"), "unexpected error: {}", stderr);
}

#[test]
fn exits_with_one_when_the_story_is_invalid() {
    let story_path = scratch_path("cli-invalid-story.json");
    std::fs::write(&story_path, r#"[{ "type": "table", "rows": [] }]"#).unwrap();

    let status = da2404()
        .arg("--story")
        .arg(&story_path)
        .arg("-o")
        .arg(scratch_path("cli-invalid-story.pdf"))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}
