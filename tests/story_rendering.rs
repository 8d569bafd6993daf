use da2404::{
    configuration::RenderConfiguration,
    form,
    template::{self, DocTemplate, Story},
};

fn to_pretty_json(story: &Story) -> String {
    String::from_utf8(template::story_to_json(story).unwrap()).unwrap()
}

#[test]
fn form_story_survives_a_json_round_trip() {
    let configuration = RenderConfiguration::default();
    let story = form::story(&configuration);
    let json = to_pretty_json(&story);
    let parsed: Story = serde_json::from_str(&json).unwrap();
    similar_asserts::assert_eq!(to_pretty_json(&parsed), json);
    assert!(json.starts_with("[\n    {\n        \"type\": \"table\""));

    // Rendering the parsed story gives the very same document as rendering the form directly
    let from_json = DocTemplate::letter_form()
        .build(&parsed, &configuration)
        .unwrap()
        .save_to_bytes()
        .unwrap();
    let direct = form::create_2404(&configuration)
        .unwrap()
        .save_to_bytes()
        .unwrap();
    assert!(from_json == direct, "the story rendered from JSON differs");
}

#[test]
fn renders_a_handwritten_story() {
    let json = r#"[
        {
            "type": "table",
            "rows": [["TM ITEM NO.", { "text": "<b>STATUS</b>", "style": { "alignment": "center" } }]],
            "columnWidths": [100.0, 200.0],
            "style": [
                { "range": { "start": [0, 0], "end": [-1, -1] }, "directive": "line", "edges": "grid", "weight": 0.5 },
                { "range": { "start": [0, 0], "end": [0, 0] }, "directive": "font", "font": "Helvetica-Bold", "size": 9.0 }
            ]
        },
        { "type": "spacer", "height": 20.0 },
        { "type": "paragraph", "text": "Checked &amp; signed<br/><i>by the supervisor</i>" },
        { "type": "pageBreak" },
        { "type": "paragraph", "text": "Second page" }
    ]"#;
    let story: Story = serde_json::from_str(json).unwrap();
    let mut pdf_document = DocTemplate::letter_form()
        .build(&story, &RenderConfiguration::default())
        .unwrap();
    let bytes = pdf_document.save_to_bytes().unwrap();

    let document = lopdf::Document::load_mem(&bytes).unwrap();
    let pages = document.get_pages();
    assert_eq!(pages.len(), 2);
    let content = document.get_page_content(pages[&1]).unwrap();
    let content = lopdf::content::Content::decode(&content).unwrap();
    let shown: Vec<&[u8]> = content
        .operations
        .iter()
        .filter(|operation| operation.operator == "Tj")
        .map(|operation| operation.operands[0].as_str().unwrap())
        .collect();
    assert_eq!(
        shown,
        vec![
            b"TM ITEM NO.".as_slice(),
            b"STATUS".as_slice(),
            b"Checked & signed".as_slice(),
            b"by the supervisor".as_slice(),
        ]
    );
    // The top and bottom edges plus three vertical ones
    let strokes = content
        .operations
        .iter()
        .filter(|operation| operation.operator == "S")
        .count();
    assert_eq!(strokes, 5);
}

#[test]
fn rejects_stories_with_inconsistent_tables() {
    let json = r#"[{ "type": "table", "rows": [["a", "b"]], "columnWidths": [100.0] }]"#;
    let story: Story = serde_json::from_str(json).unwrap();
    let error = DocTemplate::letter_form()
        .build(&story, &RenderConfiguration::default())
        .unwrap_err();
    assert!(error.to_string().contains("column widths"));
}
