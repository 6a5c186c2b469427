mod support;

use browser_worker::observation;
use browser_worker::types::{Role, Tag};
use support::{FakeNode, FakePage};

#[test]
fn ids_are_dense_in_document_order() {
    let page = FakePage::new(
        "https://example.test/",
        vec![
            FakeNode::link("Home"),
            FakeNode::new("div"),
            FakeNode::button("Hidden").hidden(),
            FakeNode::input("search", "Search"),
            FakeNode::button("Go"),
        ],
    );

    let observation = observation::build(page.as_ref()).unwrap();
    let ids: Vec<usize> = observation.interactive_elements.iter().map(|e| e.id).collect();
    let texts: Vec<&str> = observation
        .interactive_elements
        .iter()
        .map(|e| e.text.as_str())
        .collect();

    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(texts, vec!["Home", "Search", "Go"]);
    assert_eq!(observation.interactive_elements[1].tag, Tag::Input);
    assert_eq!(observation.interactive_elements[1].role, Role::Input);
    assert_eq!(observation.interactive_elements[1].kind.as_deref(), Some("search"));
    assert_eq!(observation.url, "https://example.test/");
    assert_eq!(observation.title, "Fake");
}

#[test]
fn element_list_is_capped_at_eighty() {
    let nodes = (0..120).map(|i| FakeNode::link(&format!("link {i}"))).collect();
    let page = FakePage::new("https://example.test/", nodes);

    let observation = observation::build(page.as_ref()).unwrap();
    assert_eq!(observation.interactive_elements.len(), 80);
    assert_eq!(observation.interactive_elements[79].id, 79);
    assert_eq!(observation.interactive_elements[79].text, "link 79");
}

#[test]
fn text_fields_are_capped() {
    let page = FakePage::new(
        "https://example.test/",
        vec![FakeNode::link(&"x".repeat(500))],
    );
    page.state().body_text = "ж".repeat(9000);

    let observation = observation::build(page.as_ref()).unwrap();
    assert_eq!(observation.interactive_elements[0].text.chars().count(), 100);
    assert_eq!(observation.visible_text.chars().count(), 8000);
}

#[test]
fn unchanged_dom_gives_identical_snapshots() {
    let page = FakePage::new(
        "https://example.test/",
        vec![
            FakeNode::link("About"),
            FakeNode::input("text", "Name"),
            FakeNode::new("select"),
        ],
    );

    let first = observation::build(page.as_ref()).unwrap();
    let second = observation::build(page.as_ref()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.interactive_elements[2].role, Role::Control);
}

#[test]
fn empty_page_has_no_elements() {
    let page = FakePage::new("about:blank", Vec::new());
    page.state().body_text.clear();

    let observation = observation::build(page.as_ref()).unwrap();
    assert!(observation.interactive_elements.is_empty());
    assert_eq!(observation.visible_text, "");
}

#[test]
fn clipped_text_keeps_whitespace_at_the_cut() {
    let page = FakePage::new(
        "https://example.test/",
        vec![FakeNode::link(&format!("{} more words", "x".repeat(99)))],
    );

    let observation = observation::build(page.as_ref()).unwrap();
    assert_eq!(observation.interactive_elements[0].text, format!("{} ", "x".repeat(99)));
}
