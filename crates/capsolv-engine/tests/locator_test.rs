use capsolv_engine::locator::{NEARBY_RADIUS_PX, locate};
use capsolv_engine::protocol::{Node, PageSnapshot, Rect};

fn node(id: u32, tag: &str, parent: Option<u32>, attrs: &[(&str, &str)], pos: (f32, f32)) -> Node {
    Node {
        id,
        tag: tag.into(),
        attributes: attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        rect: Rect {
            x: pos.0,
            y: pos.1,
            width: 100.0,
            height: 30.0,
        },
        parent,
        children: Vec::new(),
        value: None,
    }
}

fn page(nodes: Vec<Node>) -> PageSnapshot {
    let mut page = PageSnapshot::default();
    for n in nodes {
        page.insert(n);
    }
    page
}

#[test]
fn same_form_keyword_field_beats_closer_outside_field() {
    // A keyword-matching input inside the image's form, and a nearer plain
    // input outside the form. The in-form field must win.
    let page = page(vec![
        node(0, "body", None, &[], (0.0, 0.0)),
        node(1, "form", Some(0), &[], (0.0, 0.0)),
        node(2, "img", Some(1), &[("src", "c.png")], (10.0, 10.0)),
        node(3, "input", Some(1), &[("name", "captcha_answer")], (10.0, 500.0)),
        node(4, "input", Some(0), &[("name", "email")], (12.0, 12.0)),
    ]);
    assert_eq!(locate(&page, 2), Some(3));
}

#[test]
fn same_form_falls_back_to_first_text_field() {
    let page = page(vec![
        node(0, "body", None, &[], (0.0, 0.0)),
        node(1, "form", Some(0), &[], (0.0, 0.0)),
        node(2, "img", Some(1), &[("src", "c.png")], (10.0, 10.0)),
        node(3, "input", Some(1), &[("name", "username")], (10.0, 50.0)),
        node(4, "input", Some(1), &[("name", "password"), ("type", "password")], (10.0, 90.0)),
    ]);
    assert_eq!(locate(&page, 2), Some(3));
}

#[test]
fn non_text_inputs_are_ignored() {
    let page = page(vec![
        node(0, "body", None, &[], (0.0, 0.0)),
        node(1, "form", Some(0), &[], (0.0, 0.0)),
        node(2, "img", Some(1), &[("src", "c.png")], (10.0, 10.0)),
        node(3, "input", Some(1), &[("type", "checkbox"), ("name", "captcha_opt")], (10.0, 50.0)),
        node(4, "input", Some(1), &[("type", "text"), ("name", "answer")], (10.0, 90.0)),
    ]);
    // Checkbox is skipped even though it keyword-matches.
    assert_eq!(locate(&page, 2), Some(4));
}

#[test]
fn ancestor_scan_finds_keyword_field_outside_any_form() {
    let page = page(vec![
        node(0, "body", None, &[], (0.0, 0.0)),
        node(1, "div", Some(0), &[], (0.0, 0.0)),
        node(2, "div", Some(1), &[], (0.0, 0.0)),
        node(3, "img", Some(2), &[("src", "c.png")], (10.0, 10.0)),
        node(4, "input", Some(1), &[("placeholder", "Enter verification")], (10.0, 60.0)),
    ]);
    assert_eq!(locate(&page, 3), Some(4));
}

#[test]
fn ancestor_scan_excludes_document_root() {
    // The only keyword field hangs directly off the root; the ancestor walk
    // must not consider the root level, and the field is too far for the
    // distance fallback.
    let page = page(vec![
        node(0, "body", None, &[], (0.0, 0.0)),
        node(1, "div", Some(0), &[], (0.0, 0.0)),
        node(2, "img", Some(1), &[("src", "c.png")], (0.0, 0.0)),
        node(3, "input", Some(0), &[("id", "security_code")], (0.0, 400.0)),
    ]);
    assert_eq!(locate(&page, 2), None);
}

#[test]
fn nearest_field_within_radius_wins() {
    let page = page(vec![
        node(0, "body", None, &[], (0.0, 0.0)),
        node(1, "div", Some(0), &[], (0.0, 0.0)),
        node(2, "img", Some(1), &[("src", "c.png")], (0.0, 0.0)),
        node(3, "input", Some(0), &[("name", "far")], (0.0, 250.0)),
        node(4, "input", Some(0), &[("name", "near")], (0.0, 120.0)),
    ]);
    assert_eq!(locate(&page, 2), Some(4));
}

#[test]
fn distance_cutoff_is_strict() {
    let make = |distance: f32| {
        page(vec![
            node(0, "body", None, &[], (0.0, 0.0)),
            node(1, "div", Some(0), &[], (0.0, 0.0)),
            node(2, "img", Some(1), &[("src", "c.png")], (0.0, 0.0)),
            node(3, "input", Some(0), &[("name", "field")], (0.0, distance)),
        ])
    };
    assert_eq!(locate(&make(301.0), 2), None);
    assert_eq!(locate(&make(299.0), 2), Some(3));
    assert_eq!(NEARBY_RADIUS_PX, 300.0);
}

#[test]
fn no_candidate_anywhere_yields_none() {
    let page = page(vec![
        node(0, "body", None, &[], (0.0, 0.0)),
        node(1, "img", Some(0), &[("src", "c.png")], (0.0, 0.0)),
    ]);
    assert_eq!(locate(&page, 1), None);
}
