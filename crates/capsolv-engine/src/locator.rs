//! Answer-field location strategies.
//!
//! Given a detected challenge image, find the most plausible input field for
//! the transcription. Strategies run in priority order and the first hit
//! wins; there is no scoring across strategies:
//!
//! 1. Same form: a keyword-matching text field in the image's form, else the
//!    form's first text field.
//! 2. Ancestor containers: walking up from the image's parent (document root
//!    exclusive), the first keyword-matching text field at each level.
//! 3. Nearest by distance: the closest text field in the whole document,
//!    strictly within [`NEARBY_RADIUS_PX`] of the image's top-left corner.

use capsolv_common::protocol::{Node, PageSnapshot};

/// Case-insensitive substring tokens that mark a field as challenge-related.
pub const CAPTCHA_KEYWORDS: &[&str] = &[
    "captcha",
    "verify",
    "verification",
    "code",
    "security",
    "challenge",
    "auth",
    "validation",
];

/// Cutoff for the nearest-by-distance fallback.
pub const NEARBY_RADIUS_PX: f32 = 300.0;

pub fn locate(page: &PageSnapshot, image: u32) -> Option<u32> {
    let image_node = page.node(image)?;

    // Strategy 1: inputs in the same form.
    if let Some(form) = page.ancestors(image).into_iter().find(|n| n.tag == "form") {
        let fields: Vec<&Node> = text_fields_in(page, form.id);
        if let Some(field) = fields.iter().find(|f| is_keyword_field(f)) {
            return Some(field.id);
        }
        if let Some(first) = fields.first() {
            return Some(first.id);
        }
    }

    // Strategy 2: keyword-matching inputs in ancestor containers, walking
    // toward the document root (exclusive).
    for ancestor in page.ancestors(image) {
        if ancestor.parent.is_none() {
            break;
        }
        if let Some(field) = text_fields_in(page, ancestor.id)
            .into_iter()
            .find(|f| is_keyword_field(f))
        {
            return Some(field.id);
        }
    }

    // Strategy 3: closest input anywhere on the page, within the radius.
    let mut closest: Option<(u32, f32)> = None;
    for field in page.nodes().filter(|n| is_text_field(n)) {
        let distance = image_node.rect.top_left_distance(&field.rect);
        if distance < NEARBY_RADIUS_PX && closest.is_none_or(|(_, best)| distance < best) {
            closest = Some((field.id, distance));
        }
    }
    closest.map(|(id, _)| id)
}

/// Text-like inputs able to receive a solution: text, password, or typeless.
pub fn is_text_field(node: &Node) -> bool {
    node.tag == "input"
        && matches!(node.attr("type"), None | Some("text") | Some("password"))
}

/// Whether the field's id/name/placeholder/class carries a challenge keyword.
pub fn is_keyword_field(node: &Node) -> bool {
    let haystacks = [
        node.attr_lower("id"),
        node.attr_lower("name"),
        node.attr_lower("placeholder"),
        node.attr_lower("class"),
    ];
    CAPTCHA_KEYWORDS
        .iter()
        .any(|kw| haystacks.iter().any(|h| h.contains(kw)))
}

fn text_fields_in<'a>(page: &'a PageSnapshot, root: u32) -> Vec<&'a Node> {
    page.descendants(root)
        .into_iter()
        .filter(|n| is_text_field(n))
        .collect()
}
